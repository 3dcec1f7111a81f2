//! Revision forest invariants
//!
//! End-to-end document histories: linear edits, replication-induced
//! branches, conflict resolution and independently created documents
//! merged under one id.

mod support;

use serde_json::json;
use syncstore::datastore::{DocumentRevision, ForestError, RevisionForest};

fn rev(sequence: i64, parent: i64, rev_id: &str, deleted: bool, current: bool) -> DocumentRevision {
    DocumentRevision::new("doc", rev_id, sequence, parent)
        .with_deleted(deleted)
        .with_current(current)
        .with_body(json!({"rev": rev_id}))
}

// =============================================================================
// Literal history scenarios
// =============================================================================

/// Straight history: 1-a -> 2-b -> 3-c.
#[test]
fn test_linear_history() {
    let mut forest = RevisionForest::new();
    forest.add(rev(1, 0, "1-a", false, false)).unwrap();
    forest.add(rev(2, 1, "2-b", false, false)).unwrap();
    forest.add(rev(3, 2, "3-c", false, true)).unwrap();

    assert_eq!(forest.root_count(), 1);
    assert!(forest.root(1).is_some());

    let leaves: Vec<i64> = forest.leaves().map(|n| n.revision().sequence).collect();
    assert_eq!(leaves, vec![3]);

    assert!(!forest.has_conflicts());
    assert_eq!(forest.current_revision().unwrap().rev_id, "3-c");
    assert_eq!(forest.path(3).unwrap(), vec!["3-c", "2-b", "1-a"]);
    assert_eq!(forest.depth(3), 2);
}

/// Replication brought a second generation-2 revision: a branch, and a
/// conflict between two active leaves.
#[test]
fn test_branch_creates_conflict() {
    let mut forest = RevisionForest::new();
    forest.add(rev(1, 0, "1-a", false, false)).unwrap();
    forest.add(rev(2, 1, "2-b", false, true)).unwrap();
    forest.add(rev(3, 1, "2-b*", false, false)).unwrap();

    let leaves: Vec<i64> = forest.leaves().map(|n| n.revision().sequence).collect();
    assert_eq!(leaves, vec![2, 3]);
    assert!(forest.leaves().all(|n| !n.revision().deleted));

    assert!(forest.has_conflicts());
    assert_eq!(forest.current_revision().unwrap().rev_id, "2-b");
}

/// Resolving the conflict: extend the winning branch, delete the loser.
#[test]
fn test_conflict_resolution() {
    let mut forest = RevisionForest::new();
    forest.add(rev(1, 0, "1-a", false, false)).unwrap();
    forest.add(rev(2, 1, "2-b", false, true)).unwrap();
    forest.add(rev(3, 1, "2-b*", false, false)).unwrap();

    forest.add(rev(4, 2, "3-c", false, true)).unwrap();
    forest.add(rev(5, 3, "3-b*", true, false)).unwrap();

    let leaves: Vec<i64> = forest.leaves().map(|n| n.revision().sequence).collect();
    assert_eq!(leaves, vec![4, 5]);

    assert!(!forest.has_conflicts());
    assert_eq!(forest.current_revision().unwrap().rev_id, "3-c");
    assert_eq!(forest.winning_revision().unwrap().rev_id, "3-c");
}

/// The same document id created independently in two stores yields two
/// roots after replication.
#[test]
fn test_disjoint_roots() {
    let mut forest = RevisionForest::new();
    forest.add(rev(1, 0, "1-a", false, false)).unwrap();
    forest.add(rev(10, 0, "1-x", false, true)).unwrap();

    assert_eq!(forest.root_count(), 2);

    let leaves: Vec<i64> = forest.leaves().map(|n| n.revision().sequence).collect();
    assert_eq!(leaves, vec![1, 10]);

    assert!(!forest.has_conflicts());
    assert_eq!(forest.current_revision().unwrap().rev_id, "1-x");
}

// =============================================================================
// Structural invariants
// =============================================================================

fn branched_revisions() -> Vec<DocumentRevision> {
    vec![
        rev(1, 0, "1-a", false, false),
        rev(2, 1, "2-b", false, false),
        rev(3, 1, "2-c", false, false),
        rev(4, 2, "3-d", false, true),
        rev(5, 3, "3-e", true, false),
        rev(10, 0, "1-x", false, false),
    ]
}

fn build(revisions: &[DocumentRevision]) -> RevisionForest {
    let mut forest = RevisionForest::new();
    for revision in revisions {
        forest.add(revision.clone()).unwrap();
    }
    forest
}

/// Leaves plus internal nodes account for every node, and every root is
/// a known node.
#[test]
fn test_leaves_and_internals_partition_the_forest() {
    let forest = build(&branched_revisions());

    let all: Vec<i64> = [1, 2, 3, 4, 5, 10]
        .into_iter()
        .filter(|seq| forest.by_sequence(*seq).is_some())
        .collect();
    assert_eq!(all.len(), forest.len());

    let leaf_count = forest.leaves().count();
    let internal_count = all
        .iter()
        .filter(|seq| !forest.leaves().any(|n| n.revision().sequence == **seq))
        .count();
    assert_eq!(leaf_count + internal_count, forest.len());

    for root in forest.roots() {
        assert!(forest.by_sequence(root.revision().sequence).is_some());
    }
}

/// depth(s) always equals the path length minus one.
#[test]
fn test_depth_matches_path_length() {
    let forest = build(&branched_revisions());
    for sequence in [1, 2, 3, 4, 5, 10] {
        let path = forest.path_for_node(sequence).unwrap();
        assert_eq!(forest.depth(sequence), path.len() as i64 - 1);
    }
}

/// hasConflicts tracks the number of non-deleted leaves exactly.
#[test]
fn test_conflicts_iff_two_active_leaves() {
    let forest = build(&branched_revisions());
    let active_leaves = forest
        .leaves()
        .filter(|n| !n.revision().deleted)
        .count();
    assert_eq!(forest.has_conflicts(), active_leaves >= 2);
}

/// Rebuilding without the last revision and re-adding it produces an
/// isomorphic forest.
#[test]
fn test_add_is_monotonic() {
    let revisions = branched_revisions();
    let full = build(&revisions);

    let mut rebuilt = build(&revisions[..revisions.len() - 1]);
    rebuilt
        .add(revisions[revisions.len() - 1].clone())
        .unwrap();

    assert_eq!(rebuilt.len(), full.len());
    assert_eq!(rebuilt.root_count(), full.root_count());
    assert_eq!(rebuilt.leaf_revision_ids(), full.leaf_revision_ids());
    for sequence in [1, 2, 3, 4, 5, 10] {
        assert_eq!(rebuilt.depth(sequence), full.depth(sequence));
        assert_eq!(rebuilt.path(sequence).unwrap(), full.path(sequence).unwrap());
    }
}

/// Error cases surface without mutating the forest.
#[test]
fn test_precondition_failures_leave_forest_intact() {
    let mut forest = build(&branched_revisions());
    let before = forest.len();

    assert_eq!(
        forest.add(rev(1, 0, "1-dup", false, false)).unwrap_err(),
        ForestError::AlreadyPresent(1)
    );
    assert_eq!(
        forest.add(rev(20, 19, "4-z", false, false)).unwrap_err(),
        ForestError::OrphanRevision {
            sequence: 20,
            parent: 19
        }
    );
    assert_eq!(forest.len(), before);
}

// =============================================================================
// Forests materialized through a document store
// =============================================================================

/// The in-memory store materializes the same forest shape the raw adds
/// produce.
#[test]
fn test_store_materializes_forest() {
    use support::MemoryDocumentStore;
    use syncstore::datastore::DocumentStore;

    let store = MemoryDocumentStore::new();
    let s1 = store.create_document("crew", "1-a", json!({"name": "one"}));
    let s2 = store.update_document("crew", s1, "2-b", json!({"name": "two"}));
    store.delete_document("crew", s2, "3-c");

    let forest = store.revision_forest("crew").unwrap().unwrap();
    assert_eq!(forest.len(), 3);
    assert_eq!(forest.path(3).unwrap(), vec!["3-c", "2-b", "1-a"]);
    assert!(forest.current_revision().unwrap().deleted);
    assert!(forest.winning_revision().is_none());

    assert!(store.revision_forest("nobody").unwrap().is_none());
}
