//! RevisionForest - the revision trees of a single document
//!
//! Commonly a document has one tree with no branches, a straight history:
//!
//! ```text
//!     1 -> 2 -> 3
//! ```
//!
//! Editing the same document in two replicas and then replicating merges
//! the missing subtree into the target, producing a branch:
//!
//! ```text
//!     1 ->  2  -> 3 -> 4
//!       \-> 2^ -> 3^
//! ```
//!
//! Two or more branches ending in non-deleted leaves make the document
//! conflicted. A document created independently under the same id in two
//! stores yields multiple roots after replication, hence a forest.
//!
//! A forest is built empty, populated by `add` in ascending generation
//! order (a parent before any of its children) and then queried read-only.
//! Nodes reference their parents by sequence number through the `by_seq`
//! map; no node owns another.

use std::collections::{BTreeMap, BTreeSet};

use super::errors::{ForestError, ForestResult};
use super::revision::DocumentRevision;

/// A node in a document's revision forest: one revision plus the sequence
/// numbers of its children, in insertion order.
#[derive(Debug, Clone)]
pub struct RevisionNode {
    revision: DocumentRevision,
    children: Vec<i64>,
}

impl RevisionNode {
    fn new(revision: DocumentRevision) -> Self {
        Self {
            revision,
            children: Vec::new(),
        }
    }

    /// The revision held by this node.
    #[inline]
    pub fn revision(&self) -> &DocumentRevision {
        &self.revision
    }

    /// Child sequence numbers in insertion order.
    #[inline]
    pub fn children(&self) -> &[i64] {
        &self.children
    }

    /// Returns true if this node has no children.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

// Node identity is the sequence number alone.
impl PartialEq for RevisionNode {
    fn eq(&self, other: &Self) -> bool {
        self.revision.sequence == other.revision.sequence
    }
}

impl Eq for RevisionNode {}

impl std::hash::Hash for RevisionNode {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.revision.sequence.hash(state);
    }
}

/// All known revisions of one document, as a forest of trees.
#[derive(Debug, Clone, Default)]
pub struct RevisionForest {
    /// Sequence numbers of the forest's roots
    roots: BTreeSet<i64>,
    /// Every node in the forest, keyed by sequence
    by_seq: BTreeMap<i64, RevisionNode>,
    /// Sequence numbers of nodes with no children
    leaves: BTreeSet<i64>,
}

impl RevisionForest {
    /// Constructs an empty forest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Constructs a forest containing a single root revision.
    pub fn with_root(revision: DocumentRevision) -> ForestResult<Self> {
        let mut forest = Self::new();
        forest.add(revision)?;
        Ok(forest)
    }

    /// Adds a revision to the forest.
    ///
    /// Revisions must be added in ascending generation order, so a parent
    /// is always present before its children. Fails with `AlreadyPresent`
    /// when the sequence was added before, and with `OrphanRevision` when
    /// a non-root revision names a parent sequence the forest lacks.
    pub fn add(&mut self, revision: DocumentRevision) -> ForestResult<&mut Self> {
        if self.by_seq.contains_key(&revision.sequence) {
            return Err(ForestError::AlreadyPresent(revision.sequence));
        }

        if revision.is_root() {
            self.add_root(revision);
        } else {
            self.add_child(revision)?;
        }
        Ok(self)
    }

    fn add_root(&mut self, revision: DocumentRevision) {
        let sequence = revision.sequence;
        self.roots.insert(sequence);
        self.leaves.insert(sequence);
        self.by_seq.insert(sequence, RevisionNode::new(revision));
    }

    fn add_child(&mut self, revision: DocumentRevision) -> ForestResult<()> {
        let sequence = revision.sequence;
        let parent = revision.parent;

        let Some(parent_node) = self.by_seq.get_mut(&parent) else {
            return Err(ForestError::OrphanRevision { sequence, parent });
        };
        parent_node.children.push(sequence);

        self.leaves.remove(&parent);
        self.leaves.insert(sequence);
        self.by_seq.insert(sequence, RevisionNode::new(revision));
        Ok(())
    }

    /// Number of revisions in the forest.
    pub fn len(&self) -> usize {
        self.by_seq.len()
    }

    /// Returns true if no revision has been added.
    pub fn is_empty(&self) -> bool {
        self.by_seq.is_empty()
    }

    /// Root nodes in ascending sequence order.
    pub fn roots(&self) -> impl Iterator<Item = &RevisionNode> + '_ {
        self.roots.iter().filter_map(|seq| self.by_seq.get(seq))
    }

    /// Number of trees in the forest.
    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    /// The root node with the given sequence number.
    pub fn root(&self, sequence: i64) -> Option<&RevisionNode> {
        if self.roots.contains(&sequence) {
            self.by_seq.get(&sequence)
        } else {
            None
        }
    }

    /// Finds the revision with the given document and revision id.
    ///
    /// Both are required because every node shares the document id while
    /// revision ids repeat only across branches, not within one.
    pub fn lookup(&self, doc_id: &str, rev_id: &str) -> Option<&DocumentRevision> {
        self.by_seq
            .values()
            .map(RevisionNode::revision)
            .find(|rev| rev.doc_id == doc_id && rev.rev_id == rev_id)
    }

    /// The revision with the given sequence number.
    pub fn by_sequence(&self, sequence: i64) -> Option<&DocumentRevision> {
        self.by_seq.get(&sequence).map(RevisionNode::revision)
    }

    /// The distance of a revision from the root of its branch.
    ///
    /// 0 for a root, -1 when the sequence is not in the forest.
    pub fn depth(&self, sequence: i64) -> i64 {
        let Some(mut node) = self.by_seq.get(&sequence) else {
            return -1;
        };

        let mut depth = 0;
        while node.revision.parent > 0 {
            match self.by_seq.get(&node.revision.parent) {
                Some(parent) => {
                    node = parent;
                    depth += 1;
                }
                None => break,
            }
        }
        depth
    }

    /// Finds the child of `parent_sequence` carrying `child_rev_id`.
    ///
    /// Fails with `NotInTree` when the parent is absent.
    pub fn lookup_child_by_rev_id(
        &self,
        parent_sequence: i64,
        child_rev_id: &str,
    ) -> ForestResult<Option<&DocumentRevision>> {
        let parent = self
            .by_seq
            .get(&parent_sequence)
            .ok_or(ForestError::NotInTree(parent_sequence))?;

        Ok(parent
            .children
            .iter()
            .filter_map(|seq| self.by_seq.get(seq))
            .map(RevisionNode::revision)
            .find(|rev| rev.rev_id == child_rev_id))
    }

    /// Leaf nodes in ascending sequence order.
    pub fn leaves(&self) -> impl Iterator<Item = &RevisionNode> + '_ {
        self.leaves.iter().filter_map(|seq| self.by_seq.get(seq))
    }

    /// Revision ids of the leaves.
    pub fn leaf_revision_ids(&self) -> BTreeSet<String> {
        self.leaves()
            .map(|node| node.revision.rev_id.clone())
            .collect()
    }

    /// Leaf revisions in ascending sequence order.
    pub fn leaf_revisions(&self) -> Vec<&DocumentRevision> {
        self.leaves().map(RevisionNode::revision).collect()
    }

    /// Returns true if two or more branches end in non-deleted leaves.
    pub fn has_conflicts(&self) -> bool {
        self.leaves()
            .filter(|node| !node.revision.deleted)
            .take(2)
            .count()
            >= 2
    }

    /// The leaf revision marked current by the store's winner policy.
    ///
    /// Fails with `NoCurrent` when no leaf carries the flag.
    pub fn current_revision(&self) -> ForestResult<&DocumentRevision> {
        self.leaves()
            .map(RevisionNode::revision)
            .find(|rev| rev.current)
            .ok_or(ForestError::NoCurrent)
    }

    /// The revision representing this document in non-conflict-aware APIs.
    ///
    /// The `current` flag is authoritative when a leaf carries it: a live
    /// current leaf wins, a deleted one marks the whole document as a
    /// tombstone. When no leaf is flagged, falls back to the
    /// deterministic rule: the non-deleted leaf with the highest
    /// generation, ties broken by the greatest revision id. `None` when
    /// every leaf is deleted.
    pub fn winning_revision(&self) -> Option<&DocumentRevision> {
        if let Ok(current) = self.current_revision() {
            return (!current.deleted).then_some(current);
        }
        self.leaves()
            .map(RevisionNode::revision)
            .filter(|rev| !rev.deleted)
            .max_by(|a, b| a.revision_order(b))
    }

    /// The revisions from `sequence` back to the root of its tree.
    ///
    /// The first element is the revision with `sequence`; the last is the
    /// root. Fails with `NotInTree` when the sequence is absent.
    pub fn path_for_node(&self, sequence: i64) -> ForestResult<Vec<&DocumentRevision>> {
        let mut node = self
            .by_seq
            .get(&sequence)
            .ok_or(ForestError::NotInTree(sequence))?;

        let mut path = vec![&node.revision];
        while node.revision.parent > 0 {
            match self.by_seq.get(&node.revision.parent) {
                Some(parent) => {
                    path.push(&parent.revision);
                    node = parent;
                }
                None => break,
            }
        }
        Ok(path)
    }

    /// The revision ids from `sequence` back to the root of its tree.
    pub fn path(&self, sequence: i64) -> ForestResult<Vec<String>> {
        Ok(self
            .path_for_node(sequence)?
            .into_iter()
            .map(|rev| rev.rev_id.clone())
            .collect())
    }
}
