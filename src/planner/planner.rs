//! Query planner
//!
//! Planning assigns every conjunct clause of a query to an index whose
//! field set covers the fields the clause references. Clauses that share
//! a chosen index merge into one scan; distinct scans intersect by `_id`
//! at execution time.
//!
//! Index selection is deterministic: among covering indexes the one with
//! the fewest columns wins, ties broken lexicographically by name.

use crate::index::{FieldSort, Index, IndexType};

use super::ast::Selector;
use super::errors::{PlannerError, PlannerResult};

/// One SQL statement's worth of work: an index and the clauses it
/// answers.
#[derive(Debug, Clone)]
pub struct IndexScan {
    /// The index whose table the scan reads
    pub index: Index,
    /// Conjunct clauses answered by this scan, combined with AND
    pub clauses: Vec<Selector>,
}

/// An executable plan for one query.
#[derive(Debug, Clone)]
pub struct QueryPlan {
    /// Scans to run and intersect by `_id`
    pub scans: Vec<IndexScan>,
    /// True when the requested sort is answerable by the single chosen
    /// scan's index; a false value forces an in-memory post-sort
    pub covered_sort: bool,
}

/// Plans a parsed query against the known indexes.
pub fn plan_query(
    selector: &Selector,
    indexes: &[Index],
    sort: Option<&[FieldSort]>,
) -> PlannerResult<QueryPlan> {
    let mut scans: Vec<IndexScan> = Vec::new();

    for clause in selector.clone().into_conjuncts() {
        let index = choose_index(&clause, indexes)?;
        match scans.iter_mut().find(|scan| scan.index.name == index.name) {
            Some(scan) => scan.clauses.push(clause),
            None => scans.push(IndexScan {
                index: index.clone(),
                clauses: vec![clause],
            }),
        }
    }

    let covered_sort = match sort {
        Some(sort_fields) if !sort_fields.is_empty() => {
            let fields: Vec<String> = sort_fields.iter().map(|f| f.field.clone()).collect();
            scans.len() == 1 && scans[0].index.covers(&fields)
        }
        _ => true,
    };

    Ok(QueryPlan {
        scans,
        covered_sort,
    })
}

fn choose_index<'a>(clause: &Selector, indexes: &'a [Index]) -> PlannerResult<&'a Index> {
    if clause.contains_text() {
        if !matches!(clause, Selector::Text(_)) {
            return Err(PlannerError::InvalidQuery(
                "$text cannot be nested inside logical operators".to_string(),
            ));
        }
        return indexes
            .iter()
            .filter(|index| index.index_type == IndexType::Text)
            .min_by_key(|index| (index.fields.len(), index.name.clone()))
            .ok_or_else(|| PlannerError::NoUsableIndex {
                fields: vec!["$text".to_string()],
            });
    }

    let fields: Vec<String> = clause.fields().into_iter().collect();
    indexes
        .iter()
        .filter(|index| index.index_type == IndexType::Json && index.covers(&fields))
        .min_by_key(|index| (index.fields.len(), index.name.clone()))
        .ok_or(PlannerError::NoUsableIndex { fields })
}
