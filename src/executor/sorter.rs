//! In-memory post-sort for uncovered sort specifications
//!
//! When the chosen index cannot answer an ORDER BY, matches are sorted
//! here against the winner bodies fetched from the document store. The
//! sort is stable and deterministic.

use std::cmp::Ordering;

use serde_json::Value;

use crate::index::{FieldSort, SortDirection};

/// Sorts `(match, body)` pairs by the requested fields.
///
/// Sort keys resolve through dotted paths; a missing field sorts before
/// every present value.
pub(crate) fn sort_matches<T>(matches: &mut [(T, Value)], sort: &[FieldSort]) {
    matches.sort_by(|(_, a), (_, b)| {
        for term in sort {
            let a_val = crate::index::projection::extract_path(a, &term.field);
            let b_val = crate::index::projection::extract_path(b, &term.field);

            let ordering = match term.direction {
                SortDirection::Ascending => compare_values(a_val, b_val),
                SortDirection::Descending => compare_values(a_val, b_val).reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

/// Compares two JSON values for sorting.
///
/// Ordering rules:
/// - missing < null < bool < number < string < array < object
/// - within a type, natural ordering
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a_val), Some(b_val)) => {
            let type_order = |v: &Value| -> u8 {
                match v {
                    Value::Null => 0,
                    Value::Bool(_) => 1,
                    Value::Number(_) => 2,
                    Value::String(_) => 3,
                    Value::Array(_) => 4,
                    Value::Object(_) => 5,
                }
            };

            let a_type = type_order(a_val);
            let b_type = type_order(b_val);
            if a_type != b_type {
                return a_type.cmp(&b_type);
            }

            match (a_val, b_val) {
                (Value::Bool(a_b), Value::Bool(b_b)) => a_b.cmp(b_b),
                (Value::Number(a_n), Value::Number(b_n)) => {
                    let a_f = a_n.as_f64().unwrap_or(0.0);
                    let b_f = b_n.as_f64().unwrap_or(0.0);
                    a_f.partial_cmp(&b_f).unwrap_or(Ordering::Equal)
                }
                (Value::String(a_s), Value::String(b_s)) => a_s.cmp(b_s),
                _ => Ordering::Equal,
            }
        }
    }
}
