//! Translation of planned scans into SQL over index tables
//!
//! Each scan becomes one SELECT of `_id`, `_rev` from the scan's index
//! table. Conditions bind their operands as parameters; only column
//! names and the table name are interpolated, and those were validated
//! against the identifier pattern at index creation.

use rusqlite::types::Value as SqlValue;

use crate::index::projection::to_sql_value;
use crate::index::FieldSort;
use crate::planner::{Condition, ConditionOp, IndexScan, PlannerError, PlannerResult, Selector};

/// A ready-to-run statement with its positional parameters.
#[derive(Debug, Clone)]
pub(crate) struct ScanStatement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// Builds the SELECT for one scan, optionally ordered by covered sort
/// fields.
pub(crate) fn scan_statement(
    scan: &IndexScan,
    order_by: Option<&[FieldSort]>,
) -> PlannerResult<ScanStatement> {
    let table = scan.index.table_name();
    let mut params = Vec::new();

    let predicates: Vec<String> = scan
        .clauses
        .iter()
        .map(|clause| clause_sql(clause, &table, &mut params))
        .collect::<PlannerResult<_>>()?;

    let mut sql = format!("SELECT \"_id\", \"_rev\" FROM \"{table}\"");
    if !predicates.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&predicates.join(" AND "));
    }

    if let Some(sort) = order_by {
        if !sort.is_empty() {
            let terms: Vec<String> = sort
                .iter()
                .map(|f| format!("\"{}\" {}", f.field, f.direction.as_sql()))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms.join(", "));
        }
    }

    Ok(ScanStatement { sql, params })
}

fn clause_sql(
    selector: &Selector,
    table: &str,
    params: &mut Vec<SqlValue>,
) -> PlannerResult<String> {
    match selector {
        Selector::And(children) => logical_sql(children, " AND ", table, params),
        Selector::Or(children) => logical_sql(children, " OR ", table, params),
        Selector::Not(child) => match child.as_ref() {
            // a missing field counts as not matching, so negation over a
            // single condition must admit NULL
            Selector::Condition(condition) => {
                let inner = condition_sql(condition, params)?;
                Ok(format!(
                    "( \"{}\" IS NULL OR NOT ( {inner} ) )",
                    condition.field
                ))
            }
            other => {
                let inner = clause_sql(other, table, params)?;
                Ok(format!("NOT ( {inner} )"))
            }
        },
        Selector::Condition(condition) => condition_sql(condition, params),
        Selector::Text(search) => {
            params.push(SqlValue::Text(search.clone()));
            Ok(format!("\"{table}\" MATCH ?"))
        }
    }
}

fn logical_sql(
    children: &[Selector],
    join: &str,
    table: &str,
    params: &mut Vec<SqlValue>,
) -> PlannerResult<String> {
    if children.is_empty() {
        return Err(PlannerError::InvalidQuery(
            "logical operator with no operands".to_string(),
        ));
    }
    let parts: Vec<String> = children
        .iter()
        .map(|child| clause_sql(child, table, params))
        .collect::<PlannerResult<_>>()?;
    Ok(format!("( {} )", parts.join(join)))
}

fn condition_sql(condition: &Condition, params: &mut Vec<SqlValue>) -> PlannerResult<String> {
    let column = format!("\"{}\"", condition.field);
    Ok(match &condition.op {
        ConditionOp::Eq(value) => {
            params.push(to_sql_value(value));
            format!("{column} = ?")
        }
        ConditionOp::Gt(value) => {
            params.push(to_sql_value(value));
            format!("{column} > ?")
        }
        ConditionOp::Gte(value) => {
            params.push(to_sql_value(value));
            format!("{column} >= ?")
        }
        ConditionOp::Lt(value) => {
            params.push(to_sql_value(value));
            format!("{column} < ?")
        }
        ConditionOp::Lte(value) => {
            params.push(to_sql_value(value));
            format!("{column} <= ?")
        }
        ConditionOp::In(values) => {
            if values.is_empty() {
                "1 = 0".to_string()
            } else {
                let placeholders = vec!["?"; values.len()].join(", ");
                params.extend(values.iter().map(to_sql_value));
                format!("{column} IN ( {placeholders} )")
            }
        }
        ConditionOp::Exists(true) => format!("{column} IS NOT NULL"),
        ConditionOp::Exists(false) => format!("{column} IS NULL"),
    })
}
