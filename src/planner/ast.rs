//! Query AST
//!
//! A query arrives as a JSON mapping of field names to selectors:
//!
//! ```text
//! {"firstName": "Mike"}                          shorthand equality
//! {"age": {"$gte": 18, "$lt": 65}}               comparison operators
//! {"$or": [{"a": 1}, {"b": {"$exists": true}}]}  logical operators
//! {"$text": {"$search": "quick brown fox"}}      full-text search
//! ```
//!
//! Sibling members of one mapping combine with implicit `$and`. Parsing
//! rejects malformed input with `InvalidQuery`; field existence and
//! index coverage are the planner's concern.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use super::errors::{PlannerError, PlannerResult};

/// A parsed query selector tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// Every child must match
    And(Vec<Selector>),
    /// At least one child must match
    Or(Vec<Selector>),
    /// The child must not match
    Not(Box<Selector>),
    /// A single field condition
    Condition(Condition),
    /// Full-text match over a text index
    Text(String),
}

/// A condition on one field.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Dotted field path
    pub field: String,
    /// The comparison applied to the field
    pub op: ConditionOp,
}

/// Comparison operators on a field.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionOp {
    Eq(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    Exists(bool),
}

impl Selector {
    /// Parses a query mapping into a selector tree.
    pub fn parse(query: &Value) -> PlannerResult<Selector> {
        let map = query
            .as_object()
            .ok_or_else(|| invalid("query selector must be a JSON object"))?;
        Self::parse_map(map)
    }

    fn parse_map(map: &Map<String, Value>) -> PlannerResult<Selector> {
        if map.is_empty() {
            return Err(invalid("query selector must not be empty"));
        }
        let mut clauses: Vec<Selector> = map
            .iter()
            .map(|(key, value)| Self::parse_member(key, value))
            .collect::<PlannerResult<_>>()?;
        Ok(if clauses.len() == 1 {
            clauses.remove(0)
        } else {
            Selector::And(clauses)
        })
    }

    fn parse_member(key: &str, value: &Value) -> PlannerResult<Selector> {
        match key {
            "$and" => Ok(Selector::And(Self::parse_selector_array(key, value)?)),
            "$or" => Ok(Selector::Or(Self::parse_selector_array(key, value)?)),
            "$not" => {
                let inner = value
                    .as_object()
                    .ok_or_else(|| invalid("$not takes a selector object"))?;
                Ok(Selector::Not(Box::new(Self::parse_map(inner)?)))
            }
            "$text" => {
                let search = value
                    .as_object()
                    .and_then(|m| m.get("$search"))
                    .and_then(Value::as_str)
                    .ok_or_else(|| invalid("$text takes {\"$search\": <string>}"))?;
                Ok(Selector::Text(search.to_string()))
            }
            _ if key.starts_with('$') => Err(invalid(format!("unknown operator {key:?}"))),
            field => Self::parse_field(field, value),
        }
    }

    fn parse_selector_array(op: &str, value: &Value) -> PlannerResult<Vec<Selector>> {
        let items = value
            .as_array()
            .ok_or_else(|| invalid(format!("{op} takes an array of selectors")))?;
        if items.is_empty() {
            return Err(invalid(format!("{op} needs at least one selector")));
        }
        items.iter().map(Self::parse).collect()
    }

    fn parse_field(field: &str, value: &Value) -> PlannerResult<Selector> {
        let Some(ops) = value.as_object() else {
            // shorthand equality
            return Ok(Selector::Condition(Condition {
                field: field.to_string(),
                op: ConditionOp::Eq(value.clone()),
            }));
        };

        if ops.is_empty() {
            return Err(invalid(format!("empty operator object on field {field:?}")));
        }

        let mut clauses = Vec::with_capacity(ops.len());
        for (op, operand) in ops {
            let parsed = match op.as_str() {
                "$eq" => ConditionOp::Eq(operand.clone()),
                "$gt" => ConditionOp::Gt(operand.clone()),
                "$gte" => ConditionOp::Gte(operand.clone()),
                "$lt" => ConditionOp::Lt(operand.clone()),
                "$lte" => ConditionOp::Lte(operand.clone()),
                "$in" => {
                    let items = operand
                        .as_array()
                        .ok_or_else(|| invalid("$in takes an array of values"))?;
                    ConditionOp::In(items.clone())
                }
                "$exists" => {
                    let flag = operand
                        .as_bool()
                        .ok_or_else(|| invalid("$exists takes a boolean"))?;
                    ConditionOp::Exists(flag)
                }
                "$not" => {
                    clauses.push(Selector::Not(Box::new(Self::parse_field(field, operand)?)));
                    continue;
                }
                other => {
                    return Err(invalid(format!(
                        "unknown operator {other:?} on field {field:?}"
                    )))
                }
            };
            clauses.push(Selector::Condition(Condition {
                field: field.to_string(),
                op: parsed,
            }));
        }

        Ok(if clauses.len() == 1 {
            clauses.remove(0)
        } else {
            Selector::And(clauses)
        })
    }

    /// Flattens nested `$and` into a list of conjunct clauses.
    pub fn into_conjuncts(self) -> Vec<Selector> {
        match self {
            Selector::And(children) => children
                .into_iter()
                .flat_map(Selector::into_conjuncts)
                .collect(),
            other => vec![other],
        }
    }

    /// Every field path referenced in this subtree. `$text` clauses
    /// reference no field.
    pub fn fields(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields(&self, out: &mut BTreeSet<String>) {
        match self {
            Selector::And(children) | Selector::Or(children) => {
                for child in children {
                    child.collect_fields(out);
                }
            }
            Selector::Not(child) => child.collect_fields(out),
            Selector::Condition(condition) => {
                out.insert(condition.field.clone());
            }
            Selector::Text(_) => {}
        }
    }

    /// Returns true if a `$text` clause appears in this subtree.
    pub fn contains_text(&self) -> bool {
        match self {
            Selector::And(children) | Selector::Or(children) => {
                children.iter().any(Selector::contains_text)
            }
            Selector::Not(child) => child.contains_text(),
            Selector::Condition(_) => false,
            Selector::Text(_) => true,
        }
    }
}

fn invalid(message: impl Into<String>) -> PlannerError {
    PlannerError::InvalidQuery(message.into())
}
