//! Query AST and planning
//!
//! Turns a JSON query mapping into a selector tree, flattens it to
//! conjunctive form and assigns each conjunct to a covering index. The
//! resulting plan is a set of index scans the executor runs and
//! intersects by `_id`.

mod ast;
mod errors;
mod planner;

pub use ast::{Condition, ConditionOp, Selector};
pub use errors::{PlannerError, PlannerResult};
pub use planner::{plan_query, IndexScan, QueryPlan};
