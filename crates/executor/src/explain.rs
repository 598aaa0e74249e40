//! `EXPLAIN` (spec §4.E "Explain"): describe the steps the corresponding
//! non-`EXPLAIN` execution would take without reading table data beyond
//! catalog lookups. `EXPLAIN ANALYZE` additionally runs the statement and
//! reports timing via [`common::ExecutionStats`].

use catalog::Catalog;
use common::ExecutionStats;
use parser::{Command, SelectStmt};

/// One line of a plan, e.g. `"INDEX SCAN people(id)"` or `"SORT name ASC"`.
pub type Plan = Vec<String>;

fn select_plan(catalog: &Catalog, stmt: &SelectStmt) -> Plan {
    let mut plan = Vec::new();
    if catalog.views.exists(&stmt.table) {
        plan.push(format!("VIEW SUBSTITUTE {}", stmt.table));
    }
    let index_fast_path = stmt.joins.is_empty()
        && stmt
            .criteria
            .as_ref()
            .and_then(|c| crate::criteria::as_single_equality(c))
            .map(|(field, _)| catalog.indexes.exists(&stmt.table, field))
            .unwrap_or(false);
    if index_fast_path {
        plan.push(format!("INDEX SCAN {}", stmt.table));
    } else {
        plan.push(format!("SCAN {}", stmt.table));
    }
    for join in &stmt.joins {
        let method = if matches!(join.kind, parser::JoinKind::Cross) { "NESTED LOOP" } else { "HASH JOIN" };
        plan.push(format!("{method} {:?} {}", join.kind, join.table));
    }
    if stmt.criteria.is_some() && !index_fast_path {
        plan.push("FILTER".to_string());
    }
    if stmt.distinct {
        plan.push("DISTINCT".to_string());
    }
    if let Some((field, dir)) = &stmt.order_by {
        plan.push(format!("SORT {field} {dir:?}"));
    }
    if stmt.offset.is_some() {
        plan.push(format!("OFFSET {}", stmt.offset.unwrap()));
    }
    if let Some(limit) = stmt.limit {
        plan.push(format!("LIMIT {limit}"));
    }
    plan.push("PROJECT".to_string());
    plan
}

/// Describe `command`'s execution plan; only `SELECT`/`AGGREGATE` carry
/// non-trivial steps, other statement kinds report a single-step plan
/// naming the operation.
pub fn describe(catalog: &Catalog, command: &Command) -> Plan {
    match command {
        Command::Select(stmt) => select_plan(catalog, stmt),
        Command::Aggregate(stmt) => {
            let mut plan = vec![format!("SCAN {}", stmt.table)];
            if stmt.criteria.is_some() {
                plan.push("FILTER".to_string());
            }
            if !stmt.group_by.is_empty() {
                plan.push(format!("GROUP BY {}", stmt.group_by.join(", ")));
            }
            plan.push("AGGREGATE".to_string());
            if stmt.having.is_some() {
                plan.push("HAVING".to_string());
            }
            plan
        }
        Command::Insert { table, .. } => vec![format!("INSERT {table}")],
        Command::Update { table, .. } => vec![format!("SCAN {table}"), "FILTER".to_string(), "UPDATE".to_string()],
        Command::Delete { table, .. } => vec![format!("SCAN {table}"), "FILTER".to_string(), "DELETE".to_string()],
        other => vec![format!("{other:?}")],
    }
}

/// Result of `EXPLAIN ANALYZE`: the plan plus timing/row stats from
/// actually running the inner statement.
pub struct Analysis {
    pub plan: Plan,
    pub stats: ExecutionStats,
}
