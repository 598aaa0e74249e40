//! Converts a [`database::QueryResult`] into the `result` field of a
//! `query_result` wire response (spec §6: "`result` is the executor's
//! native output: array of rows, string message, aggregate number, or
//! plan object").

use common::ExecutionStats;
use database::QueryResult;
use serde_json::{Value as Json, json};

pub fn to_json(result: &QueryResult) -> Json {
    match result {
        QueryResult::Rows(rows) => serde_json::to_value(rows).unwrap_or(Json::Null),
        QueryResult::Message(message) => json!(message),
        QueryResult::Plan(steps) => serde_json::to_value(steps).unwrap_or(Json::Null),
        QueryResult::PlanAnalyzed { plan, rows_produced, execution_time } => json!({
            "plan": plan,
            "rowsProduced": rows_produced,
            "executionTime": ExecutionStats::format_duration(*execution_time),
        }),
    }
}
