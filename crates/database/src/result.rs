//! What [`crate::Database::execute`] hands back to its caller (spec §6
//! "result is the executor's native output: array of rows, string
//! message, aggregate number, or plan object").

use common::Row;
use std::time::Duration;

#[derive(Clone, Debug)]
pub enum QueryResult {
    Rows(Vec<Row>),
    Message(String),
    Plan(Vec<String>),
    PlanAnalyzed { plan: Vec<String>, rows_produced: u64, execution_time: Duration },
}
