//! `ProcedureManager`: catalogs stored-procedure bodies without
//! executing them (spec.md §1 Non-goals: "stored-procedure execution";
//! SPEC_FULL §3: "procedures are catalogued but invoking one returns
//! `NotFound`/unimplemented rather than running arbitrary code").

use crate::{append_system_row, TableManager, PROCEDURES_TABLE};
use common::{row_of, DbError, DbResult, RecordId, Row};
use std::collections::BTreeMap;
use storage::{heap, Pager};
use types::Value;

fn to_row(name: &str, body: &str) -> Row {
    row_of([("name", Value::Text(name.to_string())), ("body", Value::Text(body.to_string()))])
}

pub struct ProcedureManager {
    procedures: BTreeMap<String, String>,
    rids: BTreeMap<String, RecordId>,
}

impl ProcedureManager {
    pub fn load(pager: &mut Pager, tables: &TableManager) -> DbResult<Self> {
        let mut procedures = BTreeMap::new();
        let mut rids = BTreeMap::new();
        if let Ok(entry) = tables.get(PROCEDURES_TABLE) {
            for (rid, row) in heap::scan_chain(pager, entry.start_page)? {
                if let (Some(name), Some(body)) =
                    (row.get("name").and_then(Value::as_str), row.get("body").and_then(Value::as_str))
                {
                    rids.insert(name.to_string(), rid);
                    procedures.insert(name.to_string(), body.to_string());
                }
            }
        }
        Ok(Self { procedures, rids })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.procedures.get(name).map(String::as_str)
    }

    pub fn create(
        &mut self,
        pager: &mut Pager,
        tables: &mut TableManager,
        name: &str,
        body: String,
    ) -> DbResult<()> {
        if self.procedures.contains_key(name) {
            return Err(DbError::AlreadyExists(format!("procedure '{name}'")));
        }
        let rid = append_system_row(pager, tables, PROCEDURES_TABLE, &to_row(name, &body))?;
        self.rids.insert(name.to_string(), rid);
        self.procedures.insert(name.to_string(), body);
        Ok(())
    }

    /// Always fails: executing arbitrary procedure bodies is out of
    /// scope for this core. Triggers that reference a procedure as
    /// their action surface this as a logged, non-fatal warning rather
    /// than propagating it (spec §7 "Triggers that fail are logged and
    /// the outer operation continues").
    pub fn execute(&self, name: &str) -> DbResult<()> {
        if self.procedures.contains_key(name) {
            Err(DbError::NotFound(format!("procedure execution is not implemented: '{name}'")))
        } else {
            Err(DbError::NotFound(format!("procedure '{name}'")))
        }
    }
}
