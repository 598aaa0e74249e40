//! `TriggerManager`: `BEFORE`/`AFTER` `INSERT`/`UPDATE`/`DELETE` hooks
//! (spec §4.E "Fire BEFORE/AFTER triggers", §4.G "TriggerManager").
//!
//! A trigger's `action` is cataloged as an opaque procedure name.
//! Invoking it defers to [`crate::ProcedureManager::execute`], which is
//! unimplemented in this core (SPEC_FULL §3: stored-procedure execution
//! is out of scope); per spec §7, a failure there is logged and the
//! outer DML operation continues regardless.

use crate::{append_system_row, TableManager, TRIGGERS_TABLE};
use common::{row_of, DbError, DbResult, RecordId, Row};
use storage::{heap, Pager};
use types::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Timing {
    Before,
    After,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Insert,
    Update,
    Delete,
}

impl Timing {
    fn as_str(self) -> &'static str {
        match self {
            Timing::Before => "BEFORE",
            Timing::After => "AFTER",
        }
    }
    fn parse(s: &str) -> Option<Self> {
        match s {
            "BEFORE" => Some(Timing::Before),
            "AFTER" => Some(Timing::After),
            _ => None,
        }
    }
}

impl Event {
    fn as_str(self) -> &'static str {
        match self {
            Event::Insert => "INSERT",
            Event::Update => "UPDATE",
            Event::Delete => "DELETE",
        }
    }
    fn parse(s: &str) -> Option<Self> {
        match s {
            "INSERT" => Some(Event::Insert),
            "UPDATE" => Some(Event::Update),
            "DELETE" => Some(Event::Delete),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TriggerDef {
    pub name: String,
    pub table: String,
    pub timing: Timing,
    pub event: Event,
    pub action: String,
}

fn to_row(def: &TriggerDef) -> Row {
    row_of([
        ("name", Value::Text(def.name.clone())),
        ("table", Value::Text(def.table.clone())),
        ("timing", Value::Text(def.timing.as_str().to_string())),
        ("event", Value::Text(def.event.as_str().to_string())),
        ("action", Value::Text(def.action.clone())),
    ])
}

fn from_row(row: &Row) -> Option<TriggerDef> {
    Some(TriggerDef {
        name: row.get("name").and_then(Value::as_str)?.to_string(),
        table: row.get("table").and_then(Value::as_str)?.to_string(),
        timing: Timing::parse(row.get("timing").and_then(Value::as_str)?)?,
        event: Event::parse(row.get("event").and_then(Value::as_str)?)?,
        action: row.get("action").and_then(Value::as_str)?.to_string(),
    })
}

pub struct TriggerManager {
    triggers: Vec<(RecordId, TriggerDef)>,
}

impl TriggerManager {
    pub fn load(pager: &mut Pager, tables: &TableManager) -> DbResult<Self> {
        let mut triggers = Vec::new();
        if let Ok(entry) = tables.get(TRIGGERS_TABLE) {
            for (rid, row) in heap::scan_chain(pager, entry.start_page)? {
                if let Some(def) = from_row(&row) {
                    triggers.push((rid, def));
                }
            }
        }
        Ok(Self { triggers })
    }

    /// Every trigger matching `table`/`timing`/`event`, in definition
    /// order (spec does not specify firing order across multiple
    /// triggers on the same event; definition order is deterministic).
    pub fn matching(&self, table: &str, timing: Timing, event: Event) -> impl Iterator<Item = &TriggerDef> {
        self.triggers
            .iter()
            .map(|(_, d)| d)
            .filter(move |d| d.table == table && d.timing == timing && d.event == event)
    }

    pub fn create(&mut self, pager: &mut Pager, tables: &mut TableManager, def: TriggerDef) -> DbResult<()> {
        if self.triggers.iter().any(|(_, d)| d.name == def.name) {
            return Err(DbError::AlreadyExists(format!("trigger '{}'", def.name)));
        }
        let rid = append_system_row(pager, tables, TRIGGERS_TABLE, &to_row(&def))?;
        self.triggers.push((rid, def));
        Ok(())
    }

    pub fn drop_trigger(&mut self, pager: &mut Pager, name: &str) -> DbResult<()> {
        let pos = self
            .triggers
            .iter()
            .position(|(_, d)| d.name == name)
            .ok_or_else(|| DbError::NotFound(format!("trigger '{name}'")))?;
        let (rid, _) = self.triggers.remove(pos);
        heap::delete_row(pager, rid)
    }
}
