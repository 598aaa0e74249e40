//! Converts `parser`'s trigger vocabulary to `catalog`'s (the two crates
//! intentionally don't share these enums, so the catalog crate doesn't
//! need a dependency on the parser crate) and fires matching triggers
//! around DML (spec §4.E "Fire BEFORE/AFTER triggers").

use catalog::Catalog;
use parser::{TriggerEvent as AstEvent, TriggerTiming as AstTiming};

pub fn timing(t: AstTiming) -> catalog::TriggerTiming {
    match t {
        AstTiming::Before => catalog::TriggerTiming::Before,
        AstTiming::After => catalog::TriggerTiming::After,
    }
}

pub fn event(e: AstEvent) -> catalog::TriggerEvent {
    match e {
        AstEvent::Insert => catalog::TriggerEvent::Insert,
        AstEvent::Update => catalog::TriggerEvent::Update,
        AstEvent::Delete => catalog::TriggerEvent::Delete,
    }
}

/// Fire every trigger matching `table`/`timing`/`event`. A trigger action
/// is an opaque procedure name; invoking it always fails in this core
/// (procedure execution is out of scope), so a failure is logged and
/// does not abort the statement (spec §7 "Triggers that fail are logged
/// and the outer operation continues"). Fired once per statement rather
/// than once per affected row: the only available action is
/// unexecutable regardless, so the distinction is unobservable.
pub fn fire(catalog: &Catalog, table: &str, timing: catalog::TriggerTiming, event: catalog::TriggerEvent) {
    for def in catalog.triggers.matching(table, timing, event) {
        if let Err(e) = catalog.procedures.execute(&def.action) {
            tracing::warn!(trigger = %def.name, table, error = %e, "trigger action failed");
        }
    }
}
