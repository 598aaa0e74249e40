//! Self-hosted catalog and system-table managers (spec §4.G, §9
//! "Self-hosted catalog").
//!
//! The catalog is not a side file: `_tables` is itself a table whose page
//! chain starts at page 0, and every other reserved table
//! (`_indexes`, `_views`, `_schemas`, `_triggers`, `_procedures`) is a
//! row inside `_tables` plus its own page chain, created lazily on first
//! use. [`Catalog::open`] bootstraps `_tables`'s self-describing entry on
//! a fresh database and otherwise loads every manager's in-memory cache
//! by scanning its reserved table, per spec §4.G's "cache warmed from the
//! table at startup" pattern.

mod index;
mod procedure;
mod schema;
mod table;
mod trigger;
mod view;

#[cfg(test)]
mod tests;

pub use index::IndexManager;
pub use procedure::ProcedureManager;
pub use schema::{SchemaColumn, SchemaManager};
pub use table::{TableEntry, TableManager};
pub use trigger::{Event as TriggerEvent, Timing as TriggerTiming, TriggerDef, TriggerManager};
pub use view::ViewManager;

use common::{DbResult, RecordId, Row};
use storage::{heap, Pager};

/// Reserved system-table names (spec §3 "System tables").
pub const TABLES_TABLE: &str = "_tables";
pub const INDEXES_TABLE: &str = "_indexes";
pub const VIEWS_TABLE: &str = "_views";
pub const SCHEMAS_TABLE: &str = "_schemas";
pub const TRIGGERS_TABLE: &str = "_triggers";
pub const PROCEDURES_TABLE: &str = "_procedures";

/// System-table names are reserved (spec invariant 6): user DDL may
/// never target a `_`-prefixed name.
pub fn is_system_table(name: &str) -> bool {
    name.starts_with('_')
}

/// Append `row` to the reserved table `table`, creating its page chain
/// on first use and keeping `_tables`'s own bookkeeping for that chain
/// current. Shared by every sub-manager's `create`/`define` path.
fn append_system_row(
    pager: &mut Pager,
    tables: &mut TableManager,
    table: &str,
    row: &Row,
) -> DbResult<RecordId> {
    let entry = tables.ensure_system_table(pager, table)?;
    let (new_last, rid) = heap::append_row(pager, entry.last_page, row)?;
    if new_last != entry.last_page {
        tables.update_last_page(pager, table, new_last)?;
    }
    Ok(rid)
}

/// Aggregates every catalog sub-manager over one database file. Owned by
/// the database handle alongside the [`Pager`] it reads/writes through
/// (spec §4.G: each manager is warmed from its table at startup).
pub struct Catalog {
    pub tables: TableManager,
    pub indexes: IndexManager,
    pub schemas: SchemaManager,
    pub views: ViewManager,
    pub triggers: TriggerManager,
    pub procedures: ProcedureManager,
}

impl Catalog {
    /// Load (or bootstrap) every manager's cache from `pager`.
    pub fn open(pager: &mut Pager) -> DbResult<Self> {
        let tables = TableManager::load(pager)?;
        let indexes = IndexManager::rebuild(pager, &tables)?;
        let schemas = SchemaManager::load(pager, &tables)?;
        let views = ViewManager::load(pager, &tables)?;
        let triggers = TriggerManager::load(pager, &tables)?;
        let procedures = ProcedureManager::load(pager, &tables)?;
        Ok(Self { tables, indexes, schemas, views, triggers, procedures })
    }
}
