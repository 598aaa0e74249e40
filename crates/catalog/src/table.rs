//! `TableManager`: the self-hosted `_tables` system table (spec §4.G
//! "TableManager creates/drops tables ... `findTableEntry(name)`").

use crate::{is_system_table, TABLES_TABLE};
use common::{row_of, DbError, DbResult, PageId, RecordId, Row};
use std::collections::BTreeMap;
use storage::{heap, Pager};
use types::Value;

/// Metadata record for one table's page chain (spec §3 "Table entry").
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableEntry {
    pub name: String,
    pub start_page: PageId,
    pub last_page: PageId,
    pub system: bool,
}

impl TableEntry {
    fn to_row(&self) -> Row {
        row_of([
            ("name", Value::Text(self.name.clone())),
            ("start_page", Value::Number(self.start_page.0 as f64)),
            ("last_page", Value::Number(self.last_page.0 as f64)),
            ("system", Value::Bool(self.system)),
        ])
    }

    fn from_row(row: &Row) -> DbResult<Self> {
        let err = || DbError::StorageFault("malformed _tables entry".into());
        let name = row.get("name").and_then(Value::as_str).ok_or_else(err)?.to_string();
        let start_page = row.get("start_page").and_then(Value::as_number).ok_or_else(err)? as u32;
        let last_page = row.get("last_page").and_then(Value::as_number).ok_or_else(err)? as u32;
        let system = row.get("system").and_then(Value::as_bool).unwrap_or(false);
        Ok(Self { name, start_page: PageId(start_page), last_page: PageId(last_page), system })
    }
}

/// Cache of every table's [`TableEntry`], plus the [`RecordId`] of the
/// row describing it inside `_tables`'s own chain, so updates (a
/// changed `last_page`) can be written back in place.
pub struct TableManager {
    entries: BTreeMap<String, TableEntry>,
    rids: BTreeMap<String, RecordId>,
}

impl TableManager {
    /// Load `_tables` from page 0's chain, bootstrapping its
    /// self-describing entry if the chain is empty (spec §9).
    pub fn load(pager: &mut Pager) -> DbResult<Self> {
        let mut entries = BTreeMap::new();
        let mut rids = BTreeMap::new();
        for (rid, row) in heap::scan_chain(pager, PageId(0))? {
            let entry = TableEntry::from_row(&row)?;
            rids.insert(entry.name.clone(), rid);
            entries.insert(entry.name.clone(), entry);
        }

        let mut mgr = Self { entries, rids };
        if !mgr.entries.contains_key(TABLES_TABLE) {
            let mut entry = TableEntry {
                name: TABLES_TABLE.to_string(),
                start_page: PageId(0),
                last_page: PageId(0),
                system: true,
            };
            let (last, rid) = heap::append_row(pager, PageId(0), &entry.to_row())?;
            entry.last_page = last;
            mgr.rids.insert(TABLES_TABLE.to_string(), rid);
            mgr.entries.insert(TABLES_TABLE.to_string(), entry);
        }
        Ok(mgr)
    }

    pub fn get(&self, name: &str) -> DbResult<&TableEntry> {
        self.entries.get(name).ok_or_else(|| DbError::NotFound(format!("table '{name}'")))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn user_tables(&self) -> impl Iterator<Item = &TableEntry> {
        self.entries.values().filter(|e| !e.system)
    }

    /// Create a fresh page chain for `name` and register it in
    /// `_tables` (spec §4.E "Insert" / §4.G "TableManager"). This is the
    /// same path [`TableManager::ensure_system_table`] uses to
    /// materialize a reserved table lazily, so it does not itself reject
    /// `_`-prefixed names (spec invariant 6) — the caller dispatching a
    /// user `CREATE TABLE` statement is responsible for rejecting those
    /// before reaching here.
    pub fn create_table(&mut self, pager: &mut Pager, name: &str) -> DbResult<TableEntry> {
        if self.entries.contains_key(name) {
            return Err(DbError::AlreadyExists(format!("table '{name}'")));
        }
        let start = pager.alloc_page()?;
        let entry = TableEntry {
            name: name.to_string(),
            start_page: start,
            last_page: start,
            system: is_system_table(name),
        };
        let (new_last, rid) = heap::append_row(pager, self.get(TABLES_TABLE)?.last_page, &entry.to_row())?;
        if new_last != self.get(TABLES_TABLE)?.last_page {
            self.update_last_page(pager, TABLES_TABLE, new_last)?;
        }
        self.rids.insert(name.to_string(), rid);
        self.entries.insert(name.to_string(), entry.clone());
        Ok(entry)
    }

    /// Create `name`'s chain only if it doesn't already exist; used by
    /// every sub-manager to lazily materialize its reserved table on
    /// first write (spec §4.G "System tables are created lazily on
    /// first access").
    pub fn ensure_system_table(&mut self, pager: &mut Pager, name: &str) -> DbResult<TableEntry> {
        if let Ok(entry) = self.get(name) {
            return Ok(entry.clone());
        }
        self.create_table(pager, name)
    }

    /// Remove `name`'s entry from `_tables`. The table's own pages are
    /// left allocated (spec §3 "Pages ... never freed"). Like
    /// [`TableManager::create_table`], this does not itself guard
    /// `_`-prefixed names — sub-managers drop their own reserved table
    /// through this path, so the reserved-name rejection for a user
    /// `DROP TABLE` lives with the caller.
    pub fn drop_table(&mut self, pager: &mut Pager, name: &str) -> DbResult<()> {
        let rid = *self.rids.get(name).ok_or_else(|| DbError::NotFound(format!("table '{name}'")))?;
        heap::delete_row(pager, rid)?;
        self.rids.remove(name);
        self.entries.remove(name);
        Ok(())
    }

    /// Rewrite `name`'s catalog row with a new `last_page` (called after
    /// an append grows its chain). Relocation of the catalog row itself
    /// (if `_tables`' own last page is full) is handled transparently.
    pub fn update_last_page(&mut self, pager: &mut Pager, name: &str, new_last: PageId) -> DbResult<()> {
        let rid = *self.rids.get(name).ok_or_else(|| DbError::NotFound(format!("table '{name}'")))?;
        let mut entry = self.entries.get(name).cloned().ok_or_else(|| DbError::NotFound(format!("table '{name}'")))?;
        entry.last_page = new_last;
        let tables_last = self.entries.get(TABLES_TABLE).map(|e| e.last_page).unwrap_or(PageId(0));
        let (_, new_tables_last, new_rid) = heap::replace_row(pager, rid, tables_last, &entry.to_row())?;
        self.rids.insert(name.to_string(), new_rid);
        self.entries.insert(name.to_string(), entry);
        if name != TABLES_TABLE && new_tables_last != tables_last {
            // Updating another table's row grew `_tables`' own chain (the
            // updated row no longer fit in place and relocated). Record
            // the new last page in memory; a same-size replace never
            // relocates in practice, so the on-disk self-entry catching
            // up on the next `_tables` write is an accepted simplification.
            if let Some(tables_entry) = self.entries.get_mut(TABLES_TABLE) {
                tables_entry.last_page = new_tables_last;
            }
        }
        Ok(())
    }
}
