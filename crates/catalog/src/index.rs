//! `IndexManager`: persists `(table, field)` pairs in `_indexes` and
//! rebuilds every `BTreeIndex` from a full table scan on open (spec §4.C
//! "Consistency", §4.G "IndexManager").

use crate::{append_system_row, TableManager, INDEXES_TABLE};
use btree::BTreeIndex;
use common::{row_of, DbError, DbResult, RecordId, Row};
use std::collections::BTreeMap;
use storage::{heap, Pager};
use types::Value;

fn to_row(table: &str, field: &str) -> Row {
    row_of([("table", Value::Text(table.to_string())), ("field", Value::Text(field.to_string()))])
}

/// Every in-memory ordered index, keyed by the `(table, field)` pair it
/// covers.
pub struct IndexManager {
    indexes: BTreeMap<(String, String), BTreeIndex>,
    rids: BTreeMap<(String, String), RecordId>,
}

impl IndexManager {
    /// Read `_indexes`' rows, then rebuild each index by scanning its
    /// target table in full (spec §3 "Index ... rebuilt in memory from
    /// full table scan at database open").
    pub fn rebuild(pager: &mut Pager, tables: &TableManager) -> DbResult<Self> {
        let mut indexes = BTreeMap::new();
        let mut rids = BTreeMap::new();
        if let Ok(entry) = tables.get(INDEXES_TABLE) {
            for (rid, row) in heap::scan_chain(pager, entry.start_page)? {
                let table = row.get("table").and_then(Value::as_str).unwrap_or_default().to_string();
                let field = row.get("field").and_then(Value::as_str).unwrap_or_default().to_string();
                let mut index = BTreeIndex::new(table.clone(), field.clone());
                if let Ok(target) = tables.get(&table) {
                    for (data_rid, data_row) in heap::scan_chain(pager, target.start_page)? {
                        if let Some(value) = data_row.get(&field) {
                            index.insert(value.clone(), data_rid);
                        }
                    }
                }
                rids.insert((table.clone(), field.clone()), rid);
                indexes.insert((table, field), index);
            }
        }
        Ok(Self { indexes, rids })
    }

    pub fn get(&self, table: &str, field: &str) -> Option<&BTreeIndex> {
        self.indexes.get(&(table.to_string(), field.to_string()))
    }

    pub fn exists(&self, table: &str, field: &str) -> bool {
        self.indexes.contains_key(&(table.to_string(), field.to_string()))
    }

    /// All indexes defined on `table`, e.g. for maintenance on DML.
    pub fn indexes_for_mut(&mut self, table: &str) -> impl Iterator<Item = &mut BTreeIndex> {
        self.indexes.iter_mut().filter(move |((t, _), _)| t == table).map(|(_, idx)| idx)
    }

    pub fn list(&self) -> impl Iterator<Item = (&str, &str)> {
        self.indexes.keys().map(|(t, f)| (t.as_str(), f.as_str()))
    }

    /// `CREATE INDEX ON table (field)`: persist the pair and build the
    /// index immediately from the table's current contents.
    pub fn create(&mut self, pager: &mut Pager, tables: &mut TableManager, table: &str, field: &str) -> DbResult<()> {
        if self.exists(table, field) {
            return Err(DbError::AlreadyExists(format!("index on {table}({field})")));
        }
        let target = tables.get(table)?.clone();
        let mut index = BTreeIndex::new(table, field);
        for (rid, row) in heap::scan_chain(pager, target.start_page)? {
            if let Some(value) = row.get(field) {
                index.insert(value.clone(), rid);
            }
        }
        let rid = append_system_row(pager, tables, INDEXES_TABLE, &to_row(table, field))?;
        self.rids.insert((table.to_string(), field.to_string()), rid);
        self.indexes.insert((table.to_string(), field.to_string()), index);
        Ok(())
    }

    pub fn drop_index(&mut self, pager: &mut Pager, table: &str, field: &str) -> DbResult<()> {
        let key = (table.to_string(), field.to_string());
        let rid = self.rids.remove(&key).ok_or_else(|| DbError::NotFound(format!("index on {table}({field})")))?;
        heap::delete_row(pager, rid)?;
        self.indexes.remove(&key);
        Ok(())
    }

    /// Drop every index defined on `table` (called by `DROP TABLE`).
    pub fn drop_table_indexes(&mut self, pager: &mut Pager, table: &str) -> DbResult<()> {
        let fields: Vec<String> =
            self.indexes.keys().filter(|(t, _)| t == table).map(|(_, f)| f.clone()).collect();
        for field in fields {
            self.drop_index(pager, table, &field)?;
        }
        Ok(())
    }
}
