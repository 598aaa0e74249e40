//! `ViewManager`: named `SELECT` substitutions (spec §4.E Select step 1
//! "if it is a view, substitute the stored SELECT command", §4.G
//! "ViewManager").
//!
//! A view's body is cataloged as the original `SELECT ...` source text
//! rather than a serialized AST: row values are JSON scalars only (spec
//! §3 "Row ... arbitrary string-keyed fields"), and re-parsing the text
//! with [`parser::parse`] on each substitution is cheap for
//! statement-sized queries.

use crate::{append_system_row, TableManager, VIEWS_TABLE};
use common::{row_of, DbError, DbResult, RecordId, Row};
use std::collections::BTreeMap;
use storage::{heap, Pager};
use types::Value;

fn to_row(name: &str, select_text: &str) -> Row {
    row_of([("name", Value::Text(name.to_string())), ("select", Value::Text(select_text.to_string()))])
}

pub struct ViewManager {
    views: BTreeMap<String, String>,
    rids: BTreeMap<String, RecordId>,
}

impl ViewManager {
    pub fn load(pager: &mut Pager, tables: &TableManager) -> DbResult<Self> {
        let mut views = BTreeMap::new();
        let mut rids = BTreeMap::new();
        if let Ok(entry) = tables.get(VIEWS_TABLE) {
            for (rid, row) in heap::scan_chain(pager, entry.start_page)? {
                if let (Some(name), Some(select)) =
                    (row.get("name").and_then(Value::as_str), row.get("select").and_then(Value::as_str))
                {
                    rids.insert(name.to_string(), rid);
                    views.insert(name.to_string(), select.to_string());
                }
            }
        }
        Ok(Self { views, rids })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.views.get(name).map(String::as_str)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.views.contains_key(name)
    }

    pub fn create(
        &mut self,
        pager: &mut Pager,
        tables: &mut TableManager,
        name: &str,
        select_text: String,
    ) -> DbResult<()> {
        if self.exists(name) {
            return Err(DbError::AlreadyExists(format!("view '{name}'")));
        }
        let rid = append_system_row(pager, tables, VIEWS_TABLE, &to_row(name, &select_text))?;
        self.rids.insert(name.to_string(), rid);
        self.views.insert(name.to_string(), select_text);
        Ok(())
    }

    pub fn drop_view(&mut self, pager: &mut Pager, name: &str) -> DbResult<()> {
        let rid = self.rids.remove(name).ok_or_else(|| DbError::NotFound(format!("view '{name}'")))?;
        heap::delete_row(pager, rid)?;
        self.views.remove(name);
        Ok(())
    }
}
