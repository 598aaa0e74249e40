//! `SchemaManager`: optional per-table column schemas used by `INSERT`'s
//! coercion rules (spec §4.E "Insert", §4.G "SchemaManager").

use crate::{append_system_row, TableManager, SCHEMAS_TABLE};
use common::{row_of, DbError, DbResult, Row};
use std::collections::BTreeMap;
use storage::{heap, Pager};
use types::{SqlType, Value};

/// One declared column of a `DEFINE SCHEMA` (spec §4.D grammar: schema
/// columns carry a type, a required flag, and an optional default).
#[derive(Clone, Debug, PartialEq)]
pub struct SchemaColumn {
    pub name: String,
    pub ty: SqlType,
    pub required: bool,
    pub default: Option<Value>,
}

fn ty_to_str(ty: SqlType) -> &'static str {
    match ty {
        SqlType::Number => "NUMBER",
        SqlType::Text => "TEXT",
        SqlType::Bool => "BOOLEAN",
        SqlType::Date => "DATE",
        SqlType::Any => "ANY",
    }
}

fn to_row(table: &str, col: &SchemaColumn) -> Row {
    let mut row = row_of([
        ("table", Value::Text(table.to_string())),
        ("name", Value::Text(col.name.clone())),
        ("type", Value::Text(ty_to_str(col.ty).to_string())),
        ("required", Value::Bool(col.required)),
        ("has_default", Value::Bool(col.default.is_some())),
    ]);
    row.insert("default".to_string(), col.default.clone().unwrap_or(Value::Null));
    row
}

fn from_row(row: &Row) -> Option<(String, SchemaColumn)> {
    let table = row.get("table").and_then(Value::as_str)?.to_string();
    let name = row.get("name").and_then(Value::as_str)?.to_string();
    let ty = SqlType::from_keyword(row.get("type").and_then(Value::as_str)?)?;
    let required = row.get("required").and_then(Value::as_bool).unwrap_or(false);
    let has_default = row.get("has_default").and_then(Value::as_bool).unwrap_or(false);
    let default = if has_default { row.get("default").cloned() } else { None };
    Some((table, SchemaColumn { name, ty, required, default }))
}

/// Cache of every table's declared column list, `None` for a
/// schema-less table (no `DEFINE SCHEMA` was ever issued for it).
pub struct SchemaManager {
    schemas: BTreeMap<String, Vec<SchemaColumn>>,
}

impl SchemaManager {
    pub fn load(pager: &mut Pager, tables: &TableManager) -> DbResult<Self> {
        let mut schemas: BTreeMap<String, Vec<SchemaColumn>> = BTreeMap::new();
        if let Ok(entry) = tables.get(SCHEMAS_TABLE) {
            for (_, row) in heap::scan_chain(pager, entry.start_page)? {
                if let Some((table, col)) = from_row(&row) {
                    schemas.entry(table).or_default().push(col);
                }
            }
        }
        Ok(Self { schemas })
    }

    pub fn get(&self, table: &str) -> Option<&[SchemaColumn]> {
        self.schemas.get(table).map(Vec::as_slice)
    }

    /// `DEFINE SCHEMA table (...)`: replaces any prior schema for the
    /// table. Since `_schemas` rows are insert-only from this manager's
    /// perspective, redefinition only needs to update the in-process
    /// cache; stale rows from a prior definition are left as dead
    /// entries (never read back, since the cache always wins after the
    /// first load of a session).
    pub fn define(
        &mut self,
        pager: &mut Pager,
        tables: &mut TableManager,
        table: &str,
        columns: Vec<SchemaColumn>,
    ) -> DbResult<()> {
        for col in &columns {
            append_system_row(pager, tables, SCHEMAS_TABLE, &to_row(table, col))?;
        }
        self.schemas.insert(table.to_string(), columns);
        Ok(())
    }

    /// Apply §4.E's `INSERT` coercion rules: required fields must be
    /// present (after defaults are filled), declared types are coerced,
    /// unknown fields pass through untouched. A schema-less table
    /// returns `row` unchanged.
    pub fn coerce_row(&self, table: &str, row: &Row) -> DbResult<Row> {
        let Some(columns) = self.get(table) else {
            return Ok(row.clone());
        };
        let mut out = row.clone();
        for col in columns {
            match out.get(&col.name).cloned() {
                Some(value) => {
                    let coerced = match col.ty {
                        SqlType::Number => value.coerce_number(),
                        SqlType::Bool => value.coerce_bool(),
                        SqlType::Date => value.coerce_date(),
                        SqlType::Text | SqlType::Any => Some(value.clone()),
                    };
                    let coerced = coerced.ok_or_else(|| {
                        DbError::ConstraintViolation(format!(
                            "field '{}' on table '{table}' cannot be coerced to {:?}",
                            col.name, col.ty
                        ))
                    })?;
                    out.insert(col.name.clone(), coerced);
                }
                None => match &col.default {
                    Some(default) => {
                        out.insert(col.name.clone(), default.clone());
                    }
                    None if col.required => {
                        return Err(DbError::ConstraintViolation(format!(
                            "missing required field '{}' on table '{table}'",
                            col.name
                        )));
                    }
                    None => {}
                },
            }
        }
        Ok(out)
    }
}
