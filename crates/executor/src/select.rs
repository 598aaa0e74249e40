//! `SELECT` execution (spec §4.E "Select").

use crate::{criteria, join, scan};
use catalog::Catalog;
use common::{DbError, DbResult, Row};
use parser::{Projection, SelectStmt, SortDir};
use std::collections::HashSet;
use storage::Pager;
use types::Value;

fn project(row: &Row, projection: &Projection) -> Row {
    match projection {
        Projection::Star => row.clone(),
        Projection::Fields(fields) => {
            fields.iter().map(|f| (f.clone(), row.get(f).cloned().unwrap_or(Value::Null))).collect()
        }
    }
}

fn tuple_key(row: &Row) -> Vec<(String, Value)> {
    row.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

/// Run `stmt` to completion, resolving a view substitution first if
/// `stmt.table` names one (spec §4.E Select step 1).
pub fn run(pager: &mut Pager, catalog: &Catalog, stmt: &SelectStmt) -> DbResult<Vec<Row>> {
    if let Some(select_text) = catalog.views.get(&stmt.table) {
        let inner = match parser::parse(select_text) {
            parser::Command::Select(inner) => inner,
            _ => return Err(DbError::StorageFault(format!("view '{}' has a malformed body", stmt.table))),
        };
        return run(pager, catalog, &inner);
    }

    let mut rows: Vec<Row> = if stmt.joins.is_empty() {
        scan::filtered_scan(pager, catalog, &stmt.table, stmt.criteria.as_ref())?
            .into_iter()
            .map(|(_, row)| row)
            .collect()
    } else {
        let mut left: Vec<Row> = scan::full_scan(pager, catalog, &stmt.table)?.into_iter().map(|(_, r)| r).collect();
        for clause in &stmt.joins {
            let right: Vec<Row> = scan::full_scan(pager, catalog, &clause.table)?.into_iter().map(|(_, r)| r).collect();
            left = join::apply(left, right, clause);
        }
        match &stmt.criteria {
            Some(c) => left.into_iter().filter(|row| criteria::eval(c, row)).collect(),
            None => left,
        }
    };

    if stmt.distinct {
        // Dedup on the projected tuple, not the raw row (spec §4.D
        // "DISTINCT ... by deep-equality of the projected tuple"), so
        // project first, then the raw `rows` pipeline below is skipped
        // for the dedup step by projecting here and reusing `rows` as
        // already-projected output.
        let projected: Vec<Row> = rows.iter().map(|r| project(r, &stmt.projection)).collect();
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for row in projected {
            let key = tuple_key(&row);
            if seen.insert(key) {
                out.push(row);
            }
        }
        rows = out;
        return Ok(apply_order_limit(rows, stmt));
    }

    if let Some((field, dir)) = &stmt.order_by {
        sort_rows(&mut rows, field, *dir);
    }
    let rows = apply_offset_limit(rows, stmt);
    Ok(rows.into_iter().map(|r| project(&r, &stmt.projection)).collect())
}

fn apply_order_limit(mut rows: Vec<Row>, stmt: &SelectStmt) -> Vec<Row> {
    if let Some((field, dir)) = &stmt.order_by {
        sort_rows(&mut rows, field, *dir);
    }
    apply_offset_limit(rows, stmt)
}

fn sort_rows(rows: &mut [Row], field: &str, dir: SortDir) {
    rows.sort_by(|a, b| {
        let av = a.get(field).cloned().unwrap_or(Value::Null);
        let bv = b.get(field).cloned().unwrap_or(Value::Null);
        let ord = av.partial_compare(&bv).unwrap_or(std::cmp::Ordering::Equal);
        match dir {
            SortDir::Asc => ord,
            SortDir::Desc => ord.reverse(),
        }
    });
}

fn apply_offset_limit(rows: Vec<Row>, stmt: &SelectStmt) -> Vec<Row> {
    let offset = stmt.offset.unwrap_or(0) as usize;
    let skipped: Vec<Row> = rows.into_iter().skip(offset).collect();
    match stmt.limit {
        Some(limit) => skipped.into_iter().take(limit as usize).collect(),
        None => skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::Catalog;
    use common::row_of;
    use parser::Projection;
    use tempfile::tempdir;

    fn open() -> (tempfile::TempDir, Pager) {
        let dir = tempdir().unwrap();
        let pager = Pager::open(dir.path().join("t.sawit"), 32).unwrap();
        (dir, pager)
    }

    fn stmt(table: &str) -> SelectStmt {
        SelectStmt {
            projection: Projection::Star,
            distinct: false,
            table: table.to_string(),
            joins: vec![],
            criteria: None,
            order_by: None,
            limit: None,
            offset: None,
        }
    }

    #[test]
    fn empty_table_select_returns_empty() {
        let (_d, mut pager) = open();
        let mut catalog = Catalog::open(&mut pager).unwrap();
        catalog.tables.create_table(&mut pager, "t").unwrap();
        let rows = run(&mut pager, &catalog, &stmt("t")).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn limit_zero_returns_empty() {
        let (_d, mut pager) = open();
        let mut catalog = Catalog::open(&mut pager).unwrap();
        let entry = catalog.tables.create_table(&mut pager, "t").unwrap();
        let row = row_of([("id", Value::Number(1.0))]);
        storage::heap::append_row(&mut pager, entry.last_page, &row).unwrap();
        let mut s = stmt("t");
        s.limit = Some(0);
        let rows = run(&mut pager, &catalog, &s).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn offset_beyond_size_returns_empty() {
        let (_d, mut pager) = open();
        let mut catalog = Catalog::open(&mut pager).unwrap();
        let entry = catalog.tables.create_table(&mut pager, "t").unwrap();
        let row = row_of([("id", Value::Number(1.0))]);
        storage::heap::append_row(&mut pager, entry.last_page, &row).unwrap();
        let mut s = stmt("t");
        s.offset = Some(10);
        let rows = run(&mut pager, &catalog, &s).unwrap();
        assert!(rows.is_empty());
    }
}
