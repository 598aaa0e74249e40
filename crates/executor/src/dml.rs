//! `INSERT`/`UPDATE`/`DELETE` execution (spec §4.E "Insert", "Update",
//! "Delete"). Trigger firing and the observer callback are the caller's
//! responsibility (the `database` crate owns the catalog's
//! `TriggerManager` and session-level observer, not this crate) — each
//! function here returns the rows it touched so the caller can fire
//! `AFTER` triggers / emit events with the final row state.

use crate::scan;
use catalog::Catalog;
use common::{DbResult, PageId, RecordId, Row};
use parser::Criteria;
use std::collections::BTreeMap;
use storage::heap::{self, ReplaceOutcome};
use storage::Pager;

/// Insert `row` (already schema-coerced by the caller, per spec §4.E
/// Insert's schema-validation step) into `table`, updating every index
/// defined on it.
pub fn insert(pager: &mut Pager, catalog: &mut Catalog, table: &str, row: Row) -> DbResult<RecordId> {
    let entry = catalog.tables.get(table)?.clone();
    let (new_last, rid) = heap::append_row(pager, entry.last_page, &row)?;
    if new_last != entry.last_page {
        catalog.tables.update_last_page(pager, table, new_last)?;
    }
    for index in catalog.indexes.indexes_for_mut(table) {
        if let Some(value) = row.get(index.field()) {
            index.insert(value.clone(), rid);
        }
    }
    Ok(rid)
}

/// Apply `compute` to every row of `table` matching `criteria`, rewriting
/// storage and index entries (spec §4.E "Update"). Returns the
/// `(old_row, new_row, new_rid)` triples for trigger/observer firing.
pub fn update(
    pager: &mut Pager,
    catalog: &mut Catalog,
    table: &str,
    criteria: Option<&Criteria>,
    compute: impl Fn(&Row) -> Row,
) -> DbResult<Vec<(Row, Row, RecordId)>> {
    let mut matches = scan::filtered_scan(pager, catalog, table, criteria)?;
    // Rows sharing a page must be rewritten highest-slot-first: a
    // relocated row is removed from its page (shifting every later slot
    // down by one), so touching a lower slot first would make every
    // subsequent rid on that page point at the wrong row.
    matches.sort_by(|(a, _), (b, _)| a.page_id.cmp(&b.page_id).then(b.slot.cmp(&a.slot)));
    let mut out = Vec::with_capacity(matches.len());
    for (rid, old_row) in matches {
        let new_row = compute(&old_row);
        let entry = catalog.tables.get(table)?.clone();
        let (outcome, new_last, new_rid) = heap::replace_row(pager, rid, entry.last_page, &new_row)?;
        if matches!(outcome, ReplaceOutcome::Relocated) && new_last != entry.last_page {
            catalog.tables.update_last_page(pager, table, new_last)?;
        }
        for index in catalog.indexes.indexes_for_mut(table) {
            let field = index.field().to_string();
            let old_key = old_row.get(&field).cloned();
            let new_key = new_row.get(&field).cloned();
            if old_key != new_key {
                if let Some(k) = old_key {
                    index.delete(&k, Some(rid));
                }
                if let Some(k) = new_key {
                    index.insert(k, new_rid);
                }
            } else if outcome == ReplaceOutcome::Relocated {
                if let Some(k) = old_key {
                    index.delete(&k, Some(rid));
                    index.insert(k, new_rid);
                }
            }
        }
        out.push((old_row, new_row, new_rid));
    }
    Ok(out)
}

/// Delete every row of `table` matching `criteria` (spec §4.E "Delete").
/// Returns the deleted rows for trigger/observer firing.
pub fn delete(
    pager: &mut Pager,
    catalog: &mut Catalog,
    table: &str,
    criteria: Option<&Criteria>,
) -> DbResult<Vec<Row>> {
    let matches = scan::filtered_scan(pager, catalog, table, criteria)?;

    // Group matched slots by page and delete each page's batch in one
    // `delete_rows_in_page` call. Deleting row-by-row via `delete_row`
    // would compact the page after every single removal, so a second
    // match on the same page would land on a slot that has already
    // shifted down and either delete the wrong row or no-op.
    let mut by_page: BTreeMap<PageId, Vec<u16>> = BTreeMap::new();
    for (rid, _) in &matches {
        by_page.entry(rid.page_id).or_default().push(rid.slot);
    }
    for (page, slots) in by_page {
        heap::delete_rows_in_page(pager, page, &slots)?;
    }

    let mut out = Vec::with_capacity(matches.len());
    for (rid, row) in matches {
        for index in catalog.indexes.indexes_for_mut(table) {
            if let Some(value) = row.get(index.field()) {
                index.delete(value, Some(rid));
            }
        }
        out.push(row);
    }
    Ok(out)
}
