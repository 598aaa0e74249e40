//! Table scan and index fast-path row retrieval (spec §4.E Select steps
//! 3-4, §9 "`_pageId` hint": the scan yields `(RecordId, Row)` pairs so
//! update/delete can rewrite a row's originating page without
//! re-scanning, rather than attaching a hidden field to the row).

use crate::criteria;
use catalog::Catalog;
use common::{DbResult, RecordId, Row};
use parser::Criteria as Crit;
use storage::{heap, Pager};

/// Every row of `table`, regardless of predicate (used by joins and by
/// Select when no index fast path applies).
pub fn full_scan(pager: &mut Pager, catalog: &Catalog, table: &str) -> DbResult<Vec<(RecordId, Row)>> {
    let entry = catalog.tables.get(table)?;
    heap::scan_chain(pager, entry.start_page)
}

/// Rows of `table` passing `criteria`, using the index fast path when
/// `criteria` is a single equality on an indexed field (spec §4.E Select
/// step 4: "look up directly in the index and skip the table scan").
pub fn filtered_scan(
    pager: &mut Pager,
    catalog: &Catalog,
    table: &str,
    criteria: Option<&Crit>,
) -> DbResult<Vec<(RecordId, Row)>> {
    if let Some(c) = criteria {
        if let Some((field, value)) = criteria::as_single_equality(c) {
            if let Some(index) = catalog.indexes.get(table, field) {
                let mut out = Vec::new();
                for rid in index.find(&value) {
                    if let Ok(row) = heap::get_row(pager, rid) {
                        out.push((rid, row));
                    }
                }
                return Ok(out);
            }
        }
    }
    let rows = full_scan(pager, catalog, table)?;
    Ok(match criteria {
        Some(c) => rows.into_iter().filter(|(_, row)| criteria::eval(c, row)).collect(),
        None => rows,
    })
}
