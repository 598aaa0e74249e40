//! Row-level operations over a table's page chain, built on the raw
//! byte-tuple primitives in [`crate::Pager`]. Every table in this engine
//! — including the self-hosted catalog table `_tables` — is just a page
//! chain walked with these functions.

use crate::{Pager, PAGE_SIZE};
use common::{DbError, DbResult, PageId, RecordId, Row};

fn encode(row: &Row) -> DbResult<Vec<u8>> {
    serde_json::to_vec(row).map_err(|e| DbError::StorageFault(format!("encode row: {e}")))
}

fn decode(bytes: &[u8]) -> DbResult<Row> {
    serde_json::from_slice(bytes).map_err(|e| DbError::StorageFault(format!("decode row: {e}")))
}

/// Walk every page in `start`'s chain, decoding every live record.
pub fn scan_chain(pager: &mut Pager, start: PageId) -> DbResult<Vec<(RecordId, Row)>> {
    let mut out = Vec::new();
    let ids = pager.chain_ids(start)?;
    for page_id in ids {
        let (_, raw) = pager.read_page_objects(page_id)?;
        for (slot, bytes) in raw.iter().enumerate() {
            out.push((RecordId { page_id, slot: slot as u16 }, decode(bytes)?));
        }
    }
    Ok(out)
}

/// Fetch a single row by its exact location.
pub fn get_row(pager: &mut Pager, rid: RecordId) -> DbResult<Row> {
    let (_, raw) = pager.read_page_objects(rid.page_id)?;
    let bytes = raw
        .get(rid.slot as usize)
        .ok_or_else(|| DbError::StorageFault(format!("slot {} missing on page {:?}", rid.slot, rid.page_id)))?;
    decode(bytes)
}

fn page_used_bytes(raw: &[Vec<u8>]) -> usize {
    8 + raw.iter().map(|r| 2 + r.len()).sum::<usize>()
}

/// Append a row to a table's chain, growing it with a fresh page when
/// the current last page has no room (spec §4.E Insert). Returns the
/// (possibly unchanged) last-page id and the new row's location.
pub fn append_row(pager: &mut Pager, last_page: PageId, row: &Row) -> DbResult<(PageId, RecordId)> {
    let bytes = encode(row)?;
    let (next, mut raw) = pager.read_page_objects(last_page)?;
    if page_used_bytes(&raw) + 2 + bytes.len() <= PAGE_SIZE {
        let slot = raw.len() as u16;
        raw.push(bytes);
        pager.write_page_objects(last_page, next, &raw)?;
        return Ok((last_page, RecordId { page_id: last_page, slot }));
    }
    let new_page = pager.alloc_page()?;
    pager.set_next_page(last_page, new_page)?;
    pager.write_page_objects(new_page, PageId(0), &[bytes])?;
    Ok((new_page, RecordId { page_id: new_page, slot: 0 }))
}

/// Outcome of [`replace_row`]: whether the row stayed on its original
/// page or had to relocate to the table's last page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceOutcome {
    InPlace,
    Relocated,
}

/// Replace a row's content, rewriting its page in place if the new
/// encoding still fits, or deleting it from its page and appending to
/// the table's last page otherwise (spec §4.E Update). Returns the
/// outcome, the table's possibly-updated last page, and the row's new
/// location.
pub fn replace_row(
    pager: &mut Pager,
    rid: RecordId,
    table_last_page: PageId,
    new_row: &Row,
) -> DbResult<(ReplaceOutcome, PageId, RecordId)> {
    let new_bytes = encode(new_row)?;
    let (next, mut raw) = pager.read_page_objects(rid.page_id)?;
    let slot = rid.slot as usize;
    if slot >= raw.len() {
        return Err(DbError::StorageFault(format!("slot {slot} missing on page {:?}", rid.page_id)));
    }
    let others_used: usize = 8 + raw
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != slot)
        .map(|(_, r)| 2 + r.len())
        .sum::<usize>();
    if others_used + 2 + new_bytes.len() <= PAGE_SIZE {
        raw[slot] = new_bytes;
        pager.write_page_objects(rid.page_id, next, &raw)?;
        return Ok((ReplaceOutcome::InPlace, table_last_page, rid));
    }

    raw.remove(slot);
    pager.write_page_objects(rid.page_id, next, &raw)?;
    let (new_last, new_rid) = append_row(pager, table_last_page, new_row)?;
    Ok((ReplaceOutcome::Relocated, new_last, new_rid))
}

/// Delete one row from its page, compacting the remaining records so the
/// page's record count always matches its live rows (spec §8 invariant
/// 1).
pub fn delete_row(pager: &mut Pager, rid: RecordId) -> DbResult<()> {
    delete_rows_in_page(pager, rid.page_id, &[rid.slot])
}

/// Delete several rows that share a page in one rewrite.
pub fn delete_rows_in_page(pager: &mut Pager, page: PageId, slots: &[u16]) -> DbResult<()> {
    let (next, mut raw) = pager.read_page_objects(page)?;
    let mut sorted = slots.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    sorted.dedup();
    for slot in sorted {
        if (slot as usize) < raw.len() {
            raw.remove(slot as usize);
        }
    }
    pager.write_page_objects(page, next, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::row_of;
    use tempfile::tempdir;
    use types::Value;

    fn pager() -> (tempfile::TempDir, Pager) {
        let dir = tempdir().unwrap();
        let pager = Pager::open(dir.path().join("t.sawit"), 32).unwrap();
        (dir, pager)
    }

    #[test]
    fn append_grows_the_chain_when_a_page_fills_up() {
        let (_dir, mut pager) = pager();
        let table = pager.alloc_page().unwrap();
        let mut last = table;
        let big_text = "x".repeat(500);
        for i in 0..20 {
            let row = row_of([("id", Value::Number(i as f64)), ("blob", Value::Text(big_text.clone()))]);
            let (new_last, _) = append_row(&mut pager, last, &row).unwrap();
            last = new_last;
        }
        let rows = scan_chain(&mut pager, table).unwrap();
        assert_eq!(rows.len(), 20);
        assert!(pager.chain_ids(table).unwrap().len() > 1);
    }

    #[test]
    fn replace_in_place_when_it_fits() {
        let (_dir, mut pager) = pager();
        let table = pager.alloc_page().unwrap();
        let row = row_of([("id", Value::Number(1.0)), ("name", Value::Text("a".into()))]);
        let (_, rid) = append_row(&mut pager, table, &row).unwrap();

        let updated = row_of([("id", Value::Number(1.0)), ("name", Value::Text("b".into()))]);
        let (outcome, last, new_rid) = replace_row(&mut pager, rid, table, &updated).unwrap();
        assert_eq!(outcome, ReplaceOutcome::InPlace);
        assert_eq!(last, table);
        assert_eq!(get_row(&mut pager, new_rid).unwrap().get("name"), Some(&Value::Text("b".into())));
    }

    #[test]
    fn replace_relocates_when_the_page_is_full() {
        let (_dir, mut pager) = pager();
        let table = pager.alloc_page().unwrap();
        let filler = "x".repeat(3900);
        let small = row_of([("id", Value::Number(1.0)), ("v", Value::Text("short".into()))]);
        let (_, small_rid) = append_row(&mut pager, table, &small).unwrap();
        let padding = row_of([("pad", Value::Text(filler))]);
        let (_, _) = append_row(&mut pager, table, &padding).unwrap();

        let bigger = row_of([("id", Value::Number(1.0)), ("v", Value::Text("x".repeat(2000)))]);
        let (outcome, last, new_rid) = replace_row(&mut pager, small_rid, table, &bigger).unwrap();
        assert_eq!(outcome, ReplaceOutcome::Relocated);
        assert_ne!(last, table);
        assert_eq!(
            get_row(&mut pager, new_rid).unwrap().get("v"),
            Some(&Value::Text("x".repeat(2000)))
        );
    }

    #[test]
    fn delete_rows_in_page_removes_every_requested_slot() {
        let (_dir, mut pager) = pager();
        let table = pager.alloc_page().unwrap();
        let mut last = table;
        let mut rids = Vec::new();
        for i in 0..5 {
            let row = row_of([("id", Value::Number(i as f64))]);
            let (new_last, rid) = append_row(&mut pager, last, &row).unwrap();
            last = new_last;
            rids.push(rid);
        }
        // All five rows share one page; delete three of them (including
        // adjacent slots 1 and 2) in a single batched call and confirm
        // every requested row — not just the first — is actually gone.
        let slots: Vec<u16> = [0usize, 1, 3].iter().map(|&i| rids[i].slot).collect();
        delete_rows_in_page(&mut pager, table, &slots).unwrap();

        let rows = scan_chain(&mut pager, table).unwrap();
        let ids: Vec<i64> = rows.iter().map(|(_, r)| r.get("id").unwrap().as_number().unwrap() as i64).collect();
        assert_eq!(ids, vec![2, 4]);
    }

    #[test]
    fn delete_compacts_and_scan_reflects_remaining_rows() {
        let (_dir, mut pager) = pager();
        let table = pager.alloc_page().unwrap();
        let mut last = table;
        let mut rids = Vec::new();
        for i in 0..5 {
            let row = row_of([("id", Value::Number(i as f64))]);
            let (new_last, rid) = append_row(&mut pager, last, &row).unwrap();
            last = new_last;
            rids.push(rid);
        }
        delete_row(&mut pager, rids[2]).unwrap();
        let rows = scan_chain(&mut pager, table).unwrap();
        assert_eq!(rows.len(), 4);
        let ids: Vec<i64> = rows
            .iter()
            .map(|(_, r)| r.get("id").unwrap().as_number().unwrap() as i64)
            .collect();
        assert_eq!(ids, vec![0, 1, 3, 4]);
    }
}
