use super::*;
use tempfile::tempdir;

fn open_pager(pages: usize) -> (tempfile::TempDir, Pager) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.sawit");
    let pager = Pager::open(&path, pages).unwrap();
    (dir, pager)
}

#[test]
fn open_creates_page_zero() {
    let (_dir, mut pager) = open_pager(8);
    assert_eq!(pager.page_count(), 1);
    let (next, rows) = pager.read_page_objects(PageId(0)).unwrap();
    assert_eq!(next, PageId(0));
    assert!(rows.is_empty());
}

#[test]
fn alloc_page_extends_file_with_fresh_header() {
    let (_dir, mut pager) = open_pager(8);
    let id = pager.alloc_page().unwrap();
    assert_eq!(id, PageId(1));
    assert_eq!(pager.page_count(), 2);
    let (next, rows) = pager.read_page_objects(id).unwrap();
    assert_eq!(next, PageId(0));
    assert!(rows.is_empty());
}

#[test]
fn write_page_objects_round_trips() {
    let (_dir, mut pager) = open_pager(8);
    let id = pager.alloc_page().unwrap();
    let records = vec![br#"{"id":1}"#.to_vec(), br#"{"id":2}"#.to_vec()];
    pager.write_page_objects(id, PageId(0), &records).unwrap();

    let (next, rows) = pager.read_page_objects(id).unwrap();
    assert_eq!(next, PageId(0));
    assert_eq!(rows, records);
}

#[test]
fn write_page_invalidates_object_cache() {
    let (_dir, mut pager) = open_pager(8);
    let id = pager.alloc_page().unwrap();
    pager
        .write_page_objects(id, PageId(0), &[br#"{"id":1}"#.to_vec()])
        .unwrap();
    let _ = pager.read_page_objects(id).unwrap();

    pager
        .write_page_objects(id, PageId(0), &[br#"{"id":2}"#.to_vec()])
        .unwrap();
    let (_, rows) = pager.read_page_objects(id).unwrap();
    assert_eq!(rows, vec![br#"{"id":2}"#.to_vec()]);
}

#[test]
fn set_next_page_links_chain_without_touching_records() {
    let (_dir, mut pager) = open_pager(8);
    let a = pager.alloc_page().unwrap();
    let b = pager.alloc_page().unwrap();
    pager
        .write_page_objects(a, PageId(0), &[br#"{"id":1}"#.to_vec()])
        .unwrap();
    pager.set_next_page(a, b).unwrap();

    let (next, rows) = pager.read_page_objects(a).unwrap();
    assert_eq!(next, b);
    assert_eq!(rows, vec![br#"{"id":1}"#.to_vec()]);
}

#[test]
fn out_of_range_page_is_a_storage_fault() {
    let (_dir, mut pager) = open_pager(8);
    let err = pager.read_page(PageId(99)).unwrap_err();
    assert!(matches!(err, DbError::StorageFault(_)));
}

#[test]
fn chain_ids_walks_the_full_linked_list() {
    let (_dir, mut pager) = open_pager(8);
    let a = pager.alloc_page().unwrap();
    let b = pager.alloc_page().unwrap();
    let c = pager.alloc_page().unwrap();
    pager.set_next_page(a, b).unwrap();
    pager.set_next_page(b, c).unwrap();

    let ids = pager.chain_ids(a).unwrap();
    assert_eq!(ids, vec![a, b, c]);
}

#[test]
fn reopen_preserves_pages() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.sawit");
    {
        let mut pager = Pager::open(&path, 8).unwrap();
        let id = pager.alloc_page().unwrap();
        pager
            .write_page_objects(id, PageId(0), &[br#"{"id":7}"#.to_vec()])
            .unwrap();
        pager.flush().unwrap();
    }
    let mut reopened = Pager::open(&path, 8).unwrap();
    assert_eq!(reopened.page_count(), 2);
    let (_, rows) = reopened.read_page_objects(PageId(1)).unwrap();
    assert_eq!(rows, vec![br#"{"id":7}"#.to_vec()]);
}

#[test]
fn record_that_does_not_fit_a_page_is_rejected() {
    let (_dir, mut pager) = open_pager(8);
    let id = pager.alloc_page().unwrap();
    let huge = vec![b'x'; PAGE_SIZE];
    let err = pager.write_page_objects(id, PageId(0), &[huge]).unwrap_err();
    assert!(matches!(err, DbError::StorageFault(_)));
}
