use super::*;
use common::PageId;

fn rid(page: u32, slot: u16) -> RecordId {
    RecordId { page_id: PageId(page), slot }
}

#[test]
fn empty_index_finds_nothing() {
    let idx = BTreeIndex::new("t", "id");
    assert!(idx.find(&Value::Number(1.0)).is_empty());
}

#[test]
fn insert_and_find_single_key() {
    let mut idx = BTreeIndex::new("t", "id");
    idx.insert(Value::Number(42.0), rid(0, 0));
    assert_eq!(idx.find(&Value::Number(42.0)), vec![rid(0, 0)]);
    assert!(idx.find(&Value::Number(7.0)).is_empty());
}

#[test]
fn duplicate_keys_accumulate_row_refs() {
    let mut idx = BTreeIndex::new("t", "dept");
    idx.insert(Value::Number(10.0), rid(0, 0));
    idx.insert(Value::Number(10.0), rid(0, 1));
    let mut found = idx.find(&Value::Number(10.0));
    found.sort_by_key(|r| r.slot);
    assert_eq!(found, vec![rid(0, 0), rid(0, 1)]);
}

#[test]
fn delete_removes_a_single_reference() {
    let mut idx = BTreeIndex::new("t", "id");
    idx.insert(Value::Number(1.0), rid(0, 0));
    idx.insert(Value::Number(1.0), rid(0, 1));
    idx.delete(&Value::Number(1.0), Some(rid(0, 0)));
    assert_eq!(idx.find(&Value::Number(1.0)), vec![rid(0, 1)]);
}

#[test]
fn delete_without_rid_clears_the_key() {
    let mut idx = BTreeIndex::new("t", "id");
    idx.insert(Value::Number(1.0), rid(0, 0));
    idx.delete(&Value::Number(1.0), None);
    assert!(idx.find(&Value::Number(1.0)).is_empty());
}

#[test]
fn range_is_inclusive_and_sorted() {
    let mut idx = BTreeIndex::new("t", "id");
    for i in 0..200 {
        idx.insert(Value::Number(i as f64), rid(0, i as u16));
    }
    let got = idx.range(&Value::Number(50.0), &Value::Number(55.0));
    let mut keys: Vec<u16> = got.iter().map(|r| r.slot).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec![50, 51, 52, 53, 54, 55]);
}

#[test]
fn insert_past_fanout_splits_and_stays_correct() {
    let mut idx = BTreeIndex::new("t", "id");
    let n = 500;
    for i in 0..n {
        idx.insert(Value::Number(i as f64), rid(0, (i % u16::MAX as i32) as u16));
    }
    assert!(idx.stats().node_count > 1);
    for i in 0..n {
        assert!(!idx.find(&Value::Number(i as f64)).is_empty(), "missing key {i}");
    }
}

#[test]
fn all_entries_matches_inserted_multiset() {
    let mut idx = BTreeIndex::new("t", "id");
    idx.insert(Value::Number(1.0), rid(0, 0));
    idx.insert(Value::Text("a".into()), rid(0, 1));
    idx.insert(Value::Bool(true), rid(0, 2));
    assert_eq!(idx.all_entries().len(), 3);
}

#[test]
fn cross_type_keys_order_without_panicking() {
    let mut idx = BTreeIndex::new("t", "mixed");
    idx.insert(Value::Null, rid(0, 0));
    idx.insert(Value::Bool(false), rid(0, 1));
    idx.insert(Value::Number(3.0), rid(0, 2));
    idx.insert(Value::Text("z".into()), rid(0, 3));
    assert_eq!(idx.find(&Value::Null), vec![rid(0, 0)]);
    assert_eq!(idx.find(&Value::Text("z".into())), vec![rid(0, 3)]);
}
