use super::*;
use common::row_of;
use tempfile::tempdir;
use types::{SqlType, Value};

fn open_pager() -> (tempfile::TempDir, Pager) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("catalog_test.db");
    let pager = Pager::open(&path, 32).unwrap();
    (dir, pager)
}

#[test]
fn bootstraps_tables_table_on_fresh_db() {
    let (_dir, mut pager) = open_pager();
    let catalog = Catalog::open(&mut pager).unwrap();
    assert!(catalog.tables.exists(TABLES_TABLE));
    let entry = catalog.tables.get(TABLES_TABLE).unwrap();
    assert_eq!(entry.start_page, common::PageId(0));
    assert!(entry.system);
}

#[test]
fn create_table_registers_entry_and_persists_across_reopen() {
    let (_dir, mut pager) = open_pager();
    {
        let mut catalog = Catalog::open(&mut pager).unwrap();
        catalog.tables.create_table(&mut pager, "people").unwrap();
        assert!(catalog.tables.exists("people"));
        pager.flush().unwrap();
    }
    let mut catalog = Catalog::open(&mut pager).unwrap();
    assert!(catalog.tables.exists("people"));
    assert!(catalog.tables.user_tables().any(|e| e.name == "people"));
}

#[test]
fn create_table_rejects_duplicate() {
    let (_dir, mut pager) = open_pager();
    let mut catalog = Catalog::open(&mut pager).unwrap();
    catalog.tables.create_table(&mut pager, "people").unwrap();
    let err = catalog.tables.create_table(&mut pager, "people").unwrap_err();
    assert!(matches!(err, DbError::AlreadyExists(_)));
}

#[test]
fn drop_table_removes_entry_but_keeps_pages() {
    let (_dir, mut pager) = open_pager();
    let mut catalog = Catalog::open(&mut pager).unwrap();
    catalog.tables.create_table(&mut pager, "people").unwrap();
    catalog.tables.drop_table(&mut pager, "people").unwrap();
    assert!(!catalog.tables.exists("people"));
}

#[test]
fn index_rebuilds_from_table_scan_on_reopen() {
    let (_dir, mut pager) = open_pager();
    {
        let mut catalog = Catalog::open(&mut pager).unwrap();
        let entry = catalog.tables.create_table(&mut pager, "people").unwrap();
        let mut last = entry.last_page;
        for i in 0..5 {
            let row = row_of([("id", Value::Number(i as f64)), ("name", Value::Text(format!("p{i}")))]);
            let (new_last, _) = heap::append_row(&mut pager, last, &row).unwrap();
            last = new_last;
        }
        catalog.tables.update_last_page(&mut pager, "people", last).unwrap();
        catalog.indexes.create(&mut pager, &mut catalog.tables, "people", "id").unwrap();
        pager.flush().unwrap();
    }
    let catalog = Catalog::open(&mut pager).unwrap();
    let index = catalog.indexes.get("people", "id").unwrap();
    assert_eq!(index.stats().entry_count, 5);
    assert_eq!(index.find(&Value::Number(2.0)).len(), 1);
}

#[test]
fn schema_coercion_fills_defaults_and_checks_required() {
    let (_dir, mut pager) = open_pager();
    let mut catalog = Catalog::open(&mut pager).unwrap();
    catalog.tables.create_table(&mut pager, "people").unwrap();
    let columns = vec![
        SchemaColumn { name: "id".into(), ty: SqlType::Number, required: true, default: None },
        SchemaColumn {
            name: "active".into(),
            ty: SqlType::Bool,
            required: false,
            default: Some(Value::Bool(true)),
        },
    ];
    catalog.schemas.define(&mut pager, &mut catalog.tables, "people", columns).unwrap();

    let row = row_of([("id", Value::Text("3".into()))]);
    let coerced = catalog.schemas.coerce_row("people", &row).unwrap();
    assert_eq!(coerced.get("id"), Some(&Value::Number(3.0)));
    assert_eq!(coerced.get("active"), Some(&Value::Bool(true)));

    let missing = Row::new();
    let err = catalog.schemas.coerce_row("people", &missing).unwrap_err();
    assert!(matches!(err, DbError::ConstraintViolation(_)));
}

#[test]
fn schema_less_table_passes_rows_through_unchanged() {
    let (_dir, mut pager) = open_pager();
    let catalog = Catalog::open(&mut pager).unwrap();
    let row = row_of([("anything", Value::Text("goes".into()))]);
    let out = catalog.schemas.coerce_row("untyped", &row).unwrap();
    assert_eq!(out, row);
}

#[test]
fn view_create_get_drop_round_trips_and_persists_deletion() {
    let (_dir, mut pager) = open_pager();
    {
        let mut catalog = Catalog::open(&mut pager).unwrap();
        catalog
            .views
            .create(&mut pager, &mut catalog.tables, "active_people", "SELECT * FROM people WHERE active = true".into())
            .unwrap();
        assert!(catalog.views.exists("active_people"));
        pager.flush().unwrap();
    }
    let mut catalog = Catalog::open(&mut pager).unwrap();
    assert!(catalog.views.exists("active_people"));
    catalog.views.drop_view(&mut pager, "active_people").unwrap();
    assert!(!catalog.views.exists("active_people"));
    pager.flush().unwrap();

    let catalog = Catalog::open(&mut pager).unwrap();
    assert!(!catalog.views.exists("active_people"));
}

#[test]
fn trigger_matching_filters_by_table_timing_event() {
    let (_dir, mut pager) = open_pager();
    let mut catalog = Catalog::open(&mut pager).unwrap();
    catalog
        .triggers
        .create(
            &mut pager,
            &mut catalog.tables,
            TriggerDef {
                name: "audit_insert".into(),
                table: "people".into(),
                timing: TriggerTiming::After,
                event: TriggerEvent::Insert,
                action: "log_audit".into(),
            },
        )
        .unwrap();

    let hits: Vec<_> = catalog.triggers.matching("people", TriggerTiming::After, TriggerEvent::Insert).collect();
    assert_eq!(hits.len(), 1);
    assert!(catalog.triggers.matching("people", TriggerTiming::Before, TriggerEvent::Insert).next().is_none());
    assert!(catalog.triggers.matching("other", TriggerTiming::After, TriggerEvent::Insert).next().is_none());
}

#[test]
fn trigger_drop_removes_definition() {
    let (_dir, mut pager) = open_pager();
    let mut catalog = Catalog::open(&mut pager).unwrap();
    catalog
        .triggers
        .create(
            &mut pager,
            &mut catalog.tables,
            TriggerDef {
                name: "audit_insert".into(),
                table: "people".into(),
                timing: TriggerTiming::After,
                event: TriggerEvent::Insert,
                action: "log_audit".into(),
            },
        )
        .unwrap();
    catalog.triggers.drop_trigger(&mut pager, "audit_insert").unwrap();
    assert!(catalog.triggers.matching("people", TriggerTiming::After, TriggerEvent::Insert).next().is_none());
}

#[test]
fn procedure_is_catalogued_but_execution_is_unimplemented() {
    let (_dir, mut pager) = open_pager();
    let mut catalog = Catalog::open(&mut pager).unwrap();
    catalog.procedures.create(&mut pager, &mut catalog.tables, "nightly_cleanup", "DELETE FROM logs".into()).unwrap();
    assert_eq!(catalog.procedures.get("nightly_cleanup"), Some("DELETE FROM logs"));

    let err = catalog.procedures.execute("nightly_cleanup").unwrap_err();
    assert!(matches!(err, DbError::NotFound(_)));

    let err = catalog.procedures.execute("does_not_exist").unwrap_err();
    assert!(matches!(err, DbError::NotFound(_)));
}

#[test]
fn system_table_names_are_reserved() {
    assert!(is_system_table("_tables"));
    assert!(is_system_table("_indexes"));
    assert!(!is_system_table("people"));
}
