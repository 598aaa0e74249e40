use super::*;
use std::io;

#[test]
fn config_defaults_are_sane() {
    let cfg = Config::default();
    assert_eq!(cfg.buffer_pool_pages, 256);
    assert!(cfg.wal.enabled);
    assert_eq!(cfg.port, 4567);
}

#[test]
fn db_error_formats_cleanly() {
    let err = DbError::StorageFault("corruption".into());
    assert!(format!("{err}").contains("storage"));
}

#[test]
fn row_of_builds_a_map() {
    let row = row_of([("id", Value::Number(1.0)), ("name", Value::Text("A".into()))]);
    assert_eq!(row.get("id"), Some(&Value::Number(1.0)));
    assert_eq!(row.len(), 2);
}

#[test]
fn io_error_converts() {
    let e = io::Error::other("oops");
    let db_err: DbError = e.into();
    assert!(matches!(db_err, DbError::Io(_)));
}

#[test]
fn resolved_worker_count_falls_back_to_cpu_count() {
    let cfg = Config::default();
    assert!(cfg.resolved_worker_count() >= 1);
}
