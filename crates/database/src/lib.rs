//! One open database: the `Pager` + `Catalog` + (optional) `Wal`, the
//! per-connection [`Session`], and statement dispatch over every
//! [`parser::Command`] variant (spec §4.E "Executors", §4.F
//! "Transaction Buffer", §4.G "Session & Catalog Services").
//!
//! Statements naming Select/Insert/Update/Delete/Aggregate/Explain are
//! handed to the `executor` crate; everything else (DDL, views,
//! triggers, procedures, transaction control) is dispatched directly
//! against the open [`Catalog`] here, since that's the only crate that
//! owns both a `Pager` and a `Catalog` at once.

mod render;
mod result;
mod triggers;
mod wal_adapter;

pub use result::QueryResult;
pub use wal_adapter::WalAdapter;

use catalog::Catalog;
use common::{row_of, DbError, DbResult, WalConfig};
use parser::Command;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use storage::Pager;
use txbuffer::TransactionBuffer;
use types::Value;
use wal::Wal;

/// Per-connection mutable state (spec §4.G "Session holds
/// `{authenticated, currentDatabase, transactionBuffer}`").
#[derive(Default)]
pub struct Session {
    pub authenticated: bool,
    pub current_database: Option<String>,
    pub tx: TransactionBuffer,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }
}

/// One open `<name>.sawit` file plus its catalog and (optional) WAL.
/// Owned exclusively by whichever worker opened it (spec §5 "Shared
/// resources").
pub struct Database {
    pager: Pager,
    catalog: Catalog,
    wal: Option<Arc<Mutex<Wal>>>,
    checkpoint_interval: u32,
    commits_since_checkpoint: u32,
}

impl Database {
    /// Open `path`, replaying its WAL sidecar first if one is enabled
    /// (spec §4.B "recovery replays every committed write, then the WAL
    /// is truncated").
    pub fn open(path: impl AsRef<Path>, buffer_pool_pages: usize, wal_config: &WalConfig) -> DbResult<Self> {
        let path = path.as_ref();
        let mut pager = Pager::open(path, buffer_pool_pages)?;

        let wal = if wal_config.enabled {
            let wal_path = wal_sidecar_path(path);
            let (writes, last_lsn) = Wal::recover(&wal_path)?;
            if let Some(max_page) = writes.iter().map(|(p, _)| p.0).max() {
                while pager.page_count() <= max_page {
                    pager.alloc_page()?;
                }
            }
            for (page, bytes) in writes {
                let mut image = [0u8; storage::PAGE_SIZE];
                image.copy_from_slice(&bytes);
                pager.write_page(page, image)?;
            }
            pager.flush()?;

            let mut w = Wal::open(&wal_path)?;
            w.resume_from(last_lsn);
            w.checkpoint()?;
            let w = Arc::new(Mutex::new(w));
            pager.attach_wal(Box::new(WalAdapter(w.clone())));
            Some(w)
        } else {
            None
        };

        let catalog = Catalog::open(&mut pager)?;
        Ok(Self {
            pager,
            catalog,
            wal,
            checkpoint_interval: wal_config.checkpoint_interval.max(1),
            commits_since_checkpoint: 0,
        })
    }

    /// Execute one parsed statement for `session` (spec §4.E, §4.F).
    /// Mutating statements are redirected into the session's transaction
    /// buffer while a transaction is active, rather than applied.
    pub fn execute(&mut self, session: &mut Session, command: Command) -> DbResult<QueryResult> {
        if session.tx.is_active() && is_bufferable(&command) {
            session.tx.buffer(command)?;
            return Ok(QueryResult::Message("OK".to_string()));
        }
        self.execute_statement(session, command)
    }

    fn execute_statement(&mut self, session: &mut Session, command: Command) -> DbResult<QueryResult> {
        match command {
            Command::Select(stmt) => Ok(QueryResult::Rows(executor::select(&mut self.pager, &self.catalog, &stmt)?)),
            Command::Aggregate(stmt) => {
                Ok(QueryResult::Rows(executor::aggregate(&mut self.pager, &self.catalog, &stmt)?))
            }
            Command::Insert { table, columns, values } => self.do_insert(&table, &columns, &values),
            Command::Update { table, assignments, criteria } => self.do_update(&table, &assignments, criteria.as_ref()),
            Command::Delete { table, criteria } => self.do_delete(&table, criteria.as_ref()),
            Command::Explain { analyze, inner } => self.explain(session, analyze, *inner),

            Command::Begin => {
                session.tx.begin()?;
                Ok(QueryResult::Message("transaction started".to_string()))
            }
            Command::Commit => self.commit(session),
            Command::Rollback => {
                session.tx.rollback();
                Ok(QueryResult::Message("transaction rolled back".to_string()))
            }

            Command::CreateTable { name, .. } => {
                reject_system_table(&name)?;
                self.catalog.tables.create_table(&mut self.pager, &name)?;
                self.commit_wal()?;
                Ok(QueryResult::Message(format!("table '{name}' created")))
            }
            Command::DropTable { name } => {
                reject_system_table(&name)?;
                self.catalog.tables.drop_table(&mut self.pager, &name)?;
                self.catalog.indexes.drop_table_indexes(&mut self.pager, &name)?;
                self.commit_wal()?;
                Ok(QueryResult::Message(format!("table '{name}' dropped")))
            }
            Command::ShowTables => Ok(QueryResult::Rows(
                self.catalog.tables.user_tables().map(|e| row_of([("name", Value::Text(e.name.clone()))])).collect(),
            )),
            Command::ShowIndexes => Ok(QueryResult::Rows(
                self.catalog
                    .indexes
                    .list()
                    .map(|(table, field)| {
                        row_of([("table", Value::Text(table.to_string())), ("field", Value::Text(field.to_string()))])
                    })
                    .collect(),
            )),
            Command::ShowStats => Ok(QueryResult::Rows(vec![row_of([
                ("pages", Value::Number(self.pager.page_count() as f64)),
                ("tables", Value::Number(self.catalog.tables.names().count() as f64)),
            ])])),
            Command::CreateIndex { table, field } => {
                self.catalog.indexes.create(&mut self.pager, &mut self.catalog.tables, &table, &field)?;
                self.commit_wal()?;
                Ok(QueryResult::Message(format!("index on {table}({field}) created")))
            }

            Command::CreateView { name, select } => {
                let select_text = render::render_select(&select);
                self.catalog.views.create(&mut self.pager, &mut self.catalog.tables, &name, select_text)?;
                self.commit_wal()?;
                Ok(QueryResult::Message(format!("view '{name}' created")))
            }
            Command::DropView { name } => {
                self.catalog.views.drop_view(&mut self.pager, &name)?;
                self.commit_wal()?;
                Ok(QueryResult::Message(format!("view '{name}' dropped")))
            }

            Command::DefineSchema { table, columns } => {
                let columns = columns
                    .into_iter()
                    .map(|c| catalog::SchemaColumn { name: c.name, ty: c.ty, required: c.required, default: c.default })
                    .collect();
                self.catalog.schemas.define(&mut self.pager, &mut self.catalog.tables, &table, columns)?;
                self.commit_wal()?;
                Ok(QueryResult::Message(format!("schema for '{table}' defined")))
            }

            Command::CreateTrigger { name, table, timing, event, action } => {
                let def = catalog::TriggerDef {
                    name: name.clone(),
                    table,
                    timing: triggers::timing(timing),
                    event: triggers::event(event),
                    action,
                };
                self.catalog.triggers.create(&mut self.pager, &mut self.catalog.tables, def)?;
                self.commit_wal()?;
                Ok(QueryResult::Message(format!("trigger '{name}' created")))
            }
            Command::DropTrigger { name } => {
                self.catalog.triggers.drop_trigger(&mut self.pager, &name)?;
                self.commit_wal()?;
                Ok(QueryResult::Message(format!("trigger '{name}' dropped")))
            }

            Command::CreateProcedure { name, body } => {
                self.catalog.procedures.create(&mut self.pager, &mut self.catalog.tables, &name, body)?;
                self.commit_wal()?;
                Ok(QueryResult::Message(format!("procedure '{name}' created")))
            }
            Command::ExecuteProcedure { name } => {
                self.catalog.procedures.execute(&name)?;
                Ok(QueryResult::Message("OK".to_string()))
            }

            Command::Backup { path } => {
                self.pager.flush()?;
                fs::copy(self.pager.path(), &path)?;
                Ok(QueryResult::Message(format!("backed up to '{path}'")))
            }
            Command::Restore { .. } => {
                Err(DbError::ConstraintViolation("RESTORE is not supported while a database is open".to_string()))
            }

            Command::CreateDatabase { .. }
            | Command::UseDatabase { .. }
            | Command::ShowDatabases
            | Command::DropDatabase { .. } => {
                Err(DbError::ProtocolError("server-level statement issued against an open database".to_string()))
            }

            Command::Error(message) => Err(DbError::ParseError(message)),
            Command::Empty => Ok(QueryResult::Message(String::new())),
        }
    }

    fn do_insert(&mut self, table: &str, columns: &[String], values: &[parser::Literal]) -> DbResult<QueryResult> {
        let raw = parser::zip_row(columns, values);
        let row = self.catalog.schemas.coerce_row(table, &raw)?;
        triggers::fire(&self.catalog, table, catalog::TriggerTiming::Before, catalog::TriggerEvent::Insert);
        executor::dml::insert(&mut self.pager, &mut self.catalog, table, row)?;
        triggers::fire(&self.catalog, table, catalog::TriggerTiming::After, catalog::TriggerEvent::Insert);
        self.commit_wal()?;
        Ok(QueryResult::Message("1 row inserted".to_string()))
    }

    fn do_update(
        &mut self,
        table: &str,
        assignments: &[(String, parser::Literal)],
        criteria: Option<&parser::Criteria>,
    ) -> DbResult<QueryResult> {
        triggers::fire(&self.catalog, table, catalog::TriggerTiming::Before, catalog::TriggerEvent::Update);
        let touched = executor::dml::update(&mut self.pager, &mut self.catalog, table, criteria, |row| {
            let mut next = row.clone();
            for (field, literal) in assignments {
                next.insert(field.clone(), literal.resolve());
            }
            next
        })?;
        triggers::fire(&self.catalog, table, catalog::TriggerTiming::After, catalog::TriggerEvent::Update);
        self.commit_wal()?;
        Ok(QueryResult::Message(format!("{} row(s) updated", touched.len())))
    }

    fn do_delete(&mut self, table: &str, criteria: Option<&parser::Criteria>) -> DbResult<QueryResult> {
        triggers::fire(&self.catalog, table, catalog::TriggerTiming::Before, catalog::TriggerEvent::Delete);
        let rows = executor::dml::delete(&mut self.pager, &mut self.catalog, table, criteria)?;
        triggers::fire(&self.catalog, table, catalog::TriggerTiming::After, catalog::TriggerEvent::Delete);
        self.commit_wal()?;
        Ok(QueryResult::Message(format!("{} row(s) deleted", rows.len())))
    }

    /// `COMMIT`: replay the session's buffered mutations in order. A
    /// failure partway through aborts replay and returns the error; the
    /// buffer is already drained by this point, so there is nothing left
    /// to roll back at the transaction-buffer level (spec §4.F — see
    /// `txbuffer`'s doc comment on this simplification).
    fn commit(&mut self, session: &mut Session) -> DbResult<QueryResult> {
        let ops = session.tx.take_for_commit()?;
        let count = ops.len();
        for op in ops {
            self.execute_statement(session, op.command)?;
        }
        Ok(QueryResult::Message(format!("transaction committed ({count} statement(s))")))
    }

    fn explain(&mut self, session: &mut Session, analyze: bool, inner: Command) -> DbResult<QueryResult> {
        let plan = executor::explain::describe(&self.catalog, &inner);
        if !analyze {
            return Ok(QueryResult::Plan(plan));
        }
        let start = Instant::now();
        let rows_produced = match &inner {
            Command::Select(stmt) => executor::select(&mut self.pager, &self.catalog, stmt)?.len() as u64,
            Command::Aggregate(stmt) => executor::aggregate(&mut self.pager, &self.catalog, stmt)?.len() as u64,
            _ => {
                self.execute_statement(session, inner)?;
                0
            }
        };
        Ok(QueryResult::PlanAnalyzed { plan, rows_produced, execution_time: start.elapsed() })
    }

    /// Write a commit marker for every write logged by the statement
    /// just applied (spec invariant #5: "a commit marker is written
    /// before the statement returns success"), then checkpoint the WAL
    /// every `checkpoint_interval` commits (spec §4.B "After successful
    /// replay, the WAL is truncated").
    fn commit_wal(&mut self) -> DbResult<()> {
        let Some(wal) = self.wal.clone() else { return Ok(()) };
        {
            let mut w = wal.lock().expect("wal mutex poisoned");
            let lsn = w.last_lsn();
            w.append_commit(lsn)?;
            w.flush()?;
        }
        self.commits_since_checkpoint += 1;
        if self.commits_since_checkpoint >= self.checkpoint_interval {
            self.checkpoint()?;
        }
        Ok(())
    }

    fn checkpoint(&mut self) -> DbResult<()> {
        self.pager.flush()?;
        if let Some(wal) = &self.wal {
            wal.lock().expect("wal mutex poisoned").checkpoint()?;
        }
        self.commits_since_checkpoint = 0;
        Ok(())
    }
}

/// Mutating statements redirected into the session's transaction buffer
/// while a transaction is active (spec §4.F: "a session's writes inside
/// an active transaction are redirected here instead of being applied").
fn is_bufferable(command: &Command) -> bool {
    matches!(command, Command::Insert { .. } | Command::Update { .. } | Command::Delete { .. })
}

/// Reject a user `CREATE TABLE`/`DROP TABLE` naming a reserved
/// `_`-prefixed table (spec invariant 6). System tables are still
/// materialized and dropped through `catalog::TableManager`'s
/// lazily-created path internally; this guard only gates the statements
/// a client can issue directly.
fn reject_system_table(name: &str) -> DbResult<()> {
    if catalog::is_system_table(name) {
        Err(DbError::ConstraintViolation(format!("'{name}' is a reserved system table name")))
    } else {
        Ok(())
    }
}

fn wal_sidecar_path(main_path: &Path) -> PathBuf {
    main_path.with_extension("wal")
}

/// Database-directory operations used by the server before a connection
/// has chosen a database (spec §6 "Server-level statements").
pub fn database_path(data_dir: &Path, name: &str) -> PathBuf {
    data_dir.join(format!("{name}.sawit"))
}

/// Reject anything but `^[A-Za-z0-9_-]+$` (spec §4.H "path traversal
/// prevention").
pub fn validate_database_name(name: &str) -> DbResult<()> {
    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(DbError::ConstraintViolation(format!("invalid database name '{name}'")))
    }
}

/// List every `<name>.sawit` file directly inside `data_dir`.
pub fn list_databases(data_dir: &Path) -> DbResult<Vec<String>> {
    if !data_dir.exists() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(data_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("sawit") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Create an empty `<name>.sawit` file (spec §6 "creating an empty
/// database file"). Opening and closing a fresh [`Pager`] is enough to
/// format page 0.
pub fn create_database(data_dir: &Path, name: &str, buffer_pool_pages: usize) -> DbResult<()> {
    validate_database_name(name)?;
    fs::create_dir_all(data_dir)?;
    let path = database_path(data_dir, name);
    if path.exists() {
        return Err(DbError::AlreadyExists(format!("database '{name}'")));
    }
    Pager::open(&path, buffer_pool_pages)?.close()
}

/// Remove `<name>.sawit` and its WAL sidecar, if present.
pub fn drop_database(data_dir: &Path, name: &str) -> DbResult<()> {
    validate_database_name(name)?;
    let path = database_path(data_dir, name);
    if !path.exists() {
        return Err(DbError::NotFound(format!("database '{name}'")));
    }
    fs::remove_file(&path)?;
    let wal_path = wal_sidecar_path(&path);
    if wal_path.exists() {
        fs::remove_file(&wal_path)?;
    }
    Ok(())
}
