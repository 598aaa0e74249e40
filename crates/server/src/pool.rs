//! Worker pool: one OS thread per worker, each owning a private set of
//! open [`Database`] handles, dispatched to over a
//! [`crossbeam_channel`] (spec §4.H "Worker pool", §5 "Scheduling
//! model").
//!
//! A database file is owned by at most one worker at a time. Routing is
//! **sticky**: once a path has been assigned to a worker, every later
//! request for that path goes to the same worker for as long as it
//! stays open, regardless of load. A path with no current owner goes to
//! whichever worker has the fewest in-flight jobs, ties broken by the
//! lowest worker id (spec §4.H "Resource model for databases").
//!
//! The pool itself is async-callable (the network front-end never
//! blocks on storage I/O): [`WorkerPool::dispatch`] hands a job to the
//! worker's channel and awaits a oneshot reply, while the worker thread
//! runs the statement to completion synchronously.

use common::{DbError, DbResult, WalConfig};
use crossbeam_channel::{Receiver, SendError, Sender};
use database::{Database, QueryResult, Session};
use parser::Command;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};
use tokio::sync::oneshot;

enum JobKind {
    Execute { command: Command, buffer_pool_pages: usize, wal_config: WalConfig },
    /// The connection closed or switched databases; drop its session
    /// state (in particular any still-open transaction buffer) so it
    /// doesn't linger in the worker forever.
    CloseConnection,
    /// `DROP DATABASE` on a path this pool currently owns: evict it so a
    /// later `CREATE DATABASE` of the same name starts clean.
    CloseDatabase,
}

struct WorkerJob {
    conn_id: u64,
    db_path: PathBuf,
    kind: JobKind,
    reply: Option<oneshot::Sender<DbResult<QueryResult>>>,
}

struct OpenDatabase {
    database: Database,
    sessions: HashMap<u64, Session>,
}

pub struct WorkerPool {
    senders: Vec<RwLock<Sender<WorkerJob>>>,
    active_counts: Vec<AtomicUsize>,
    path_owner: Mutex<HashMap<PathBuf, usize>>,
    buffer_pool_pages: usize,
    wal_config: WalConfig,
}

impl WorkerPool {
    pub fn new(worker_count: usize, buffer_pool_pages: usize, wal_config: WalConfig) -> Self {
        let worker_count = worker_count.max(1);
        let mut senders = Vec::with_capacity(worker_count);
        let mut active_counts = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            senders.push(RwLock::new(spawn_worker(id)));
            active_counts.push(AtomicUsize::new(0));
        }
        Self {
            senders,
            active_counts,
            path_owner: Mutex::new(HashMap::new()),
            buffer_pool_pages,
            wal_config,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.senders.len()
    }

    /// Run `command` against the database at `db_path` on behalf of
    /// connection `conn_id`, routing per the sticky/least-busy policy.
    pub async fn dispatch(&self, conn_id: u64, db_path: &Path, command: Command) -> DbResult<QueryResult> {
        let worker = self.choose_worker(db_path);
        self.active_counts[worker].fetch_add(1, Ordering::Relaxed);
        let (reply_tx, reply_rx) = oneshot::channel();
        let job = WorkerJob {
            conn_id,
            db_path: db_path.to_path_buf(),
            kind: JobKind::Execute {
                command,
                buffer_pool_pages: self.buffer_pool_pages,
                wal_config: self.wal_config.clone(),
            },
            reply: Some(reply_tx),
        };
        let result = match self.send_job(worker, job) {
            Ok(()) => reply_rx.await.unwrap_or_else(|_| {
                Err(DbError::WorkerCrashed(format!("worker {worker} crashed mid-statement")))
            }),
            Err(e) => Err(e),
        };
        self.active_counts[worker].fetch_sub(1, Ordering::Relaxed);
        result
    }

    /// Notify the worker that owns `db_path` (if any) that `conn_id`
    /// disconnected, so its per-connection session state is dropped.
    /// Fire-and-forget: a crashed/closed worker has already lost that
    /// state, so there is nothing to clean up.
    pub fn close_connection(&self, conn_id: u64, db_path: &Path) {
        let worker = self.path_owner.lock().expect("path_owner mutex poisoned").get(db_path).copied();
        if let Some(worker) = worker {
            let job = WorkerJob { conn_id, db_path: db_path.to_path_buf(), kind: JobKind::CloseConnection, reply: None };
            let _ = self.send_job(worker, job);
        }
    }

    /// Evict `db_path` from whichever worker owns it, so the next
    /// `USE`/`CREATE DATABASE` of that path is assigned fresh (spec §6
    /// `drop_database` request).
    pub async fn evict_database(&self, db_path: &Path) {
        let worker = self.path_owner.lock().expect("path_owner mutex poisoned").remove(db_path);
        let Some(worker) = worker else { return };
        let (reply_tx, reply_rx) = oneshot::channel();
        let job = WorkerJob { conn_id: 0, db_path: db_path.to_path_buf(), kind: JobKind::CloseDatabase, reply: Some(reply_tx) };
        if self.send_job(worker, job).is_ok() {
            let _ = reply_rx.await;
        }
    }

    fn choose_worker(&self, path: &Path) -> usize {
        let mut owners = self.path_owner.lock().expect("path_owner mutex poisoned");
        if let Some(&worker) = owners.get(path) {
            return worker;
        }
        let worker = self
            .active_counts
            .iter()
            .enumerate()
            .min_by_key(|(_, count)| count.load(Ordering::Relaxed))
            .map(|(id, _)| id)
            .unwrap_or(0);
        owners.insert(path.to_path_buf(), worker);
        worker
    }

    /// Send `job` to `worker`, respawning its thread once if the channel
    /// has been closed by a panicked worker (spec §4.H "On worker crash
    /// ... the worker is respawned").
    fn send_job(&self, worker: usize, job: WorkerJob) -> DbResult<()> {
        let sender = self.senders[worker].read().expect("worker sender lock poisoned").clone();
        match sender.send(job) {
            Ok(()) => Ok(()),
            Err(SendError(job)) => {
                tracing::warn!(worker, "worker channel closed, respawning");
                *self.senders[worker].write().expect("worker sender lock poisoned") = spawn_worker(worker);
                let sender = self.senders[worker].read().expect("worker sender lock poisoned").clone();
                sender.send(job).map_err(|_| DbError::WorkerCrashed(format!("worker {worker} crashed")))
            }
        }
    }
}

fn spawn_worker(id: usize) -> Sender<WorkerJob> {
    let (tx, rx) = crossbeam_channel::unbounded();
    std::thread::Builder::new()
        .name(format!("sawit-worker-{id}"))
        .spawn(move || worker_loop(id, rx))
        .expect("spawn worker thread");
    tx
}

/// Body of one worker thread: single-threaded, synchronous statement
/// processing over whichever databases this worker currently owns (spec
/// §5 "within each worker, statement handling is single-threaded").
fn worker_loop(id: usize, jobs: Receiver<WorkerJob>) {
    let mut open: HashMap<PathBuf, OpenDatabase> = HashMap::new();
    for job in jobs.iter() {
        let WorkerJob { conn_id, db_path, kind, reply } = job;
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            run_job(&mut open, conn_id, &db_path, kind)
        }));
        let result = outcome.unwrap_or_else(|_| {
            tracing::error!(worker = id, path = %db_path.display(), "worker job panicked; dropping cached state");
            open.remove(&db_path);
            Err(DbError::WorkerCrashed(format!("worker {id} panicked while handling the statement")))
        });
        if let Some(reply) = reply {
            let _ = reply.send(result);
        }
    }
}

fn run_job(open: &mut HashMap<PathBuf, OpenDatabase>, conn_id: u64, db_path: &Path, kind: JobKind) -> DbResult<QueryResult> {
    match kind {
        JobKind::Execute { command, buffer_pool_pages, wal_config } => {
            let entry = match open.entry(db_path.to_path_buf()) {
                Entry::Occupied(e) => e.into_mut(),
                Entry::Vacant(e) => {
                    let database = Database::open(db_path, buffer_pool_pages, &wal_config)?;
                    e.insert(OpenDatabase { database, sessions: HashMap::new() })
                }
            };
            let session = entry.sessions.entry(conn_id).or_default();
            entry.database.execute(session, command)
        }
        JobKind::CloseConnection => {
            if let Some(entry) = open.get_mut(db_path) {
                entry.sessions.remove(&conn_id);
            }
            Ok(QueryResult::Message(String::new()))
        }
        JobKind::CloseDatabase => {
            open.remove(db_path);
            Ok(QueryResult::Message(String::new()))
        }
    }
}
