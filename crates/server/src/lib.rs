//! TCP front-end for a single-file relational database (spec §4.H, §6).
//!
//! The accept loop is single-threaded and non-blocking (spec §5 "The
//! network front-end is single-threaded and non-blocking: it
//! multiplexes many client sockets via an event loop and never blocks
//! on storage I/O"); actual statement execution happens on
//! [`pool::WorkerPool`]'s dedicated OS threads. [`spawn`] is the
//! reusable entry point: the binary's `main` calls it once and waits
//! for Ctrl-C; integration tests call it against an ephemeral port and
//! talk the wire protocol directly against the returned address.

pub mod auth;
pub mod config;
pub mod connection;
pub mod pool;
pub mod render;
pub mod stats;

use anyhow::Context;
use common::Config;
use pool::WorkerPool;
use stats::Stats;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::net::TcpListener;
use tokio::sync::{Semaphore, oneshot};
use tokio::task::JoinHandle;

/// A running server. Dropping this aborts the accept loop; call
/// [`ServerHandle::shutdown`] for a graceful stop that lets in-flight
/// connections finish their current request.
pub struct ServerHandle {
    pub addr: SocketAddr,
    join: JoinHandle<()>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl ServerHandle {
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = self.join.await;
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.join.abort();
    }
}

/// Bind `config.host:config.port` and start accepting connections in a
/// background task. Binding port `0` picks an OS-assigned ephemeral
/// port, reported back via [`ServerHandle::addr`] — the pattern
/// integration tests use to run many servers side by side.
pub async fn spawn(config: Config) -> anyhow::Result<ServerHandle> {
    let config = Arc::new(config);
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("creating data directory {}", config.data_dir.display()))?;

    let pool = Arc::new(WorkerPool::new(config.resolved_worker_count(), config.buffer_pool_pages, config.wal.clone()));
    let stats = Arc::new(Stats::new());
    let connection_limit = Arc::new(Semaphore::new(config.max_connections));

    let bind_addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&bind_addr).await.with_context(|| format!("binding {bind_addr}"))?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, workers = pool.worker_count(), data_dir = %config.data_dir.display(), "sawitdb server listening");

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let join = tokio::spawn(accept_loop(listener, config, pool, stats, connection_limit, shutdown_rx));

    Ok(ServerHandle { addr, join, shutdown: Some(shutdown_tx) })
}

async fn accept_loop(
    listener: TcpListener,
    config: Arc<Config>,
    pool: Arc<WorkerPool>,
    stats: Arc<Stats>,
    connection_limit: Arc<Semaphore>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let next_conn_id = AtomicU64::new(1);
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };
                let permit = match connection_limit.clone().try_acquire_owned() {
                    Ok(permit) => permit,
                    Err(_) => {
                        tracing::warn!(%peer, "connection limit reached, rejecting new connection");
                        drop(stream);
                        continue;
                    }
                };
                let conn_id = next_conn_id.fetch_add(1, Ordering::Relaxed);
                let config = config.clone();
                let pool = pool.clone();
                let stats = stats.clone();
                tokio::spawn(async move {
                    tracing::debug!(%peer, conn_id, "connection accepted");
                    connection::handle(stream, conn_id, config, pool, stats).await;
                    tracing::debug!(%peer, conn_id, "connection closed");
                    drop(permit);
                });
            }
            _ = &mut shutdown => {
                tracing::info!("accept loop stopping");
                break;
            }
        }
    }
}
