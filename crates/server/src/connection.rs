//! Per-connection request loop (spec §4.H wire protocol, §5 "Ordering
//! guarantees": within one connection responses are emitted in the same
//! order as requests, because nothing here is ever pipelined — the next
//! request isn't read until the current one has been answered).

use crate::pool::WorkerPool;
use crate::stats::Stats;
use crate::{auth, render};
use common::{Config, DbError, DbResult, row_of};
use database::QueryResult;
use parser::Command;
use protocol::{Request, Response, read_request, write_response};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::BufReader;
use tokio::net::TcpStream;
use types::Value;

/// Per-connection mutable state owned by the front-end (distinct from
/// [`database::Session`], which lives on whichever worker owns the
/// current database and holds the transaction buffer).
struct ConnSession {
    authenticated: bool,
    current_database: Option<(String, PathBuf)>,
}

pub async fn handle(stream: TcpStream, conn_id: u64, config: Arc<Config>, pool: Arc<WorkerPool>, stats: Arc<Stats>) {
    let peer: Option<SocketAddr> = stream.peer_addr().ok();
    stats.connection_opened();

    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut session = ConnSession { authenticated: config.auth.is_empty(), current_database: None };

    let welcome = Response::Welcome { server: "sawitdb".to_string(), version: env!("CARGO_PKG_VERSION").to_string() };
    if write_response(&mut write_half, &welcome).await.is_err() {
        stats.connection_closed();
        return;
    }

    let idle_timeout = config.query_timeout();
    loop {
        let request = match tokio::time::timeout(idle_timeout, read_request(&mut reader)).await {
            Ok(Ok(Some(request))) => request,
            Ok(Ok(None)) => break,
            Ok(Err(e)) => {
                tracing::warn!(?peer, error = %e, "protocol error, closing connection");
                let _ = write_response(&mut write_half, &Response::error(e.wire_message())).await;
                break;
            }
            Err(_) => {
                tracing::debug!(?peer, "connection idle past the query timeout, closing");
                break;
            }
        };

        let response = dispatch(conn_id, request, &mut session, &config, &pool, &stats).await;
        if write_response(&mut write_half, &response).await.is_err() {
            break;
        }
    }

    if let Some((_, path)) = &session.current_database {
        pool.close_connection(conn_id, path);
    }
    stats.connection_closed();
}

async fn dispatch(
    conn_id: u64,
    request: Request,
    session: &mut ConnSession,
    config: &Config,
    pool: &WorkerPool,
    stats: &Stats,
) -> Response {
    let auth_required = !config.auth.is_empty();
    if auth_required && !session.authenticated && !matches!(request, Request::Auth { .. }) {
        return Response::error("Authentication required");
    }

    match request {
        Request::Auth { username, password } => handle_auth(session, config, &username, &password),
        Request::Use { database } => match select_database(conn_id, session, config, pool, &database).await {
            Ok(()) => Response::UseSuccess { database },
            Err(e) => Response::from_db_error(&e),
        },
        Request::Query { query, params } => handle_query(conn_id, session, config, pool, stats, query, params).await,
        Request::Ping => Response::Pong { timestamp: chrono::Utc::now().to_rfc3339() },
        Request::ListDatabases => match database::list_databases(&config.data_dir) {
            Ok(databases) => Response::DatabaseList { databases },
            Err(e) => Response::from_db_error(&e),
        },
        Request::DropDatabase { database } => match drop_database(session, config, pool, &database).await {
            Ok(()) => Response::DropSuccess { database },
            Err(e) => Response::from_db_error(&e),
        },
        Request::Stats => Response::Stats {
            connections: stats.active_connections(),
            queries_served: stats.queries_served_total(),
            uptime_seconds: stats.uptime_seconds(),
        },
    }
}

fn handle_auth(session: &mut ConnSession, config: &Config, username: &str, password: &str) -> Response {
    if config.auth.is_empty() {
        session.authenticated = true;
        return Response::AuthSuccess;
    }
    match config.auth.get(username) {
        Some(stored) if auth::verify_password(stored, password) => {
            session.authenticated = true;
            Response::AuthSuccess
        }
        _ => Response::from_db_error(&DbError::AuthError("invalid username or password".to_string())),
    }
}

async fn handle_query(
    conn_id: u64,
    session: &mut ConnSession,
    config: &Config,
    pool: &WorkerPool,
    stats: &Stats,
    query: String,
    params: Option<BTreeMap<String, Value>>,
) -> Response {
    let command = match &params {
        Some(bindings) => parser::parse_with_params(&query, bindings),
        None => parser::parse(&query),
    };

    let start = Instant::now();
    let outcome = run_command(conn_id, session, config, pool, command).await;
    let deadline_hit = matches!(outcome, Err(DbError::Timeout));
    stats.query_served();

    match outcome {
        Ok(result) => Response::QueryResult {
            result: render::to_json(&result),
            query,
            execution_time_ms: start.elapsed().as_millis() as u64,
        },
        Err(e) => {
            if deadline_hit {
                tracing::warn!(query = %query, "query exceeded its deadline; result discarded");
            }
            Response::from_db_error(&e)
        }
    }
}

async fn run_command(
    conn_id: u64,
    session: &mut ConnSession,
    config: &Config,
    pool: &WorkerPool,
    command: Command,
) -> DbResult<QueryResult> {
    if let Command::Error(message) = command {
        return Err(DbError::ParseError(message));
    }
    if is_server_level(&command) {
        return run_admin_command(conn_id, session, config, pool, command).await;
    }
    let Some((_, path)) = &session.current_database else {
        return Err(DbError::ProtocolError("no database selected".to_string()));
    };
    let path = path.clone();
    match tokio::time::timeout(config.query_timeout(), pool.dispatch(conn_id, &path, command)).await {
        Ok(result) => result,
        Err(_) => Err(DbError::Timeout),
    }
}

fn is_server_level(command: &Command) -> bool {
    matches!(
        command,
        Command::CreateDatabase { .. } | Command::UseDatabase { .. } | Command::ShowDatabases | Command::DropDatabase { .. }
    )
}

/// Handle the four database-administration statements (spec §6
/// "Server-level statements"), reachable either as a plain SQL string
/// through `query` or (for `USE`/`DROP DATABASE`) through their own
/// dedicated request types.
async fn run_admin_command(
    conn_id: u64,
    session: &mut ConnSession,
    config: &Config,
    pool: &WorkerPool,
    command: Command,
) -> DbResult<QueryResult> {
    match command {
        Command::CreateDatabase { name } => {
            database::create_database(&config.data_dir, &name, config.buffer_pool_pages)?;
            Ok(QueryResult::Message(format!("database '{name}' created")))
        }
        Command::UseDatabase { name } => {
            select_database(conn_id, session, config, pool, &name).await?;
            Ok(QueryResult::Message(format!("using database '{name}'")))
        }
        Command::ShowDatabases => {
            let names = database::list_databases(&config.data_dir)?;
            Ok(QueryResult::Rows(names.into_iter().map(|name| row_of([("name", Value::Text(name))])).collect()))
        }
        Command::DropDatabase { name } => {
            drop_database(session, config, pool, &name).await?;
            Ok(QueryResult::Message(format!("database '{name}' dropped")))
        }
        _ => unreachable!("is_server_level gates this to the four database-admin commands"),
    }
}

async fn select_database(
    conn_id: u64,
    session: &mut ConnSession,
    config: &Config,
    pool: &WorkerPool,
    name: &str,
) -> DbResult<()> {
    database::validate_database_name(name)?;
    let path = database::database_path(&config.data_dir, name);
    if !path.exists() {
        return Err(DbError::NotFound(format!("database '{name}'")));
    }
    if let Some((_, old_path)) = &session.current_database {
        if old_path != &path {
            pool.close_connection(conn_id, old_path);
        }
    }
    session.current_database = Some((name.to_string(), path));
    Ok(())
}

async fn drop_database(session: &mut ConnSession, config: &Config, pool: &WorkerPool, name: &str) -> DbResult<()> {
    database::validate_database_name(name)?;
    let path = database::database_path(&config.data_dir, name);
    pool.evict_database(&path).await;
    database::drop_database(&config.data_dir, name)?;
    if matches!(&session.current_database, Some((_, current)) if current == &path) {
        session.current_database = None;
    }
    Ok(())
}
