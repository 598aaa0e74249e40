//! End-to-end tests driving the real wire protocol over a loopback TCP
//! socket against an in-process server (spec §8 concrete scenarios).

use common::Config;
use protocol::{Request, Response, read_response, write_request};
use serde_json::Value as Json;
use server::ServerHandle;
use std::collections::BTreeMap;
use tempfile::TempDir;
use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    async fn connect(addr: std::net::SocketAddr) -> (Self, Response) {
        let stream = TcpStream::connect(addr).await.expect("connect");
        let (read_half, writer) = stream.into_split();
        let mut client = Self { reader: BufReader::new(read_half), writer };
        let welcome = client.recv().await;
        (client, welcome)
    }

    async fn send(&mut self, request: Request) -> Response {
        write_request(&mut self.writer, &request).await.expect("write request");
        self.recv().await
    }

    async fn recv(&mut self) -> Response {
        read_response(&mut self.reader).await.expect("read response").expect("connection open")
    }

    async fn query(&mut self, sql: &str) -> Response {
        self.send(Request::Query { query: sql.to_string(), params: None }).await
    }
}

async fn start_server() -> (ServerHandle, TempDir) {
    let dir = TempDir::new().expect("tempdir");
    let config = Config { data_dir: dir.path().to_path_buf(), port: 0, worker_count: Some(2), ..Config::default() };
    let handle = server::spawn(config).await.expect("spawn server");
    (handle, dir)
}

fn rows(response: &Response) -> Vec<Json> {
    match response {
        Response::QueryResult { result, .. } => result.as_array().cloned().unwrap_or_default(),
        other => panic!("expected query_result, got {other:?}"),
    }
}

#[tokio::test]
async fn s1_insert_select_round_trip() {
    let (server, _dir) = start_server().await;
    let (mut client, welcome) = TestClient::connect(server.addr).await;
    assert!(matches!(welcome, Response::Welcome { .. }));

    let created = client.send(Request::Query { query: "CREATE DATABASE shop".to_string(), params: None }).await;
    assert!(matches!(created, Response::QueryResult { .. }));
    let used = client.send(Request::Use { database: "shop".to_string() }).await;
    assert!(matches!(used, Response::UseSuccess { .. }));

    client.query("CREATE TABLE t (id, name)").await;
    client.query("INSERT INTO t (id, name) VALUES (1, 'A')").await;
    let selected = client.query("SELECT * FROM t WHERE id = 1").await;

    let got = rows(&selected);
    assert_eq!(got.len(), 1);
    assert_eq!(got[0]["id"].as_f64(), Some(1.0));
    assert_eq!(got[0]["name"].as_str(), Some("A"));
}

#[tokio::test]
async fn s3_transaction_rollback_preserves_prior_rows() {
    let (server, _dir) = start_server().await;
    let (mut client, _welcome) = TestClient::connect(server.addr).await;
    client.send(Request::Query { query: "CREATE DATABASE t3".to_string(), params: None }).await;
    client.send(Request::Use { database: "t3".to_string() }).await;

    client.query("CREATE TABLE t (id)").await;
    client.query("INSERT INTO t (id) VALUES (1)").await;
    client.query("INSERT INTO t (id) VALUES (2)").await;
    client.query("INSERT INTO t (id) VALUES (3)").await;

    client.query("BEGIN").await;
    client.query("DELETE FROM t WHERE id = 2").await;
    client.query("ROLLBACK").await;

    let result = client.query("SELECT * FROM t").await;
    assert_eq!(rows(&result).len(), 3);
}

#[tokio::test]
async fn authentication_is_required_when_configured() {
    let dir = TempDir::new().expect("tempdir");
    let mut auth = BTreeMap::new();
    auth.insert("alice".to_string(), server::auth::hash_password("hunter2"));
    let config = Config { data_dir: dir.path().to_path_buf(), port: 0, worker_count: Some(1), auth, ..Config::default() };
    let server = server::spawn(config).await.expect("spawn server");
    let (mut client, _welcome) = TestClient::connect(server.addr).await;

    let denied = client.query("SHOW DATABASES").await;
    assert!(matches!(denied, Response::Error { .. }));

    let bad_auth =
        client.send(Request::Auth { username: "alice".to_string(), password: "wrong".to_string() }).await;
    assert!(matches!(bad_auth, Response::Error { .. }));

    let good_auth =
        client.send(Request::Auth { username: "alice".to_string(), password: "hunter2".to_string() }).await;
    assert!(matches!(good_auth, Response::AuthSuccess));

    let allowed = client.query("SHOW DATABASES").await;
    assert!(matches!(allowed, Response::QueryResult { .. }));
}

#[tokio::test]
async fn ping_and_stats_respond() {
    let (server, _dir) = start_server().await;
    let (mut client, _welcome) = TestClient::connect(server.addr).await;

    match client.send(Request::Ping).await {
        Response::Pong { .. } => {}
        other => panic!("expected pong, got {other:?}"),
    }

    match client.send(Request::Stats).await {
        Response::Stats { connections, .. } => assert!(connections >= 1),
        other => panic!("expected stats, got {other:?}"),
    }
}

#[tokio::test]
async fn server_level_database_lifecycle() {
    let (server, _dir) = start_server().await;
    let (mut client, _welcome) = TestClient::connect(server.addr).await;

    client.send(Request::Query { query: "CREATE DATABASE alpha".to_string(), params: None }).await;

    match client.send(Request::ListDatabases).await {
        Response::DatabaseList { databases } => assert!(databases.contains(&"alpha".to_string())),
        other => panic!("expected database_list, got {other:?}"),
    }

    match client.send(Request::DropDatabase { database: "alpha".to_string() }).await {
        Response::DropSuccess { database } => assert_eq!(database, "alpha"),
        other => panic!("expected drop_success, got {other:?}"),
    }

    match client.send(Request::ListDatabases).await {
        Response::DatabaseList { databases } => assert!(!databases.contains(&"alpha".to_string())),
        other => panic!("expected database_list, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_database_is_rejected() {
    let (server, _dir) = start_server().await;
    let (mut client, _welcome) = TestClient::connect(server.addr).await;

    match client.send(Request::Use { database: "nope".to_string() }).await {
        Response::Error { .. } => {}
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn two_sticky_connections_see_each_others_writes() {
    let (server, _dir) = start_server().await;

    let (mut setup, _welcome) = TestClient::connect(server.addr).await;
    setup.send(Request::Query { query: "CREATE DATABASE events".to_string(), params: None }).await;
    setup.send(Request::Use { database: "events".to_string() }).await;
    setup.query("CREATE TABLE e (id)").await;

    let (mut a, _) = TestClient::connect(server.addr).await;
    a.send(Request::Use { database: "events".to_string() }).await;
    let (mut b, _) = TestClient::connect(server.addr).await;
    b.send(Request::Use { database: "events".to_string() }).await;

    for i in 0..5 {
        a.query(&format!("INSERT INTO e (id) VALUES ({i})")).await;
    }
    for i in 5..10 {
        b.query(&format!("INSERT INTO e (id) VALUES ({i})")).await;
    }

    let result = setup.query("SELECT * FROM e").await;
    assert_eq!(rows(&result).len(), 10);
}
