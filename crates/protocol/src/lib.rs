//! Wire protocol for the network front-end (spec §4.H, §6 "Wire
//! protocol"): newline-delimited JSON request/response objects over TCP.
//!
//! Requests are adjacently tagged (`{"type": "...", "payload": {...}}`)
//! so a connection handler can match on `type` before decoding the rest.
//! Responses are internally tagged because the spec's successful
//! responses carry their fields alongside `type` rather than nested
//! (`{type: "query_result", result, query, executionTime}`).

use common::{DbError, DbResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use types::Value;

/// Connections beyond this many bytes without a newline are killed (spec
/// §4.H "Incoming buffer beyond 1 MiB without a newline terminates the
/// connection").
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// One client request (spec §4.H protocol table).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Request {
    Auth { username: String, password: String },
    Use { database: String },
    Query {
        query: String,
        #[serde(default)]
        params: Option<BTreeMap<String, Value>>,
    },
    Ping,
    ListDatabases,
    DropDatabase { database: String },
    Stats,
}

/// One server response (spec §4.H, §6). `Error` is the universal failure
/// shape; every other variant answers exactly one request type.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Welcome { server: String, version: String },
    AuthSuccess,
    UseSuccess { database: String },
    QueryResult {
        result: serde_json::Value,
        query: String,
        #[serde(rename = "executionTime")]
        execution_time_ms: u64,
    },
    Pong { timestamp: String },
    DatabaseList { databases: Vec<String> },
    DropSuccess { database: String },
    Stats {
        connections: usize,
        queries_served: u64,
        uptime_seconds: u64,
    },
    Error { error: String },
}

impl Response {
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error { error: message.into() }
    }

    pub fn from_db_error(e: &DbError) -> Self {
        Response::error(e.wire_message())
    }
}

/// Read one newline-delimited JSON request, returning `Ok(None)` on a
/// clean EOF between messages (or a blank line). Enforces
/// [`MAX_LINE_BYTES`] on the raw line before attempting to parse it.
pub async fn read_request<R>(reader: &mut R) -> DbResult<Option<Request>>
where
    R: AsyncRead + Unpin,
{
    match read_line_capped(reader, MAX_LINE_BYTES).await? {
        None => Ok(None),
        Some(line) if line.trim().is_empty() => Ok(None),
        Some(line) => serde_json::from_str(&line)
            .map(Some)
            .map_err(|e| DbError::ProtocolError(format!("malformed request: {e}"))),
    }
}

/// Serialize `response` and write it as one newline-terminated JSON line.
pub async fn write_response<W>(writer: &mut W, response: &Response) -> DbResult<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(response)
        .map_err(|e| DbError::ProtocolError(format!("encode response: {e}")))?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}

/// Serialize `request` and write it as one newline-terminated JSON line
/// (the client side of the same framing [`write_response`] uses on the
/// server side — spec §4.H "each direction is a sequence of
/// newline-delimited JSON objects").
pub async fn write_request<W>(writer: &mut W, request: &Request) -> DbResult<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(request)
        .map_err(|e| DbError::ProtocolError(format!("encode request: {e}")))?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one newline-delimited JSON response, returning `Ok(None)` on a
/// clean EOF between messages (or a blank line). The client-side
/// counterpart to [`read_request`].
pub async fn read_response<R>(reader: &mut R) -> DbResult<Option<Response>>
where
    R: AsyncRead + Unpin,
{
    match read_line_capped(reader, MAX_LINE_BYTES).await? {
        None => Ok(None),
        Some(line) if line.trim().is_empty() => Ok(None),
        Some(line) => serde_json::from_str(&line)
            .map(Some)
            .map_err(|e| DbError::ProtocolError(format!("malformed response: {e}"))),
    }
}

/// Read one line (without its terminator), enforcing `limit` bytes. Reads
/// a byte at a time so the cap is checked continuously rather than after
/// an unbounded allocation; callers are expected to wrap the raw socket in
/// a `BufReader` so this doesn't turn into a syscall per byte.
async fn read_line_capped<R>(reader: &mut R, limit: usize) -> DbResult<Option<String>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        let n = reader.read(&mut byte).await?;
        if n == 0 {
            if buf.is_empty() {
                return Ok(None);
            }
            return Err(DbError::ProtocolError("connection closed mid-line".into()));
        }
        if byte[0] == b'\n' {
            break;
        }
        buf.push(byte[0]);
        if buf.len() > limit {
            return Err(DbError::ProtocolError(format!(
                "line exceeded {limit} bytes without a newline"
            )));
        }
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    String::from_utf8(buf)
        .map(Some)
        .map_err(|e| DbError::ProtocolError(format!("request is not valid utf-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn round_trips_auth_request() {
        let mut cursor = Cursor::new(
            b"{\"type\":\"auth\",\"payload\":{\"username\":\"alice\",\"password\":\"secret\"}}\n".to_vec(),
        );
        let req = read_request(&mut cursor).await.unwrap().unwrap();
        match req {
            Request::Auth { username, password } => {
                assert_eq!(username, "alice");
                assert_eq!(password, "secret");
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unit_variant_request_has_no_payload_field() {
        let json = serde_json::to_string(&Request::Ping).unwrap();
        assert_eq!(json, r#"{"type":"ping"}"#);
    }

    #[tokio::test]
    async fn query_result_response_is_flat() {
        let resp = Response::QueryResult {
            result: serde_json::json!([{"id": 1}]),
            query: "SELECT * FROM t".into(),
            execution_time_ms: 5,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["type"], "query_result");
        assert_eq!(json["executionTime"], 5);
        assert_eq!(json["query"], "SELECT * FROM t");
    }

    #[tokio::test]
    async fn oversized_line_is_rejected() {
        let mut data = vec![b'x'; MAX_LINE_BYTES + 10];
        data.push(b'\n');
        let mut cursor = Cursor::new(data);
        let err = read_request(&mut cursor).await.unwrap_err();
        assert!(matches!(err, DbError::ProtocolError(_)));
    }

    #[tokio::test]
    async fn eof_before_any_bytes_is_none() {
        let mut cursor = Cursor::new(Vec::new());
        assert!(read_request(&mut cursor).await.unwrap().is_none());
    }
}
