//! ZeroMQ REQ/REP client for the semantic-search service.
//!
//! Requests are two frames: an operation code, then a JSON payload. Replies
//! are a single JSON frame; anything else is malformed. The socket is
//! strictly sequential, so one mutex serialises all callers, and a timed-out
//! request surfaces as `Error::Timeout` rather than wedging the socket
//! (`REQ_RELAXED` + `REQ_CORRELATE`).

use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{json, Value};

use llmfs_domain::error::{Error, Result};

use crate::backend::SearchBackend;

const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A connection to the semantic-search service.
pub struct ZmqSearchClient {
    // Context must outlive the socket; kept alongside it.
    _context: zmq::Context,
    socket: Mutex<zmq::Socket>,
}

impl ZmqSearchClient {
    /// Connect to the backend at `endpoint` (e.g. `ipc://…` or `tcp://…`).
    pub fn connect(endpoint: &str) -> Result<Self> {
        let context = zmq::Context::new();
        let socket = context
            .socket(zmq::REQ)
            .map_err(|e| from_zmq("socket", e))?;

        let timeout_ms = REPLY_TIMEOUT.as_millis() as i32;
        socket
            .set_rcvtimeo(timeout_ms)
            .and_then(|_| socket.set_sndtimeo(timeout_ms))
            .and_then(|_| socket.set_linger(0))
            .and_then(|_| socket.set_req_relaxed(true))
            .and_then(|_| socket.set_req_correlate(true))
            .map_err(|e| from_zmq("configure", e))?;

        socket
            .connect(endpoint)
            .map_err(|e| from_zmq("connect", e))?;
        tracing::info!(endpoint = %endpoint, "search backend connected");

        Ok(Self {
            _context: context,
            socket: Mutex::new(socket),
        })
    }

    /// Send one two-frame request and receive the single-frame reply.
    fn send_request(&self, op: &str, payload: &Value) -> Result<String> {
        let socket = self.socket.lock();

        socket
            .send(op, zmq::SNDMORE)
            .and_then(|_| socket.send(payload.to_string().as_bytes(), 0))
            .map_err(|e| from_zmq(op, e))?;

        let mut frames = socket.recv_multipart(0).map_err(|e| from_zmq(op, e))?;
        if frames.len() != 1 {
            tracing::error!(op = %op, frames = frames.len(), "malformed multi-frame reply");
            return Err(Error::backend("search", "malformed multi-frame reply"));
        }

        String::from_utf8(frames.remove(0))
            .map_err(|_| Error::backend("search", "reply is not valid UTF-8"))
    }
}

fn from_zmq(op: &str, e: zmq::Error) -> Error {
    if e == zmq::Error::EAGAIN {
        tracing::error!(op = %op, "search backend timed out");
        Error::Timeout(format!("search backend did not reply to '{op}'"))
    } else {
        tracing::error!(op = %op, error = %e, "search backend transport failure");
        Error::backend("search", e.to_string())
    }
}

impl SearchBackend for ZmqSearchClient {
    fn list_indexes(&self) -> Result<Vec<String>> {
        let reply = self.send_request("list_indexes", &json!({}))?;
        parse_string_list(&reply, "list_indexes")
    }

    fn list_documents(&self, index: &str) -> Result<Vec<String>> {
        let reply = self.send_request("list_documents", &json!({"index_name": index}))?;
        parse_string_list(&reply, "list_documents")
    }

    fn create_index(&self, index: &str) -> Result<()> {
        let reply = self.send_request("create_index", &json!({"index_name": index}))?;
        ensure_ok(&reply, "create_index")
    }

    fn delete_index(&self, index: &str) -> Result<()> {
        let reply = self.send_request("delete_index", &json!({"index_name": index}))?;
        ensure_ok(&reply, "delete_index")
    }

    fn add_document(&self, index: &str, document: &str, text: &str) -> Result<()> {
        let payload = json!({
            "index_name": index,
            "document_id": document,
            "text": text,
        });
        let reply = self.send_request("add_document", &payload)?;
        ensure_ok(&reply, "add_document")
    }

    fn remove_document(&self, index: &str, document: &str) -> Result<()> {
        let payload = json!({"index_name": index, "document_id": document});
        let reply = self.send_request("remove_document", &payload)?;
        ensure_ok(&reply, "remove_document")
    }

    fn query(&self, index: &str, query: &str) -> Result<String> {
        let payload = json!({"index_name": index, "query": query});
        let reply = self.send_request("query", &payload)?;
        parse_query_reply(&reply)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Reply interpretation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// List operations answer with a JSON array of names.
fn parse_string_list(reply: &str, op: &str) -> Result<Vec<String>> {
    let value: Value = serde_json::from_str(reply)
        .map_err(|_| backend_error(op, "reply is not JSON"))?;

    if let Some(err) = value.get("error") {
        return Err(backend_error(op, &err.to_string()));
    }

    let items = value
        .as_array()
        .ok_or_else(|| backend_error(op, "expected a JSON array"))?;
    items
        .iter()
        .map(|v| {
            v.as_str()
                .map(str::to_owned)
                .ok_or_else(|| backend_error(op, "array holds a non-string entry"))
        })
        .collect()
}

/// Mutations succeed iff the reply is an object with `status = "ok"` and no
/// `error` field.
fn ensure_ok(reply: &str, op: &str) -> Result<()> {
    let value: Value = serde_json::from_str(reply)
        .map_err(|_| backend_error(op, "reply is not JSON"))?;

    if let Some(err) = value.get("error") {
        return Err(backend_error(op, &err.to_string()));
    }
    if value.get("status").and_then(Value::as_str) == Some("ok") {
        return Ok(());
    }
    Err(backend_error(op, "reply lacks status = \"ok\""))
}

/// Query replies carry the formatted result either as a bare JSON string or
/// inside an ok-object's `result` field.
fn parse_query_reply(reply: &str) -> Result<String> {
    let value: Value = serde_json::from_str(reply)
        .map_err(|_| backend_error("query", "reply is not JSON"))?;

    if let Some(err) = value.get("error") {
        return Err(backend_error("query", &err.to_string()));
    }
    if let Some(text) = value.as_str() {
        return Ok(text.to_owned());
    }
    if value.get("status").and_then(Value::as_str) == Some("ok") {
        if let Some(text) = value.get("result").and_then(Value::as_str) {
            return Ok(text.to_owned());
        }
    }
    Err(backend_error("query", "reply carries no result text"))
}

fn backend_error(op: &str, detail: &str) -> Error {
    tracing::error!(op = %op, detail = %detail, "search backend error");
    Error::backend("search", format!("{op}: {detail}"))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_lists_parse() {
        let names = parse_string_list(r#"["a", "b"]"#, "list_indexes").unwrap();
        assert_eq!(names, vec!["a", "b"]);

        assert!(parse_string_list(r#"{"status": "ok"}"#, "list_indexes").is_err());
        assert!(parse_string_list(r#"[1, 2]"#, "list_indexes").is_err());
        assert!(parse_string_list("not json", "list_indexes").is_err());
        assert!(parse_string_list(r#"{"error": "down"}"#, "list_indexes").is_err());
    }

    #[test]
    fn ok_requires_status_without_error() {
        assert!(ensure_ok(r#"{"status": "ok"}"#, "create_index").is_ok());
        assert!(ensure_ok(r#"{"status": "ok", "detail": 1}"#, "create_index").is_ok());

        assert!(ensure_ok(r#"{"status": "ok", "error": "late"}"#, "create_index").is_err());
        assert!(ensure_ok(r#"{"error": "no such index"}"#, "delete_index").is_err());
        assert!(ensure_ok(r#"{"status": "pending"}"#, "create_index").is_err());
        assert!(ensure_ok("", "create_index").is_err());
    }

    #[test]
    fn query_replies_yield_result_text() {
        assert_eq!(parse_query_reply(r#""top hit: doc_a""#).unwrap(), "top hit: doc_a");
        assert_eq!(
            parse_query_reply(r#"{"status": "ok", "result": "ranked list"}"#).unwrap(),
            "ranked list"
        );

        assert!(parse_query_reply(r#"{"error": "empty index"}"#).is_err());
        assert!(parse_query_reply(r#"{"status": "ok"}"#).is_err());
        assert!(parse_query_reply("plain text").is_err());
    }
}
