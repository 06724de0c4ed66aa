//! Request correlation
//!
//! Every correlated request registers a single-use completion slot under its
//! id. The slot is removed and resolved exactly once: by the matching
//! response on the event stream, by a failed POST, or when the stream goes
//! away. Whichever comes first wins; later attempts find no entry and are
//! no-ops.

use crate::error::{McpError, McpResult};
use crate::protocol::INITIALIZE_REQUEST_ID;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Resolution of a correlated request
#[derive(Debug, Clone, PartialEq)]
pub enum RpcOutcome {
    /// Text of the first content block of a tool result
    Text(String),
    /// Raw result, or the whole message when it had neither result nor error
    Value(Value),
    /// Server `error` field or transport failure, described
    Error(String),
}

impl RpcOutcome {
    /// Whether this outcome is error-shaped
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Error description, if error-shaped
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            _ => None,
        }
    }

    /// Text, if the outcome is a text block
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Convert into a JSON value; errors become `{"error": <description>}`
    pub fn into_value(self) -> Value {
        match self {
            Self::Text(text) => Value::String(text),
            Self::Value(value) => value,
            Self::Error(message) => json!({ "error": message }),
        }
    }
}

impl fmt::Display for RpcOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{}", text),
            Self::Value(value) => write!(f, "{}", value),
            Self::Error(message) => write!(f, "error: {}", message),
        }
    }
}

/// Treat JSON `null` like an absent field
fn present<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.get(key).filter(|v| !v.is_null())
}

/// Shape a response message into its outcome
pub fn classify_response(message: Value) -> RpcOutcome {
    if let Some(error) = present(&message, "error") {
        let description = match error.get("message").and_then(Value::as_str) {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => match error {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            },
        };
        return RpcOutcome::Error(description);
    }

    let Some(result) = present(&message, "result") else {
        return RpcOutcome::Value(message);
    };

    // initialize response
    if present(result, "capabilities").is_some() {
        return RpcOutcome::Value(result.clone());
    }

    // tool call response
    if let Some(first) = present(result, "content")
        .and_then(Value::as_array)
        .and_then(|content| content.first())
    {
        return match first.get("text").and_then(Value::as_str) {
            Some(text) => RpcOutcome::Text(text.to_string()),
            None => RpcOutcome::Value(first.clone()),
        };
    }

    RpcOutcome::Value(result.clone())
}

/// Completion handle for a correlated request
#[derive(Debug)]
pub struct PendingResponse {
    id: i64,
    receiver: oneshot::Receiver<RpcOutcome>,
}

impl PendingResponse {
    /// Identifier of the request
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Wait for the request to resolve
    pub async fn outcome(self) -> McpResult<RpcOutcome> {
        self.receiver.await.map_err(|_| McpError::Cancelled)
    }
}

/// Registry of requests awaiting a response
#[derive(Debug, Clone)]
pub struct PendingRequests {
    slots: Arc<Mutex<HashMap<i64, oneshot::Sender<RpcOutcome>>>>,
    next_id: Arc<AtomicI64>,
}

impl Default for PendingRequests {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingRequests {
    /// Create an empty registry; ids are handed out from
    /// `INITIALIZE_REQUEST_ID + 1`
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicI64::new(INITIALIZE_REQUEST_ID + 1)),
        }
    }

    /// Allocate the next application request id
    pub fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Register a completion slot for `id`
    pub fn register(&self, id: i64) -> McpResult<PendingResponse> {
        let mut slots = self.slots.lock();
        if slots.contains_key(&id) {
            return Err(McpError::protocol(format!("request {} is already pending", id)));
        }

        let (sender, receiver) = oneshot::channel();
        slots.insert(id, sender);
        Ok(PendingResponse { id, receiver })
    }

    /// Remove and resolve the slot for `id`; returns false if none was registered
    pub fn resolve(&self, id: i64, outcome: RpcOutcome) -> bool {
        let Some(sender) = self.slots.lock().remove(&id) else {
            return false;
        };

        if sender.send(outcome).is_err() {
            debug!("Caller stopped waiting for request {}", id);
        }
        true
    }

    /// Resolve `id` with an error description
    pub fn fail(&self, id: i64, description: impl Into<String>) -> bool {
        self.resolve(id, RpcOutcome::Error(description.into()))
    }

    /// Resolve every pending request with an error description
    pub fn fail_all(&self, description: &str) -> usize {
        let drained: Vec<_> = self.slots.lock().drain().collect();
        let count = drained.len();

        for (id, sender) in drained {
            warn!("Failing pending request {}: {}", id, description);
            let _ = sender.send(RpcOutcome::Error(description.to_string()));
        }
        count
    }

    /// Route a `message` frame payload to its waiting request
    ///
    /// Malformed payloads and unknown ids are logged and dropped.
    pub fn dispatch(&self, data: &str) {
        let message: Value = match serde_json::from_str(data) {
            Ok(message) => message,
            Err(e) => {
                warn!("Failed to parse stream message: {} - data: {}", e, data);
                return;
            }
        };

        let Some(id) = message.get("id").and_then(Value::as_i64) else {
            match message.get("method").and_then(Value::as_str) {
                Some(method) => debug!("Ignoring server message: {}", method),
                None => debug!("Ignoring stream message without id"),
            }
            return;
        };

        if !self.contains(id) {
            debug!("Received response for unknown request: {}", id);
            return;
        }

        if !self.resolve(id, classify_response(message)) {
            debug!("Request {} was resolved concurrently", id);
        }
    }

    /// Whether a slot is registered for `id`
    pub fn contains(&self, id: i64) -> bool {
        self.slots.lock().contains_key(&id)
    }

    /// Number of pending requests
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// Whether no request is pending
    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }
}
