//! In-memory MCP server for driving `SseClient` in tests
//!
//! The fake transport hands out event streams fed by the test and records
//! every POST so the test can answer it on the stream.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use ssemcp_core::{ClientConfig, EventByteStream, McpError, SseClient, SseTransport};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

pub const BASE_URL: &str = "http://fake.local/a/mcp";

type ChunkSender = mpsc::UnboundedSender<Result<Vec<u8>, McpError>>;
type ChunkReceiver = mpsc::UnboundedReceiver<Result<Vec<u8>, McpError>>;

/// Route client logs to the test output; set RUST_LOG=debug to see them
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One recorded POST
#[derive(Debug, Clone)]
pub struct Posted {
    pub url: String,
    pub body: Value,
}

impl Posted {
    pub fn method(&self) -> &str {
        self.body["method"].as_str().unwrap_or_default()
    }

    pub fn id(&self) -> Option<i64> {
        self.body.get("id").and_then(Value::as_i64)
    }
}

/// Transport backed by channels
pub struct FakeTransport {
    streams: Mutex<VecDeque<ChunkReceiver>>,
    posts: mpsc::UnboundedSender<Posted>,
    failing_methods: Mutex<HashMap<String, McpError>>,
    stream_opens: AtomicUsize,
}

#[async_trait]
impl SseTransport for FakeTransport {
    async fn open_stream(&self, url: &str) -> Result<EventByteStream, McpError> {
        assert_eq!(url, BASE_URL);
        self.stream_opens.fetch_add(1, Ordering::SeqCst);

        match self.streams.lock().pop_front() {
            Some(receiver) => Ok(Box::pin(UnboundedReceiverStream::new(receiver))),
            None => Err(McpError::connection("connection refused")),
        }
    }

    async fn post_json(&self, url: &str, body: String) -> Result<(), McpError> {
        let body: Value = serde_json::from_str(&body).expect("client posted invalid JSON");
        let posted = Posted {
            url: url.to_string(),
            body,
        };
        let failure = self.failing_methods.lock().get(posted.method()).cloned();
        let _ = self.posts.send(posted);

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Test-side view of the server
pub struct FakeServer {
    transport: Arc<FakeTransport>,
    events: Option<ChunkSender>,
    posts: mpsc::UnboundedReceiver<Posted>,
}

impl FakeServer {
    /// Server with one event stream ready to be opened
    pub fn new() -> Self {
        init_tracing();
        let (posts_tx, posts_rx) = mpsc::unbounded_channel();
        let transport = Arc::new(FakeTransport {
            streams: Mutex::new(VecDeque::new()),
            posts: posts_tx,
            failing_methods: Mutex::new(HashMap::new()),
            stream_opens: AtomicUsize::new(0),
        });

        let mut server = Self {
            transport,
            events: None,
            posts: posts_rx,
        };
        server.new_stream();
        server
    }

    pub fn client(&self) -> SseClient {
        let config = ClientConfig::new(BASE_URL).with_client_info("test-client", "1.0.0");
        SseClient::with_transport(config, self.transport.clone())
    }

    /// Queue a fresh stream for the next subscription; pushes go to it
    pub fn new_stream(&mut self) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.transport.streams.lock().push_back(rx);
        self.events = Some(tx);
    }

    pub fn stream_opens(&self) -> usize {
        self.transport.stream_opens.load(Ordering::SeqCst)
    }

    pub fn push_bytes(&self, bytes: &[u8]) {
        if let Some(events) = &self.events {
            let _ = events.send(Ok(bytes.to_vec()));
        }
    }

    pub fn push(&self, text: &str) {
        self.push_bytes(text.as_bytes());
    }

    /// Deliver `text` one byte per chunk
    pub fn push_bytewise(&self, text: &str) {
        for byte in text.as_bytes() {
            self.push_bytes(std::slice::from_ref(byte));
        }
    }

    pub fn announce(&self, session_id: &str) {
        self.push(&format!(
            "event: endpoint\ndata: /a/mcp/message?session_id={}\n\n",
            session_id
        ));
    }

    pub fn send_message(&self, message: Value) {
        self.push(&format!("data: {}\n\n", message));
    }

    pub fn respond(&self, id: i64, result: Value) {
        self.send_message(json!({"jsonrpc": "2.0", "id": id, "result": result}));
    }

    pub fn respond_error(&self, id: i64, message: &str) {
        self.send_message(json!({"jsonrpc": "2.0", "id": id, "error": {"code": -32000, "message": message}}));
    }

    /// End the current stream cleanly
    pub fn close_stream(&mut self) {
        self.events = None;
    }

    /// Fail the current stream with a transport error
    pub fn break_stream(&mut self) {
        if let Some(events) = self.events.take() {
            let _ = events.send(Err(McpError::connection("connection reset")));
        }
    }

    /// Whether the client let go of the current stream within `ms` milliseconds
    pub async fn stream_released(&self, ms: u64) -> bool {
        match &self.events {
            Some(events) => tokio::time::timeout(Duration::from_millis(ms), events.closed())
                .await
                .is_ok(),
            None => true,
        }
    }

    pub fn fail_method(&self, method: &str, err: McpError) {
        self.transport
            .failing_methods
            .lock()
            .insert(method.to_string(), err);
    }

    pub async fn next_post(&mut self) -> Posted {
        tokio::time::timeout(Duration::from_secs(5), self.posts.recv())
            .await
            .expect("timed out waiting for a POST")
            .expect("post channel closed")
    }

    /// Whether no POST arrives within `ms` milliseconds
    pub async fn quiet_for(&mut self, ms: u64) -> bool {
        tokio::time::timeout(Duration::from_millis(ms), self.posts.recv())
            .await
            .is_err()
    }

    /// Answer `initialize` and wait for the `initialized` notification
    pub async fn accept_handshake(&mut self) -> Posted {
        let initialize = self.next_post().await;
        assert_eq!(initialize.method(), "initialize");
        self.respond(
            initialize.id().expect("initialize without id"),
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {"tools": {"listChanged": false}},
                "serverInfo": {"name": "fake", "version": "0.0.1"}
            }),
        );

        let initialized = self.next_post().await;
        assert_eq!(initialized.method(), "notifications/initialized");
        assert_eq!(initialized.id(), None);
        initialize
    }

    /// Announce `session_id` and complete the handshake against `client`
    pub async fn establish(&mut self, client: &SseClient, session_id: &str) {
        self.announce(session_id);
        let (connected, _) = tokio::join!(client.connect(), self.accept_handshake());
        connected.expect("connect failed");
    }
}
