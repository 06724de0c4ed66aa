//! MCP client over the SSE + POST transport
//!
//! Provides a high-level client for communicating with MCP servers that
//! announce a session on an event stream and accept requests by POST.
//!
//! # Features
//! - Lazy connection: the first call opens the stream and runs the handshake
//! - Concurrent callers share one in-flight connect
//! - Concurrent request support with id-based response routing
//! - Background stream reader that never blocks on callers

mod operations;
mod stream;

use crate::config::ClientConfig;
use crate::correlator::{PendingRequests, PendingResponse, RpcOutcome};
use crate::error::{McpError, McpResult};
use crate::protocol::{
    ClientCapabilities, INITIALIZE_REQUEST_ID, InitializeParams, McpNotification, McpRequest,
    methods,
};
use crate::session::ConnectionState;
use crate::transport::{HttpTransport, SseTransport};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

/// Reason used to fail pending requests when the stream goes away
const STREAM_CLOSED: &str = "event stream closed";

/// MCP client for one server session
///
/// Cloning is cheap; clones share the session and the pending requests.
#[derive(Clone)]
pub struct SseClient {
    inner: Arc<ClientInner>,
}

/// State shared between client handles and the stream task
pub(crate) struct ClientInner {
    config: ClientConfig,
    transport: Arc<dyn SseTransport>,
    /// Current connection state; subscribers are woken on every transition
    state: watch::Sender<ConnectionState>,
    pending: PendingRequests,
    /// Bumped for every stream subscription; older streams become inert
    generation: AtomicU64,
    stream_task: Mutex<Option<JoinHandle<()>>>,
}

impl SseClient {
    /// Create a client using the HTTP transport
    pub fn new(config: ClientConfig) -> McpResult<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client with a custom transport
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn SseTransport>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(ClientInner {
                config,
                transport,
                state,
                pending: PendingRequests::new(),
                generation: AtomicU64::new(0),
                stream_task: Mutex::new(None),
            }),
        }
    }

    /// Client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.inner.state.borrow().clone()
    }

    /// Session identifier announced by the server, if any
    pub fn session_id(&self) -> Option<String> {
        self.inner.state.borrow().session_id().map(str::to_string)
    }

    /// Whether the handshake has completed on a live stream
    pub fn is_connected(&self) -> bool {
        self.inner.state.borrow().is_established()
    }

    /// Subscribe to connection state transitions
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Number of requests still waiting for a response
    pub fn pending_requests(&self) -> usize {
        self.inner.pending.len()
    }

    /// Open the event stream and complete the handshake
    ///
    /// Returns immediately when already established. When another caller is
    /// connecting, waits for that attempt and re-checks. A session whose
    /// handshake failed is torn down and negotiated again.
    #[instrument(skip(self), level = "debug")]
    pub async fn connect(&self) -> McpResult<()> {
        let mut state_rx = self.inner.state.subscribe();

        loop {
            let claimed = self.inner.state.send_if_modified(|state| {
                if state.needs_negotiation() {
                    *state = ConnectionState::Connecting;
                    true
                } else {
                    false
                }
            });

            if claimed {
                return self.negotiate().await;
            }

            {
                let current = state_rx.borrow_and_update();
                if current.is_established() {
                    return Ok(());
                }
                // The attempt we would wait on may already have failed
                if current.needs_negotiation() {
                    continue;
                }
            }

            debug!("Waiting for in-flight connect");
            state_rx
                .changed()
                .await
                .map_err(|_| McpError::connection("Client state channel closed"))?;
        }
    }

    /// Close the event stream and fail every pending request
    pub fn close(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.abort_stream_task();
        self.inner.state.send_replace(ConnectionState::Disconnected);

        let failed = self.inner.pending.fail_all("client closed");
        info!("Client closed ({} pending requests failed)", failed);
    }

    /// Send a correlated request, connecting first if needed
    ///
    /// Returns as soon as the request is registered; the POST happens in the
    /// background and a POST failure resolves the request with an error.
    pub async fn request(&self, method: &str, params: Option<Value>) -> McpResult<PendingResponse> {
        let session_id = self.ensure_connected().await?;
        let id = self.inner.pending.next_id();
        self.inner.send_request(&session_id, id, method, params)
    }

    /// Send a notification, connecting first if needed
    pub async fn notify(&self, method: &str, params: Option<Value>) -> McpResult<()> {
        let session_id = self.ensure_connected().await?;
        self.inner.send_notification(&session_id, method, params)
    }

    /// Make a request and wait for its outcome
    pub(crate) async fn call(&self, method: &str, params: Option<Value>) -> McpResult<RpcOutcome> {
        self.request(method, params).await?.outcome().await
    }

    /// Return the established session id, connecting if necessary
    async fn ensure_connected(&self) -> McpResult<String> {
        if let ConnectionState::Established { session_id } = &*self.inner.state.borrow() {
            return Ok(session_id.clone());
        }

        self.connect().await?;

        match &*self.inner.state.borrow() {
            ConnectionState::Established { session_id } => Ok(session_id.clone()),
            _ => Err(McpError::NotConnected),
        }
    }

    /// Run one negotiation; the caller has moved the state to `Connecting`
    async fn negotiate(&self) -> McpResult<()> {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.abort_stream_task();
        let _guard = NegotiationGuard {
            inner: &self.inner,
            generation,
        };

        let url = self.inner.config.stream_url();
        info!("Connecting to {}", url);

        let byte_stream = match self.inner.transport.open_stream(&url).await {
            Ok(byte_stream) => byte_stream,
            Err(e) => {
                error!("Failed to open event stream: {}", e);
                self.inner.set_state_if_current(generation, ConnectionState::Disconnected);
                return Err(e);
            }
        };

        let (session_tx, session_rx) = oneshot::channel();
        let handle = tokio::spawn(stream::run_event_stream(
            Arc::downgrade(&self.inner),
            byte_stream,
            generation,
            session_tx,
        ));
        *self.inner.stream_task.lock() = Some(handle);

        let session_id = session_rx.await.map_err(|_| {
            McpError::connection("Event stream closed before a session was announced")
        })?;
        info!("Session announced: {}", session_id);

        match self.handshake(&session_id).await {
            Ok(()) => {
                let established = self.inner.state.send_if_modified(|state| {
                    if self.inner.is_current(generation)
                        && matches!(state, ConnectionState::Handshaking { .. })
                    {
                        *state = ConnectionState::Established {
                            session_id: session_id.clone(),
                        };
                        true
                    } else {
                        false
                    }
                });

                if established {
                    info!("Handshake complete");
                    Ok(())
                } else {
                    Err(McpError::connection("Event stream closed during handshake"))
                }
            }
            Err(e) => {
                let failed = self.inner.state.send_if_modified(|state| {
                    if self.inner.is_current(generation)
                        && matches!(state, ConnectionState::Handshaking { .. })
                    {
                        *state = ConnectionState::HandshakeFailed {
                            session_id: session_id.clone(),
                            reason: e.to_string(),
                        };
                        true
                    } else {
                        false
                    }
                });

                if failed {
                    error!("Handshake failed: {}", e);
                    Err(e)
                } else {
                    Err(McpError::connection("Event stream closed during handshake"))
                }
            }
        }
    }

    /// `initialize`, then the `initialized` notification once it resolved
    async fn handshake(&self, session_id: &str) -> McpResult<()> {
        let params = InitializeParams {
            protocol_version: self.inner.config.protocol_version.clone(),
            capabilities: ClientCapabilities::default(),
            client_info: self.inner.config.client_info.clone(),
        };

        let response = self.inner.send_request(
            session_id,
            INITIALIZE_REQUEST_ID,
            methods::INITIALIZE,
            Some(serde_json::to_value(params)?),
        )?;

        match response.outcome().await? {
            RpcOutcome::Error(message) => return Err(McpError::handshake(message)),
            outcome => debug!("Initialize result: {}", outcome),
        }

        self.inner
            .send_notification(session_id, methods::INITIALIZED, None)
    }
}

/// Reverts a negotiation whose caller stopped waiting, so later callers
/// are not left waiting on a connect nobody drives
struct NegotiationGuard<'a> {
    inner: &'a ClientInner,
    generation: u64,
}

impl Drop for NegotiationGuard<'_> {
    fn drop(&mut self) {
        if !self.inner.is_current(self.generation) {
            return;
        }

        if self.inner.state.borrow().is_in_flight() {
            warn!("Connect abandoned, dropping the half-open session");
            self.inner.abort_stream_task();
            self.inner.pending.fail(INITIALIZE_REQUEST_ID, "connect abandoned");
            self.inner.state.send_replace(ConnectionState::Disconnected);
        }
    }
}

impl ClientInner {
    /// Whether `generation` is the live subscription
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Replace the state unless a newer subscription has taken over
    fn set_state_if_current(&self, generation: u64, next: ConnectionState) {
        if self.is_current(generation) {
            self.state.send_replace(next);
        }
    }

    fn abort_stream_task(&self) {
        if let Some(handle) = self.stream_task.lock().take() {
            handle.abort();
        }
    }

    /// Register `id` and POST the request in the background
    fn send_request(
        &self,
        session_id: &str,
        id: i64,
        method: &str,
        params: Option<Value>,
    ) -> McpResult<PendingResponse> {
        let request = McpRequest::new(id, method);
        let request = match params {
            Some(p) => request.with_params(p),
            None => request,
        };
        let body = serde_json::to_string(&request)?;

        let response = self.pending.register(id)?;

        // A stream that ended before the registration will not fail it
        if self.state.borrow().session_id() != Some(session_id) {
            debug!("Session {} ended before request {} was sent", session_id, id);
            self.pending.fail(id, STREAM_CLOSED);
            return Ok(response);
        }
        debug!("Sending request {} ({})", id, method);

        let transport = Arc::clone(&self.transport);
        let pending = self.pending.clone();
        let url = self.config.message_url(session_id);
        tokio::spawn(async move {
            if let Err(e) = transport.post_json(&url, body).await {
                error!("POST for request {} failed: {}", id, e);
                pending.fail(id, e.failure_description());
            }
        });

        Ok(response)
    }

    /// POST a notification in the background; failures are only logged
    fn send_notification(
        &self,
        session_id: &str,
        method: &str,
        params: Option<Value>,
    ) -> McpResult<()> {
        let notification = McpNotification::new(method);
        let notification = match params {
            Some(p) => notification.with_params(p),
            None => notification,
        };
        let body = serde_json::to_string(&notification)?;
        debug!("Sending notification {}", method);

        let transport = Arc::clone(&self.transport);
        let url = self.config.message_url(session_id);
        let method = method.to_string();
        tokio::spawn(async move {
            if let Err(e) = transport.post_json(&url, body).await {
                error!("POST for notification {} failed: {}", method, e);
            }
        });

        Ok(())
    }

    /// The stream of `generation` ended: drop the session and fail waiters
    fn end_session(&self, generation: u64) {
        if !self.is_current(generation) {
            debug!("Stale event stream ended");
            return;
        }

        self.state.send_replace(ConnectionState::Disconnected);
        let failed = self.pending.fail_all(STREAM_CLOSED);
        if failed > 0 {
            info!("{} pending requests failed: {}", failed, STREAM_CLOSED);
        }
    }
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        if let Some(handle) = self.stream_task.get_mut().take() {
            handle.abort();
        }
    }
}
