//! ssemcp Core Library
//!
//! Client for MCP servers that speak JSON-RPC over two HTTP channels: a
//! long-lived event stream carrying responses and the session announcement,
//! and per-message POSTs carrying requests.
//!
//! ## Example
//!
//! ```rust,ignore
//! use ssemcp_core::{ClientConfig, SseClient};
//! use serde_json::json;
//!
//! let client = SseClient::new(ClientConfig::new("http://localhost:8008/a/mcp"))?;
//!
//! let tools = client.list_tools().await?;
//! let outcome = client.call_tool("echo", json!({"text": "hi"})).await?;
//! ```

pub mod client;
pub mod config;
pub mod correlator;
pub mod decoder;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transport;

pub use client::SseClient;
pub use config::{ClientConfig, ClientInfo};
pub use correlator::{PendingRequests, PendingResponse, RpcOutcome};
pub use decoder::{Frame, FrameDecoder};
pub use error::{McpError, McpResult};
pub use protocol::{McpNotification, McpRequest, McpTool};
pub use session::ConnectionState;
pub use transport::{EventByteStream, HttpTransport, SseTransport};
