//! MCP protocol message types
//!
//! JSON-RPC envelopes sent on the POST channel and the handshake payloads.

use crate::config::ClientInfo;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version constant
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC version
pub const JSONRPC_VERSION: &str = "2.0";

/// Identifier reserved for the `initialize` request.
///
/// Application requests are numbered from `INITIALIZE_REQUEST_ID + 1`.
pub const INITIALIZE_REQUEST_ID: i64 = 0;

/// JSON-RPC request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpRequest {
    /// JSON-RPC version
    pub jsonrpc: String,
    /// Method name
    pub method: String,
    /// Optional parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Request ID
    pub id: i64,
}

impl McpRequest {
    /// Create a new request
    pub fn new(id: i64, method: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params: None,
            id,
        }
    }

    /// Add parameters to the request
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }
}

/// JSON-RPC notification (no id, no response expected)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpNotification {
    /// JSON-RPC version
    pub jsonrpc: String,
    /// Method name
    pub method: String,
    /// Optional parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl McpNotification {
    /// Create a new notification
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params: None,
        }
    }

    /// Add parameters
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }
}

/// Parameters of the `initialize` request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version
    pub protocol_version: String,
    /// Client capabilities
    pub capabilities: ClientCapabilities,
    /// Client info
    pub client_info: ClientInfo,
}

/// Capabilities declared by the client during the handshake
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCapabilities {
    /// Sampling support (declared empty)
    pub sampling: serde_json::Map<String, Value>,
    /// Roots support
    pub roots: RootsCapability,
}

impl Default for ClientCapabilities {
    fn default() -> Self {
        Self {
            sampling: serde_json::Map::new(),
            roots: RootsCapability { list_changed: true },
        }
    }
}

/// Roots capability
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootsCapability {
    /// Whether root list changes are notified
    pub list_changed: bool,
}

/// MCP tool definition, as returned by `tools/list`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpTool {
    /// Tool name
    pub name: String,
    /// Tool description
    #[serde(default)]
    pub description: Option<String>,
    /// Input schema (JSON Schema)
    #[serde(default)]
    pub input_schema: Value,
}

/// MCP method names
pub mod methods {
    /// Initialize
    pub const INITIALIZE: &str = "initialize";
    /// Initialized notification
    pub const INITIALIZED: &str = "notifications/initialized";

    /// List tools
    pub const TOOLS_LIST: &str = "tools/list";
    /// Call tool
    pub const TOOLS_CALL: &str = "tools/call";

    /// Ping
    pub const PING: &str = "ping";
}
