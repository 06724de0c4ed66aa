//! Application-level MCP operations

use super::SseClient;
use crate::correlator::RpcOutcome;
use crate::error::McpResult;
use crate::protocol::{McpTool, methods};
use serde_json::{Value, json};
use tracing::{instrument, warn};

impl SseClient {
    /// List available tools
    ///
    /// Reads the `tools` (or `operations`) array of the result. An
    /// error-shaped outcome, or a result without either field, yields an
    /// empty list.
    #[instrument(skip(self), level = "debug")]
    pub async fn list_tools(&self) -> McpResult<Vec<McpTool>> {
        let result = match self.call(methods::TOOLS_LIST, None).await? {
            RpcOutcome::Value(result) => result,
            RpcOutcome::Error(message) => {
                warn!("tools/list failed: {}", message);
                return Ok(Vec::new());
            }
            RpcOutcome::Text(text) => {
                warn!("tools/list returned text instead of a tool list: {}", text);
                return Ok(Vec::new());
            }
        };

        let tools = result
            .get("tools")
            .or_else(|| result.get("operations"))
            .cloned()
            .unwrap_or(Value::Array(Vec::new()));

        if tools.is_null() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_value(tools)?)
    }

    /// Call a tool; the outcome is returned verbatim
    ///
    /// Server-side failures come back as [`RpcOutcome::Error`], not as `Err`.
    #[instrument(skip(self, arguments), fields(tool_name = %name))]
    pub async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<RpcOutcome> {
        let params = json!({
            "name": name,
            "arguments": arguments
        });

        self.call(methods::TOOLS_CALL, Some(params)).await
    }

    /// Ping the server
    pub async fn ping(&self) -> McpResult<RpcOutcome> {
        self.call(methods::PING, None).await
    }
}
