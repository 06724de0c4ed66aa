//! Client configuration
//!
//! Loaded from a TOML or JSON file, then overridden from `SSEMCP_*`
//! environment variables.

use crate::error::{McpError, McpResult};
use crate::protocol::MCP_PROTOCOL_VERSION;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

/// Helper function for the default server endpoint
fn default_base_url() -> String {
    "http://localhost:8008/a/mcp".to_string()
}

/// Helper function for the default protocol version
fn default_protocol_version() -> String {
    MCP_PROTOCOL_VERSION.to_string()
}

/// Helper function for the default connect timeout
fn default_connect_timeout() -> u64 {
    10
}

/// Client identification sent in the `initialize` request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Client name
    pub name: String,
    /// Client version
    pub version: String,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Configuration for an [`SseClient`](crate::client::SseClient)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Event stream endpoint; POSTs go to `<base_url>/message`
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Identification sent during the handshake
    #[serde(default)]
    pub client_info: ClientInfo,
    /// Protocol version announced during the handshake
    #[serde(default = "default_protocol_version")]
    pub protocol_version: String,
    /// Extra HTTP headers sent on both channels
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// TCP connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            client_info: ClientInfo::default(),
            protocol_version: default_protocol_version(),
            headers: HashMap::new(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl ClientConfig {
    /// Create a config for the given endpoint
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Add a header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the client identification
    pub fn with_client_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.client_info = ClientInfo {
            name: name.into(),
            version: version.into(),
        };
        self
    }

    /// URL of the event stream
    pub fn stream_url(&self) -> String {
        self.base_url.trim_end_matches('/').to_string()
    }

    /// URL of the POST channel for a session
    pub fn message_url(&self, session_id: &str) -> String {
        format!("{}/message?sessionId={}", self.stream_url(), session_id)
    }

    /// Load configuration from a file
    ///
    /// `.toml` files are parsed as TOML, anything else as JSON.
    /// Returns the default config if the file doesn't exist.
    pub fn load_from_file(path: &Path) -> McpResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let context = format!("Reading configuration from '{}'", path.display());
        let content = fs::read_to_string(path).map_err(|e| {
            McpError::config(format!("Failed to read config file: {}", e)).with_context(&context)
        })?;

        let config = match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => toml::from_str(&content).map_err(|e| {
                McpError::config(format!("Failed to parse TOML config: {}", e))
                    .with_context(&context)
            })?,
            _ => serde_json::from_str(&content).map_err(|e| {
                McpError::config(format!("Failed to parse JSON config: {}", e))
                    .with_context(&context)
            })?,
        };

        Ok(config)
    }

    /// Apply `SSEMCP_*` environment variable overrides
    pub fn apply_env_overrides(&mut self) -> McpResult<()> {
        if let Ok(url) = env::var("SSEMCP_BASE_URL") {
            self.base_url = url;
        }

        if let Ok(name) = env::var("SSEMCP_CLIENT_NAME") {
            self.client_info.name = name;
        }

        if let Ok(timeout) = env::var("SSEMCP_CONNECT_TIMEOUT") {
            self.connect_timeout_secs = timeout
                .parse()
                .map_err(|_| McpError::config("Invalid SSEMCP_CONNECT_TIMEOUT value"))?;
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> McpResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(McpError::config(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }

        if self.client_info.name.trim().is_empty() {
            return Err(McpError::config("client_info.name must not be empty"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_urls() {
        let config = ClientConfig::new("http://localhost:8008/a/mcp/");
        assert_eq!(config.stream_url(), "http://localhost:8008/a/mcp");
        assert_eq!(
            config.message_url("abc123"),
            "http://localhost:8008/a/mcp/message?sessionId=abc123"
        );
    }

    #[test]
    fn test_load_missing_file_gives_default() {
        let temp_dir = TempDir::new().unwrap();
        let config = ClientConfig::load_from_file(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.base_url, default_base_url());
        assert_eq!(config.protocol_version, "2024-11-05");
    }

    #[test]
    fn test_load_from_toml_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("ssemcp.toml");
        fs::write(
            &config_path,
            r#"
base_url = "https://studio.local/mcp"
connect_timeout_secs = 3

[client_info]
name = "probe"
version = "0.1.0"

[headers]
Authorization = "Bearer t"
"#,
        )
        .unwrap();

        let config = ClientConfig::load_from_file(&config_path).unwrap();
        assert_eq!(config.base_url, "https://studio.local/mcp");
        assert_eq!(config.connect_timeout_secs, 3);
        assert_eq!(config.client_info.name, "probe");
        assert_eq!(config.headers.get("Authorization").map(String::as_str), Some("Bearer t"));
    }

    #[test]
    fn test_load_from_json_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("ssemcp.json");
        fs::write(&config_path, r#"{"base_url": "http://127.0.0.1:9000"}"#).unwrap();

        let config = ClientConfig::load_from_file(&config_path).unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.client_info, ClientInfo::default());
    }

    #[test]
    fn test_load_invalid_file_has_context() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("broken.json");
        fs::write(&config_path, "{ nope").unwrap();

        let err = ClientConfig::load_from_file(&config_path).unwrap_err();
        assert!(matches!(err, McpError::Config { .. }));
        assert!(err.context().unwrap().contains("broken.json"));
    }

    // Only test touching SSEMCP_* so parallel tests never observe the overrides
    #[test]
    fn test_apply_env_overrides() {
        unsafe {
            std::env::set_var("SSEMCP_BASE_URL", "https://env.local/mcp");
            std::env::set_var("SSEMCP_CLIENT_NAME", "env-client");
            std::env::set_var("SSEMCP_CONNECT_TIMEOUT", "7");
        }

        let mut config = ClientConfig::default();
        config.apply_env_overrides().unwrap();
        assert_eq!(config.base_url, "https://env.local/mcp");
        assert_eq!(config.client_info.name, "env-client");
        assert_eq!(config.connect_timeout_secs, 7);

        unsafe {
            std::env::set_var("SSEMCP_CONNECT_TIMEOUT", "soon");
        }
        let err = ClientConfig::default().apply_env_overrides().unwrap_err();
        assert!(matches!(err, McpError::Config { .. }));

        unsafe {
            std::env::remove_var("SSEMCP_BASE_URL");
            std::env::remove_var("SSEMCP_CLIENT_NAME");
            std::env::remove_var("SSEMCP_CONNECT_TIMEOUT");
        }

        let mut config = ClientConfig::default();
        config.apply_env_overrides().unwrap();
        assert_eq!(config.base_url, default_base_url());
    }

    #[test]
    fn test_validate() {
        assert!(ClientConfig::default().validate().is_ok());
        assert!(ClientConfig::new("ftp://host").validate().is_err());
        assert!(
            ClientConfig::default()
                .with_client_info(" ", "1")
                .validate()
                .is_err()
        );
    }
}
