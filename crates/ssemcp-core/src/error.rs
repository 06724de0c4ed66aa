//! Error types for the SSE client
//!
//! Protocol-level failures reported by the server (a JSON-RPC `error` field)
//! are not represented here: they resolve a request with
//! [`RpcOutcome::Error`](crate::correlator::RpcOutcome::Error) instead.

use thiserror::Error;

/// Result type alias for client operations
pub type McpResult<T> = Result<T, McpError>;

/// Transport, session and configuration errors
#[derive(Debug, Error, Clone)]
pub enum McpError {
    /// Network failure on either channel, or the event stream went away
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        context: Option<String>,
    },

    /// A channel answered with a non-success status code
    #[error("HTTP {status}")]
    HttpStatus {
        status: u16,
        context: Option<String>,
    },

    /// The initialize request resolved with an error
    #[error("Handshake failed: {message}")]
    Handshake {
        message: String,
        context: Option<String>,
    },

    /// Malformed outbound envelope
    #[error("Protocol error: {message}")]
    Protocol {
        message: String,
        context: Option<String>,
    },

    /// Serialization error
    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        context: Option<String>,
    },

    /// Configuration file or environment error
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        context: Option<String>,
    },

    /// No established session
    #[error("Client not connected")]
    NotConnected,

    /// The completion slot was dropped without an outcome
    #[error("Request cancelled")]
    Cancelled,
}

impl McpError {
    /// Create a new Connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            context: None,
        }
    }

    /// Create a new HttpStatus error
    pub fn http_status(status: u16) -> Self {
        Self::HttpStatus {
            status,
            context: None,
        }
    }

    /// Create a new Handshake error
    pub fn handshake(message: impl Into<String>) -> Self {
        Self::Handshake {
            message: message.into(),
            context: None,
        }
    }

    /// Create a new Protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
            context: None,
        }
    }

    /// Create a new Serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
            context: None,
        }
    }

    /// Create a new Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            context: None,
        }
    }

    /// Attach context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        let ctx = Some(context.into());
        match &mut self {
            Self::Connection { context: c, .. } => *c = ctx,
            Self::HttpStatus { context: c, .. } => *c = ctx,
            Self::Handshake { context: c, .. } => *c = ctx,
            Self::Protocol { context: c, .. } => *c = ctx,
            Self::Serialization { context: c, .. } => *c = ctx,
            Self::Config { context: c, .. } => *c = ctx,
            Self::NotConnected | Self::Cancelled => {}
        }
        self
    }

    /// Context attached with [`McpError::with_context`], if any
    pub fn context(&self) -> Option<&str> {
        match self {
            Self::Connection { context, .. }
            | Self::HttpStatus { context, .. }
            | Self::Handshake { context, .. }
            | Self::Protocol { context, .. }
            | Self::Serialization { context, .. }
            | Self::Config { context, .. } => context.as_deref(),
            Self::NotConnected | Self::Cancelled => None,
        }
    }

    /// Text used to fail a pending request after a send failure.
    ///
    /// Status failures read `HTTP <code>`; network failures carry the
    /// underlying message only.
    pub fn failure_description(&self) -> String {
        match self {
            Self::Connection { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for McpError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<std::io::Error> for McpError {
    fn from(err: std::io::Error) -> Self {
        Self::connection(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_display() {
        let err = McpError::http_status(503);
        assert_eq!(err.to_string(), "HTTP 503");
        assert_eq!(err.failure_description(), "HTTP 503");
    }

    #[test]
    fn test_connection_failure_description_is_bare_message() {
        let err = McpError::connection("connection refused");
        assert_eq!(err.to_string(), "Connection error: connection refused");
        assert_eq!(err.failure_description(), "connection refused");
    }

    #[test]
    fn test_with_context() {
        let err = McpError::config("bad value").with_context("reading ssemcp.toml");
        assert_eq!(err.context(), Some("reading ssemcp.toml"));
        assert_eq!(McpError::NotConnected.with_context("ignored").context(), None);
    }

    #[test]
    fn test_from_serde_error() {
        let err: McpError = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, McpError::Serialization { .. }));
    }
}
