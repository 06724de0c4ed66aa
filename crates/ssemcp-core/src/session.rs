//! Session state and endpoint negotiation

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Session token inside an endpoint frame, e.g. `/message?session_id=abc123`
static SESSION_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:session_id|sessionId)=([^&]+)").unwrap()
});

/// Extract the session identifier from an endpoint frame payload
///
/// Both `session_id=` and `sessionId=` spellings are accepted.
pub fn extract_session_id(data: &str) -> Option<String> {
    SESSION_ID_PATTERN
        .captures(data)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|id| !id.is_empty())
}

/// Client-wide connection state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No stream subscription
    #[default]
    Disconnected,
    /// Stream requested, waiting for the endpoint frame
    Connecting,
    /// Session announced, handshake in flight
    Handshaking { session_id: String },
    /// Handshake complete, application calls allowed
    Established { session_id: String },
    /// Session announced but the handshake failed; unusable until the
    /// next `connect()` re-negotiates
    HandshakeFailed { session_id: String, reason: String },
}

impl ConnectionState {
    /// Session identifier, if the server has announced one
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::Handshaking { session_id }
            | Self::Established { session_id }
            | Self::HandshakeFailed { session_id, .. } => Some(session_id),
            Self::Disconnected | Self::Connecting => None,
        }
    }

    /// Whether application calls may be sent
    pub fn is_established(&self) -> bool {
        matches!(self, Self::Established { .. })
    }

    /// Whether a connect attempt is in flight
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Connecting | Self::Handshaking { .. })
    }

    /// Whether `connect()` should start a fresh negotiation
    pub(crate) fn needs_negotiation(&self) -> bool {
        matches!(self, Self::Disconnected | Self::HandshakeFailed { .. })
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Handshaking { session_id } => write!(f, "handshaking ({})", session_id),
            Self::Established { session_id } => write!(f, "established ({})", session_id),
            Self::HandshakeFailed { session_id, reason } => {
                write!(f, "handshake failed ({}): {}", session_id, reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_session_id_spellings() {
        assert_eq!(
            extract_session_id("session_id=abc123"),
            Some("abc123".to_string())
        );
        assert_eq!(
            extract_session_id("/a/mcp/message?sessionId=f00d"),
            Some("f00d".to_string())
        );
    }

    #[test]
    fn test_extract_session_id_stops_at_ampersand() {
        assert_eq!(
            extract_session_id("/message?session_id=abc&foo=bar"),
            Some("abc".to_string())
        );
    }

    #[test]
    fn test_extract_session_id_missing() {
        assert_eq!(extract_session_id("/message"), None);
        assert_eq!(extract_session_id("session=abc"), None);
        assert_eq!(extract_session_id("session_id="), None);
    }

    #[test]
    fn test_state_session_id() {
        assert_eq!(ConnectionState::Disconnected.session_id(), None);
        assert_eq!(ConnectionState::Connecting.session_id(), None);

        let failed = ConnectionState::HandshakeFailed {
            session_id: "s".to_string(),
            reason: "boom".to_string(),
        };
        assert_eq!(failed.session_id(), Some("s"));
        assert!(!failed.is_established());
        assert!(failed.needs_negotiation());
        assert_eq!(failed.to_string(), "handshake failed (s): boom");
    }

    #[test]
    fn test_state_flags() {
        let handshaking = ConnectionState::Handshaking {
            session_id: "s".to_string(),
        };
        assert!(handshaking.is_in_flight());
        assert!(!handshaking.needs_negotiation());

        let established = ConnectionState::Established {
            session_id: "s".to_string(),
        };
        assert!(established.is_established());
        assert!(!established.is_in_flight());
        assert!(ConnectionState::Disconnected.needs_negotiation());
    }
}
