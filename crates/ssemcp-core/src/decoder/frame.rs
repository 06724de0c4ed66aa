//! Decoded stream frames

/// Event name used when no `event:` line precedes a `data:` line
pub const DEFAULT_EVENT: &str = "message";

/// Event name of the frame that announces the session
pub const ENDPOINT_EVENT: &str = "endpoint";

/// One `(event, data)` unit decoded from the event stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Event name (`message` unless overridden)
    pub event: String,
    /// Raw payload of the `data:` line
    pub data: String,
}

impl Frame {
    /// Create a frame with the default event name
    pub fn message(data: impl Into<String>) -> Self {
        Self::new(DEFAULT_EVENT, data)
    }

    /// Create a frame with an explicit event name
    pub fn new(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
        }
    }

    /// Whether this frame announces the session endpoint
    pub fn is_endpoint(&self) -> bool {
        self.event == ENDPOINT_EVENT
    }

    /// Whether this frame carries a JSON-RPC message
    pub fn is_message(&self) -> bool {
        self.event == DEFAULT_EVENT
    }
}
