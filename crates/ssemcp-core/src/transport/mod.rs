//! HTTP channel abstraction
//!
//! The client talks to the server over two independent channels:
//!
//! - **Event stream**: a long-lived GET whose body carries responses and the
//!   session announcement
//! - **Message channel**: one POST per outbound envelope; only the status
//!   code of the reply matters
//!
//! [`HttpTransport`] is the production implementation. Tests plug in an
//! in-memory transport.

pub mod http;

pub use http::HttpTransport;

use crate::error::McpError;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// Raw body chunks of the event stream
pub type EventByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, McpError>> + Send>>;

/// Transport trait for the two HTTP channels
#[async_trait]
pub trait SseTransport: Send + Sync {
    /// Open the event stream at `url`
    async fn open_stream(&self, url: &str) -> Result<EventByteStream, McpError>;

    /// POST a JSON body to `url`, failing on network errors and non-success status
    async fn post_json(&self, url: &str, body: String) -> Result<(), McpError>;
}
