//! HTTP transport built on reqwest
//!
//! The event stream is read with `bytes_stream()`; the client never sets an
//! overall request timeout because the stream stays open for the whole
//! session.

use super::{EventByteStream, SseTransport};
use crate::config::ClientConfig;
use crate::error::McpError;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;
use tracing::{debug, warn};

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport from the client configuration
    pub fn new(config: &ClientConfig) -> Result<Self, McpError> {
        let mut header_map = HeaderMap::new();
        for (key, value) in &config.headers {
            match (HeaderName::try_from(key), HeaderValue::try_from(value)) {
                (Ok(name), Ok(val)) => {
                    header_map.insert(name, val);
                }
                _ => warn!("Skipping invalid header '{}'", key),
            }
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .default_headers(header_map)
            .build()
            .map_err(|e| McpError::connection(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl SseTransport for HttpTransport {
    async fn open_stream(&self, url: &str) -> Result<EventByteStream, McpError> {
        let response = self
            .client
            .get(url)
            .header(CACHE_CONTROL, "no-cache")
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| {
                McpError::connection(format!("Failed to connect to event stream: {}", e))
                    .with_context(format!("GET {}", url))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(McpError::http_status(status.as_u16()).with_context(format!(
                "GET {}: {}",
                url,
                status.canonical_reason().unwrap_or("unknown status")
            )));
        }

        debug!("Event stream open: {}", url);

        let stream = response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|e| McpError::connection(format!("Event stream error: {}", e)))
        });
        Ok(Box::pin(stream))
    }

    async fn post_json(&self, url: &str, body: String) -> Result<(), McpError> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| McpError::connection(e.to_string()).with_context(format!("POST {}", url)))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(McpError::http_status(status.as_u16()).with_context(format!("POST {}", url)))
        }
    }
}
