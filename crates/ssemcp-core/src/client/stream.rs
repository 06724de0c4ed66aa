//! Background reader for the event stream

use super::ClientInner;
use crate::decoder::{Frame, FrameDecoder};
use crate::session::{ConnectionState, extract_session_id};
use crate::transport::EventByteStream;
use futures::StreamExt;
use std::sync::Weak;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

/// Decode the stream and route frames until it ends
///
/// The session id from the first endpoint frame is handed to the connecting
/// caller through `session_tx`; the handshake itself runs on the caller's
/// task so this loop keeps routing responses while it is in flight.
pub(super) async fn run_event_stream(
    client: Weak<ClientInner>,
    mut byte_stream: EventByteStream,
    generation: u64,
    session_tx: oneshot::Sender<String>,
) {
    let mut decoder = FrameDecoder::new();
    let mut session_tx = Some(session_tx);

    while let Some(chunk) = byte_stream.next().await {
        let Some(inner) = client.upgrade() else {
            debug!("Client dropped, stopping event stream");
            return;
        };

        match chunk {
            Ok(bytes) => {
                for frame in decoder.feed(&bytes) {
                    inner.handle_frame(frame, generation, &mut session_tx);
                }
            }
            Err(e) => {
                error!("Event stream error: {}", e);
                inner.end_session(generation);
                return;
            }
        }
    }

    info!("Event stream ended");
    if decoder.has_remaining() {
        debug!("Discarding incomplete line: {:?}", decoder.remaining());
    }
    if let Some(inner) = client.upgrade() {
        inner.end_session(generation);
    }
}

impl ClientInner {
    /// Dispatch one decoded frame
    fn handle_frame(
        &self,
        frame: Frame,
        generation: u64,
        session_tx: &mut Option<oneshot::Sender<String>>,
    ) {
        if frame.is_endpoint() {
            self.handle_endpoint(&frame.data, generation, session_tx);
        } else if frame.is_message() {
            self.pending.dispatch(&frame.data);
        } else {
            debug!("Ignoring '{}' event", frame.event);
        }
    }

    /// Record the announced session and wake the connecting caller
    fn handle_endpoint(
        &self,
        data: &str,
        generation: u64,
        session_tx: &mut Option<oneshot::Sender<String>>,
    ) {
        let Some(session_id) = extract_session_id(data) else {
            warn!("Endpoint event without a session id: {}", data);
            return;
        };

        let Some(tx) = session_tx.take() else {
            debug!("Ignoring repeated endpoint event ({})", session_id);
            return;
        };

        let accepted = self.state.send_if_modified(|state| {
            if self.is_current(generation) && matches!(state, ConnectionState::Connecting) {
                *state = ConnectionState::Handshaking {
                    session_id: session_id.clone(),
                };
                true
            } else {
                false
            }
        });

        if !accepted {
            debug!("Endpoint event for a superseded connect ({})", session_id);
            return;
        }

        if tx.send(session_id).is_err() {
            warn!("Connecting caller went away before the session was announced");
        }
    }
}
