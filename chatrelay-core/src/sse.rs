//! Upstream event-stream normalizer.
//!
//! Re-frames a provider's `text/event-stream` body into the relay's own
//! outbound events: `data: ` markers are stripped, unmarked non-blank lines
//! pass through verbatim, blank separators are dropped, and a single
//! `[DONE]` sentinel closes every stream that ends normally. A read failure
//! produces one `{"error": ...}` event and ends the stream without a sentinel.

use bytes::Bytes;
use futures_util::stream::{Stream, StreamExt};

use crate::frame::FrameDecoder;
use crate::stream::StreamEvent;

/// Marker prefixed to every payload line by the upstream.
pub const DATA_MARKER: &str = "data: ";

/// Map one decoded upstream line to an outbound payload, or `None` for
/// record separators.
pub fn payload_of(line: &str) -> Option<String> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.trim().is_empty() {
        return None;
    }
    let payload = line.strip_prefix(DATA_MARKER).unwrap_or(line);
    // Stray carriage returns cannot be carried inside an SSE field.
    Some(payload.replace('\r', ""))
}

/// Normalize an upstream byte stream into outbound events.
///
/// Each upstream chunk is fully forwarded before the next one is read; the
/// returned stream is lazy and only pulls from `upstream` when polled.
pub fn normalize<S, E>(upstream: S) -> impl Stream<Item = StreamEvent> + Send + 'static
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    async_stream::stream! {
        let mut upstream = Box::pin(upstream);
        let mut decoder = FrameDecoder::new();

        while let Some(chunk) = upstream.next().await {
            match chunk {
                Ok(chunk) => {
                    for line in decoder.decode(&chunk) {
                        if let Some(payload) = payload_of(&line) {
                            yield StreamEvent::new(payload);
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "upstream stream failed mid-flight");
                    yield StreamEvent::error(e);
                    return;
                }
            }
        }

        if let Some(payload) = decoder.finish().as_deref().and_then(payload_of) {
            yield StreamEvent::new(payload);
        }
        yield StreamEvent::done();
    }
}
