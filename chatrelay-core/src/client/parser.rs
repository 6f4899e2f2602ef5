//! Client-side event-stream parsing.
//!
//! The relay's body is split into events by `eventsource-stream`; each event
//! payload becomes at most one [`Delta`], and the stream stops after the
//! first terminal delta.

use bytes::Bytes;
use eventsource_stream::Eventsource;
use futures_util::stream::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::Value;

use crate::stream::{DONE_SENTINEL, Delta};

/// Fallback text for an in-band error that carries no message.
pub const STREAM_ERROR: &str = "Stream error";

#[derive(Debug, Deserialize)]
struct ChunkWire {
    #[serde(default)]
    choices: Vec<ChoiceWire>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChoiceWire {
    #[serde(default)]
    delta: Option<DeltaWire>,
}

#[derive(Debug, Deserialize)]
struct DeltaWire {
    #[serde(default)]
    content: Option<String>,
}

/// Interpret one event payload.
///
/// Returns `None` for chunks that carry no text (role-only deltas, empty
/// choices); the stream simply continues.
pub fn parse_payload(payload: &str) -> Option<Delta> {
    if payload.trim() == DONE_SENTINEL {
        return Some(Delta::terminal());
    }

    let chunk: ChunkWire = match serde_json::from_str(payload) {
        Ok(chunk) => chunk,
        Err(e) => return Some(Delta::error(format!("malformed stream chunk: {e}"))),
    };

    if let Some(err) = chunk.error.filter(is_set) {
        return Some(Delta::error(error_text(&err)));
    }

    let content = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta)
        .and_then(|d| d.content)
        .unwrap_or_default();
    if content.is_empty() {
        None
    } else {
        Some(Delta::fragment(content))
    }
}

/// `null` and `false` mean "no error".
fn is_set(err: &Value) -> bool {
    !matches!(err, Value::Null | Value::Bool(false))
}

/// Non-empty message of an `error` value: `error.message`, then the bare string.
pub(crate) fn message_of(err: &Value) -> Option<&str> {
    err.get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .or_else(|| err.as_str().filter(|m| !m.is_empty()))
}

fn error_text(err: &Value) -> String {
    message_of(err).unwrap_or(STREAM_ERROR).to_string()
}

/// Parse a raw response body into deltas.
///
/// A body that ends without a sentinel still ends with a terminal delta; a
/// transport failure ends with an error delta.
pub fn parse_stream<S, E>(body: S) -> impl Stream<Item = Delta> + Send + 'static
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    async_stream::stream! {
        let mut events = Box::pin(body.eventsource());

        while let Some(event) = events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    yield Delta::error(e.to_string());
                    return;
                }
            };
            if event.data.is_empty() {
                continue;
            }
            if let Some(delta) = parse_payload(&event.data) {
                let last = delta.ends_stream();
                yield delta;
                if last {
                    return;
                }
            }
        }
        // Body ended without a sentinel.
        yield Delta::terminal();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn deltas(body: &'static str) -> Vec<Delta> {
        let chunks = vec![Ok::<_, std::io::Error>(Bytes::from_static(body.as_bytes()))];
        parse_stream(futures_util::stream::iter(chunks))
            .collect()
            .await
    }

    #[test]
    fn payload_kinds() {
        assert_eq!(parse_payload("[DONE]"), Some(Delta::terminal()));
        assert_eq!(
            parse_payload(r#"{"choices":[{"delta":{"content":"Hi"}}]}"#),
            Some(Delta::fragment("Hi"))
        );
        assert_eq!(
            parse_payload(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#),
            None
        );
        assert_eq!(parse_payload(r#"{"choices":[]}"#), None);
        assert_eq!(
            parse_payload(r#"{"error":"socket closed"}"#),
            Some(Delta::error("socket closed"))
        );
        assert_eq!(
            parse_payload(r#"{"error":{"message":"quota"}}"#),
            Some(Delta::error("quota"))
        );
    }

    #[test]
    fn blank_error_falls_back_to_generic_message() {
        assert_eq!(
            parse_payload(r#"{"error":""}"#),
            Some(Delta::error(STREAM_ERROR))
        );
        assert_eq!(
            parse_payload(r#"{"error":{"message":""}}"#),
            Some(Delta::error(STREAM_ERROR))
        );
        assert_eq!(
            parse_payload(r#"{"error":{"code":7}}"#),
            Some(Delta::error(STREAM_ERROR))
        );
    }

    #[test]
    fn false_or_null_error_is_no_error() {
        assert_eq!(parse_payload(r#"{"error":false,"choices":[]}"#), None);
        assert_eq!(
            parse_payload(r#"{"error":null,"choices":[{"delta":{"content":"x"}}]}"#),
            Some(Delta::fragment("x"))
        );
    }

    #[test]
    fn malformed_payload_is_error() {
        let delta = parse_payload("not-json").unwrap();
        assert!(delta.ends_stream());
        assert!(delta.error.unwrap().starts_with("malformed stream chunk"));

        assert!(parse_payload("[1,2]").unwrap().error.is_some());
    }

    #[tokio::test]
    async fn comments_and_multiline_data_are_assembled() {
        let out = deltas(
            ": keep-alive\n\n\
             event: message\n\
             data: {\"choices\":[{\"delta\":\n\
             data: {\"content\":\"a\"}}]}\n\n\
             data: [DONE]\n\n",
        )
        .await;
        assert_eq!(out, vec![Delta::fragment("a"), Delta::terminal()]);
    }

    #[tokio::test]
    async fn stops_at_first_sentinel() {
        let out = deltas(
            "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n\
             data: [DONE]\n\ndata: [DONE]\n\n",
        )
        .await;
        assert_eq!(out, vec![Delta::fragment("a"), Delta::terminal()]);
    }

    #[tokio::test]
    async fn missing_sentinel_is_clean_end() {
        let out = deltas("data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n").await;
        assert_eq!(out, vec![Delta::fragment("a"), Delta::terminal()]);
    }

    #[tokio::test]
    async fn in_band_error_ends_stream() {
        let out = deltas(
            "data: {\"error\":\"upstream reset\"}\n\n\
             data: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n\n",
        )
        .await;
        assert_eq!(out, vec![Delta::error("upstream reset")]);

        let out = deltas("data: {\"error\":\"\"}\n\n").await;
        assert_eq!(out, vec![Delta::error(STREAM_ERROR)]);
    }

    #[tokio::test]
    async fn transport_failure_yields_error() {
        let chunks = vec![
            Ok(Bytes::from_static(b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n")),
            Err(std::io::Error::other("reset by peer")),
        ];
        let out: Vec<Delta> = parse_stream(futures_util::stream::iter(chunks))
            .collect()
            .await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], Delta::fragment("a"));
        assert!(out[1].error.as_deref().unwrap().contains("reset by peer"));
    }
}
