//! Streaming primitives shared by the relay and the client.
//!
//! Contract:
//! - The relay emits 0..n payload events followed by exactly one terminal event:
//!   the `[DONE]` sentinel at normal end, or a single `{"error": ...}` event.
//! - A duplicated sentinel is legal; consumers stop at the first one.
//! - On the client side a `Delta` is terminal when `is_terminal` is set or an
//!   error is present. After a terminal delta no further deltas are produced.

/// In-band end-of-stream marker.
pub const DONE_SENTINEL: &str = "[DONE]";

/// One outbound event: an opaque payload line, marker already stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    pub payload: String,
}

impl StreamEvent {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    pub fn done() -> Self {
        Self::new(DONE_SENTINEL)
    }

    /// Structured in-band error, implicitly terminal.
    pub fn error(message: impl std::fmt::Display) -> Self {
        let body = serde_json::json!({ "error": message.to_string() });
        Self::new(body.to_string())
    }

    pub fn is_done(&self) -> bool {
        self.payload == DONE_SENTINEL
    }
}

/// Parsed result of one event payload on the client side.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Delta {
    pub content: String,
    pub is_terminal: bool,
    pub error: Option<String>,
}

impl Delta {
    pub fn fragment(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn terminal() -> Self {
        Self {
            is_terminal: true,
            ..Default::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Returns true if no further deltas follow this one.
    pub fn ends_stream(&self) -> bool {
        self.is_terminal || self.error.is_some()
    }
}
