//! Tracing conventions for the relay.
//!
//! Every relayed request runs inside a `relay.chat` span whose fields use the
//! names in [`keys`]. Span fields are declared up front as `Empty` and filled
//! in once known, so subscribers always see the same shape.

pub mod keys;
#[cfg(test)]
pub mod test_span;

pub use keys::*;

/// Name of the per-request span opened by the relay endpoint.
pub const RELAY_SPAN: &str = "relay.chat";
