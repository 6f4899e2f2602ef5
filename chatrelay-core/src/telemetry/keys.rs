/// Span/Log attribute keys for relayed completions.
/// Keep these stable; changing them is a breaking change for dashboards.
pub const KEY_PROVIDER: &str = "relay.provider";
pub const KEY_MODEL: &str = "relay.model";
pub const KEY_UPSTREAM_MODEL: &str = "relay.upstream_model";
pub const KEY_STREAM: &str = "relay.stream";
pub const KEY_UPSTREAM_STATUS: &str = "upstream.status";
pub const KEY_EVENTS: &str = "stream.events";

/// Error-related (if applicable)
pub const KEY_ERROR_KIND: &str = "error.kind";
