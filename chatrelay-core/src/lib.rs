//! Streaming chat-completion relay.
//!
//! The relay accepts OpenAI-style chat requests, forwards them to a
//! configured upstream and re-streams the answer as its own event stream.
//! The [`client`] module consumes that stream on the other side.

pub mod client;
pub mod config;
pub mod error;
pub mod frame;
pub mod http_client;
pub mod model;
pub mod normalizer;
pub mod provider;
pub mod provider_factory;
pub mod providers;
pub mod relay;
pub mod sse;
pub mod stream;
pub mod telemetry;

pub use error::{CoreResult, RelayError};
