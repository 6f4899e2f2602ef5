use async_trait::async_trait;

use crate::error::CoreResult;
use crate::model::{ModelInfo, UpstreamPayload};

/// An upstream completion provider addressed by a model namespace prefix.
///
/// Implementations own their endpoint and credential; the relay only hands
/// them a normalized payload and relays whatever response comes back.
#[async_trait]
pub trait UpstreamProvider: Send + Sync {
    /// Registry key, e.g. "nvidia".
    fn name(&self) -> &str;

    /// Model prefix (without ':') that routes to this provider.
    fn namespace(&self) -> &str;

    /// Static catalog entries, ids already namespaced.
    fn models(&self) -> &[ModelInfo];

    /// Issue exactly one upstream call. Returns the successful response with
    /// its body unread; dispatch failures and non-success statuses are errors.
    async fn dispatch(&self, payload: &UpstreamPayload) -> CoreResult<reqwest::Response>;
}
