//! Client for a running relay.

pub mod driver;
pub mod parser;

use futures_util::stream::Stream;
use serde_json::Value;

use crate::error::{CoreResult, RelayError};
use crate::http_client::{Accept, HttpClient};
use crate::model::{CompletionRequest, ModelInfo, ModelList};
use crate::stream::Delta;

const TARGET: &str = "relay";

#[derive(Debug, Clone)]
pub struct RelayClient {
    http: HttpClient,
    base: String,
}

impl RelayClient {
    /// Client for the relay at `base`, e.g. `http://localhost:3000`.
    pub fn new(base: impl Into<String>) -> CoreResult<Self> {
        Ok(Self::with_http(HttpClient::new_default()?, base))
    }

    pub fn with_http(http: HttpClient, base: impl Into<String>) -> Self {
        Self {
            http,
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    /// Open a streaming completion. Fails with the relay's status and body if
    /// the relay rejects the request.
    pub async fn open_stream(&self, request: &CompletionRequest) -> CoreResult<reqwest::Response> {
        let mut request = request.clone();
        request.stream = Some(true);
        self.http
            .post(
                TARGET,
                &self.url("/api/chat/completions"),
                &request,
                &[],
                Accept::EventStream,
            )
            .await
    }

    /// Streaming completion as deltas. The stream always ends with one
    /// terminal delta (possibly an error).
    pub async fn stream_deltas(
        &self,
        request: &CompletionRequest,
    ) -> CoreResult<impl Stream<Item = Delta> + Send + 'static> {
        let resp = self.open_stream(request).await?;
        Ok(parser::parse_stream(resp.bytes_stream()))
    }

    /// Non-streaming completion; returns the upstream JSON body.
    pub async fn complete(&self, request: &CompletionRequest) -> CoreResult<Value> {
        let mut request = request.clone();
        request.stream = Some(false);
        let resp = self
            .http
            .post(
                TARGET,
                &self.url("/api/chat/completions"),
                &request,
                &[],
                Accept::Json,
            )
            .await?;
        resp.json()
            .await
            .map_err(|e| RelayError::Decode(format!("json decode error: {e}")))
    }

    pub async fn list_models(&self) -> CoreResult<Vec<ModelInfo>> {
        let list: ModelList = self.http.get_json(TARGET, &self.url("/api/models")).await?;
        Ok(list.models)
    }
}

/// Message shown to users for a failed relay call.
///
/// For rejected requests this is the body's `error.message`, then `error`,
/// then `HTTP <status>`.
pub fn error_message(err: &RelayError) -> String {
    match err {
        RelayError::Upstream { status, body } => serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v.get("error").and_then(parser::message_of).map(str::to_string))
            .unwrap_or_else(|| format!("HTTP {status}")),
        other => other.to_string(),
    }
}
