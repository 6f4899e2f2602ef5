use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::config::ProviderCfg;
use crate::error::CoreResult;
use crate::http_client::{Accept, HttpClient};
use crate::model::{ModelInfo, UpstreamPayload};
use crate::provider::UpstreamProvider;

/// Any upstream speaking the OpenAI chat-completions wire format
/// (`POST {base}/v1/chat/completions`, bearer auth).
#[derive(Debug, Clone)]
pub struct OpenAiCompatible {
    http: HttpClient,
    name: String,
    namespace: String,
    base: String,
    api_key: SecretString,
    models: Vec<ModelInfo>,
}

impl OpenAiCompatible {
    pub fn new(
        http: HttpClient,
        name: impl Into<String>,
        namespace: impl Into<String>,
        base: impl Into<String>,
        api_key: SecretString,
    ) -> Self {
        Self {
            http,
            name: name.into(),
            namespace: namespace.into(),
            base: base.into(),
            api_key,
            models: Vec::new(),
        }
    }

    pub fn from_config(http: HttpClient, cfg: &ProviderCfg, api_key: SecretString) -> Self {
        let label = cfg.display_name.clone().unwrap_or_else(|| cfg.name.clone());
        let models = cfg
            .models
            .iter()
            .map(|m| ModelInfo {
                id: format!("{}:{}", cfg.namespace(), m.id),
                name: m.name.clone(),
                provider: label.clone(),
                description: m.description.clone(),
            })
            .collect();
        Self {
            models,
            ..Self::new(http, &cfg.name, cfg.namespace(), &cfg.base_url, api_key)
        }
    }

    #[cfg(test)]
    pub fn new_for_tests(server_base: &str) -> Self {
        OpenAiCompatible::new(
            HttpClient::new_default().unwrap(),
            "nvidia",
            "nvidia",
            server_base,
            SecretString::from("test-key".to_string()),
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base.trim_end_matches('/'))
    }
}

#[async_trait]
impl UpstreamProvider for OpenAiCompatible {
    fn name(&self) -> &str {
        &self.name
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn models(&self) -> &[ModelInfo] {
        &self.models
    }

    async fn dispatch(&self, payload: &UpstreamPayload) -> CoreResult<reqwest::Response> {
        let auth = format!("Bearer {}", self.api_key.expose_secret());
        let headers = [
            ("Authorization", auth.as_str()),
            ("Content-Type", "application/json"),
        ];
        tracing::info!(
            provider = %self.name,
            model = %payload.model,
            stream = payload.stream,
            "dispatching upstream request"
        );
        self.http
            .post(
                &self.name,
                &self.endpoint(),
                payload,
                &headers,
                Accept::for_stream(payload.stream),
            )
            .await
    }
}
