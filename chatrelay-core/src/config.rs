use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Upstream base URL of the default provider.
pub const NVIDIA_BASE_URL: &str = "https://integrate.api.nvidia.com";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerCfg {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerCfg {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ModelCfg {
    /// Upstream model id, without namespace prefix.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ProviderCfg {
    /// Registry key, e.g. "nvidia".
    pub name: String,
    /// Model prefix routed to this provider (without the trailing ':').
    /// Defaults to `name`.
    #[serde(default)]
    pub namespace: Option<String>,
    /// Human-readable provider label shown in the model catalog.
    #[serde(default)]
    pub display_name: Option<String>,
    pub base_url: String,
    /// Name of the environment variable that contains the API key.
    pub api_key_env: String,
    #[serde(default)]
    pub models: Vec<ModelCfg>,
}

impl ProviderCfg {
    pub fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct RoutingCfg {
    /// Provider that receives models without a known namespace prefix.
    /// When absent and exactly one provider is configured, that one is used.
    #[serde(default)]
    pub default: Option<String>,
}

/// Values applied to a completion request when the caller leaves them unset.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SamplingDefaults {
    #[serde(default = "default_stream")]
    pub stream: bool,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_top_p")]
    pub top_p: f64,
}

impl Default for SamplingDefaults {
    fn default() -> Self {
        Self {
            stream: default_stream(),
            temperature: default_temperature(),
            top_p: default_top_p(),
        }
    }
}

fn default_stream() -> bool {
    true
}
fn default_temperature() -> f64 {
    0.7
}
fn default_top_p() -> f64 {
    0.9
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct HttpCfg {
    /// TCP connect timeout in milliseconds (default 5000ms)
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Total request timeout in milliseconds. None = no timeout, so long
    /// streams are bounded only by caller cancellation.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
    /// Optional per-host idle connection pool cap (None = reqwest default)
    #[serde(default)]
    pub pool_max_idle_per_host: Option<usize>,
}

impl Default for HttpCfg {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: None,
            pool_max_idle_per_host: None,
        }
    }
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub server: ServerCfg,
    pub providers: Vec<ProviderCfg>,
    #[serde(default)]
    pub routing: RoutingCfg,
    #[serde(default)]
    pub defaults: SamplingDefaults,
    /// HTTP client configuration (timeouts, pooling). Missing → defaults.
    #[serde(default)]
    pub http: HttpCfg,
}

impl Config {
    /// Load a Config from a file path (JSON or TOML by extension). If the
    /// extension is missing or unrecognized, try JSON first, then TOML.
    pub fn from_path<P: AsRef<Path>>(path: P) -> crate::error::CoreResult<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(crate::error::RelayError::from)?;
        let s =
            std::str::from_utf8(&bytes).map_err(|e| crate::error::RelayError::Other(e.into()))?;
        let cfg: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str::<Self>(s)
                .map_err(|e| crate::error::RelayError::Other(e.into()))?,
            Some("toml") => toml::from_str::<Self>(s)
                .map_err(|e| crate::error::RelayError::Other(e.into()))?,
            _ => serde_json::from_str::<Self>(s)
                .map_err(|e| crate::error::RelayError::Other(e.into()))
                .or_else(|_| {
                    toml::from_str::<Self>(s)
                        .map_err(|e| crate::error::RelayError::Other(e.into()))
                })?,
        };
        Ok(cfg)
    }

    /// Single-provider deployment: NVIDIA's OpenAI-compatible endpoint.
    pub fn builtin() -> Self {
        let models = [
            (
                "moonshotai/kimi-k2-instruct-0905",
                "Kimi K2 Instruct",
                "Moonshot AI Kimi K2 model",
            ),
            (
                "deepseek-ai/deepseek-v3.1",
                "DeepSeek V3.1",
                "DeepSeek AI V3.1 model",
            ),
            (
                "bytedance/seed-oss-36b-instruct",
                "Seed OSS 36B",
                "ByteDance Seed OSS 36B Instruct",
            ),
            (
                "openai/gpt-oss-120b",
                "GPT OSS 120B",
                "OpenAI GPT OSS 120B model",
            ),
        ]
        .into_iter()
        .map(|(id, name, description)| ModelCfg {
            id: id.into(),
            name: name.into(),
            description: description.into(),
        })
        .collect();

        Self {
            server: ServerCfg::default(),
            providers: vec![ProviderCfg {
                name: "nvidia".into(),
                namespace: None,
                display_name: Some("NVIDIA".into()),
                base_url: NVIDIA_BASE_URL.into(),
                api_key_env: "NVIDIA_API_KEY".into(),
                models,
            }],
            routing: RoutingCfg {
                default: Some("nvidia".into()),
            },
            defaults: SamplingDefaults::default(),
            http: HttpCfg::default(),
        }
    }
}
