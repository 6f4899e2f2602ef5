use std::{collections::HashMap, sync::Arc};

use secrecy::SecretString;

use crate::config::Config;
use crate::error::{CoreResult, RelayError};
use crate::http_client::HttpClient;
use crate::model::ModelInfo;
use crate::provider::UpstreamProvider;
use crate::providers::openai::OpenAiCompatible;

/// Registry of upstream providers keyed by model namespace.
///
/// A model id `ns:rest` routes to the provider registered under `ns` with
/// exactly that one prefix stripped. Ids without a registered prefix go to
/// the default provider unchanged.
pub struct ProviderRegistry {
    by_namespace: HashMap<String, Arc<dyn UpstreamProvider>>,
    order: Vec<String>, // namespaces in registration order, for the catalog
    default: Option<String>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            by_namespace: HashMap::new(),
            order: Vec::new(),
            default: None,
        }
    }

    /// Build a registry from configuration, reading credentials from the
    /// process environment.
    pub fn from_config(cfg: &Config) -> CoreResult<Self> {
        Self::from_config_with(cfg, |var| std::env::var(var).ok())
    }

    /// Like `from_config`, with an explicit credential lookup.
    pub fn from_config_with<F>(cfg: &Config, lookup: F) -> CoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let http = HttpClient::new(&cfg.http)?;
        let mut reg = Self::new();
        for p in &cfg.providers {
            let key = lookup(&p.api_key_env)
                .ok_or_else(|| RelayError::MissingCredential(p.api_key_env.clone()))?;
            let provider = OpenAiCompatible::from_config(http.clone(), p, SecretString::from(key));
            reg.register(Arc::new(provider))?;
        }

        match &cfg.routing.default {
            Some(name) => reg.set_default(name)?,
            None if cfg.providers.len() == 1 => {
                let ns = cfg.providers[0].namespace().to_string();
                reg.default = Some(ns);
            }
            None => {}
        }
        Ok(reg)
    }

    /// Add a provider under its namespace.
    pub fn register(&mut self, provider: Arc<dyn UpstreamProvider>) -> CoreResult<()> {
        let ns = provider.namespace().to_string();
        if ns.is_empty() || ns.contains(':') {
            return Err(RelayError::Validation(format!(
                "invalid provider namespace '{ns}'"
            )));
        }
        if self.by_namespace.contains_key(&ns) {
            return Err(RelayError::Validation(format!(
                "duplicate provider namespace '{ns}'"
            )));
        }
        tracing::debug!(provider = provider.name(), namespace = %ns, "registered provider");
        self.order.push(ns.clone());
        self.by_namespace.insert(ns, provider);
        Ok(())
    }

    /// Route unprefixed models to the provider named (or namespaced) `name`.
    pub fn set_default(&mut self, name: &str) -> CoreResult<()> {
        let ns = self
            .by_namespace
            .iter()
            .find(|(ns, p)| ns.as_str() == name || p.name() == name)
            .map(|(ns, _)| ns.clone())
            .ok_or_else(|| {
                RelayError::Validation(format!("default provider '{name}' is not configured"))
            })?;
        self.default = Some(ns);
        Ok(())
    }

    /// Resolve a client model id to its provider and the upstream model id.
    pub fn resolve<'m>(&self, model: &'m str) -> CoreResult<(Arc<dyn UpstreamProvider>, &'m str)> {
        if let Some((ns, rest)) = model.split_once(':')
            && let Some(p) = self.by_namespace.get(ns)
        {
            return Ok((p.clone(), rest));
        }
        self.default
            .as_ref()
            .and_then(|ns| self.by_namespace.get(ns))
            .map(|p| (p.clone(), model))
            .ok_or_else(|| {
                RelayError::Validation(format!("no provider configured for model '{model}'"))
            })
    }

    /// Get a provider by namespace.
    pub fn get(&self, namespace: &str) -> Option<Arc<dyn UpstreamProvider>> {
        self.by_namespace.get(namespace).cloned()
    }

    /// Catalog across all providers, in registration order.
    pub fn catalog(&self) -> Vec<ModelInfo> {
        self.order
            .iter()
            .filter_map(|ns| self.by_namespace.get(ns))
            .flat_map(|p| p.models().iter().cloned())
            .collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
