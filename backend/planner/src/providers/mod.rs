pub mod anthropic;
pub mod mock;
pub mod ollama;
pub mod openai;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use canvaspilot_core::{AdapterError, LlmProvider};
use canvaspilot_logging::redact_sensitive_data;

pub use anthropic::AnthropicProvider;
pub use mock::MockProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

/// Name of the scripted adapter that is always available.
pub const MOCK_PROVIDER: &str = "mock";

/// Default per-request HTTP timeout for network adapters.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(25);

/// Registry of LLM providers, looked up by configured name.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Registry holding the configured adapter under its kind, plus the
    /// offline `mock` adapter.
    pub fn from_settings(settings: &ProviderSettings) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(settings.kind.clone(), build_provider(settings)?);
        if registry.get(MOCK_PROVIDER).is_none() {
            registry.register(MOCK_PROVIDER, Arc::new(MockProvider::new(MOCK_PROVIDER)));
        }
        Ok(registry)
    }

    /// Register a provider under a name. A later registration replaces it.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn LlmProvider>) {
        self.providers.insert(name.into(), provider);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn LlmProvider>> {
        self.providers.get(name).cloned()
    }

    /// Look up a provider, failing with the registered names when absent.
    pub fn select(&self, name: &str) -> Result<Arc<dyn LlmProvider>> {
        self.get(name).with_context(|| {
            format!(
                "provider '{name}' is not registered (available: {})",
                self.list().join(", ")
            )
        })
    }

    /// Get all registered provider names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Connection settings for one network adapter.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub kind: String,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub request_timeout: Duration,
}

impl ProviderSettings {
    pub fn new(kind: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            model: model.into(),
            api_key: None,
            base_url: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Build the adapter named by `settings.kind`.
///
/// A missing API key is not an error here: the adapter reports
/// `MissingCredential` on its first call.
pub fn build_provider(settings: &ProviderSettings) -> Result<Arc<dyn LlmProvider>> {
    let provider: Arc<dyn LlmProvider> = match settings.kind.as_str() {
        "anthropic" => {
            let mut p = AnthropicProvider::new(settings.api_key.clone(), &settings.model)
                .with_timeout(settings.request_timeout);
            if let Some(url) = &settings.base_url {
                p = p.with_base_url(url);
            }
            Arc::new(p)
        }
        "openai" | "openrouter" => {
            let mut p = OpenAiProvider::new(settings.api_key.clone(), &settings.model)
                .with_timeout(settings.request_timeout);
            if let Some(url) = &settings.base_url {
                p = p.with_base_url(url);
            } else if settings.kind == "openrouter" {
                p = p.with_base_url(openai::OPENROUTER_BASE_URL);
            }
            Arc::new(p)
        }
        "ollama" => {
            let mut p = OllamaProvider::new(&settings.model).with_timeout(settings.request_timeout);
            if let Some(url) = &settings.base_url {
                p = p.with_base_url(url);
            }
            Arc::new(p)
        }
        MOCK_PROVIDER => Arc::new(MockProvider::new(MOCK_PROVIDER)),
        other => bail!("unknown provider '{other}'"),
    };
    info!(provider = %settings.kind, model = %settings.model, "Provider configured");
    Ok(provider)
}

pub(crate) fn http_client(timeout: Duration) -> Client {
    Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
        warn!(error = %e, "Falling back to default HTTP client");
        Client::new()
    })
}

pub(crate) fn require_key(provider: &str, key: &Option<String>) -> Result<String, AdapterError> {
    match key.as_deref().map(str::trim) {
        Some(k) if !k.is_empty() => Ok(k.to_string()),
        _ => Err(AdapterError::MissingCredential(provider.to_string())),
    }
}

pub(crate) fn transport_error(provider: &str, err: reqwest::Error) -> AdapterError {
    let reason = if err.is_timeout() {
        format!("{provider} request timed out")
    } else if err.is_connect() {
        format!("could not connect to {provider}: {err}")
    } else {
        format!("{provider} request failed: {err}")
    };
    AdapterError::TransportFailure(reason)
}

/// Check the status, then decode the body. Error bodies are redacted.
pub(crate) async fn decode_response<T: DeserializeOwned>(
    provider: &str,
    response: Response,
) -> Result<T, AdapterError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let body = redact_sensitive_data(&body);
        warn!(provider = %provider, status = status.as_u16(), body = %body, "Provider returned error status");
        return Err(AdapterError::UpstreamError {
            status: status.as_u16(),
            body,
        });
    }

    let text = response
        .text()
        .await
        .map_err(|e| transport_error(provider, e))?;
    serde_json::from_str(&text)
        .map_err(|e| AdapterError::MalformedResponse(format!("{provider}: {e}")))
}
