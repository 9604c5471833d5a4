//! Model provider abstraction and selection.
//!
//! Two variants exist: a remote-hosted API provider (OpenRouter) and a
//! local-inference provider (Ollama). They differ only in transport and
//! credential shape; the pipeline talks to both through [`ModelProvider`].

pub mod ollama;
pub mod openrouter;
pub mod retry;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

pub use ollama::OllamaProvider;
pub use openrouter::OpenRouterProvider;
pub use retry::generate_with_retry;

/// A raw model reply with token accounting.
#[derive(Debug, Clone)]
pub struct ModelResponse {
    pub raw_text: String,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub provider: String,
    pub model: String,
}

/// The supported provider kinds, selected by configuration value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenRouter,
    Ollama,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenRouter => "openrouter",
            ProviderKind::Ollama => "ollama",
        }
    }

    /// Local-inference providers run without network egress beyond
    /// localhost and carry no credential.
    pub fn is_local(&self) -> bool {
        matches!(self, ProviderKind::Ollama)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The capability every language-model backend implements.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider identifier used in usage records (e.g. "openrouter").
    fn name(&self) -> &'static str;

    /// Model identifier used in usage records.
    fn model(&self) -> &str;

    /// Whether this provider runs inference locally. Local providers
    /// never get summarized change material (there is nothing to keep
    /// on-device that is not already on-device).
    fn is_local(&self) -> bool;

    /// Generate a completion for the given system/user prompt parts.
    ///
    /// With `debug` set, the fully rendered prompt and the raw reply are
    /// printed to stderr; control flow is unchanged.
    async fn generate(
        &self,
        system: Option<&str>,
        user: &str,
        debug: bool,
    ) -> Result<ModelResponse, ProviderError>;
}

/// Build a provider from its config spec.
pub fn build_provider(
    spec: &crate::config::ProviderSpec,
    timeout: Duration,
) -> Result<Box<dyn ModelProvider>, crate::error::ConfigError> {
    match spec.kind {
        ProviderKind::OpenRouter => {
            let api_key = spec
                .api_key
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .ok_or(crate::error::ConfigError::MissingValue("api_key"))?;
            Ok(Box::new(OpenRouterProvider::new(
                api_key.to_string(),
                spec.model.clone(),
                timeout,
            )))
        }
        ProviderKind::Ollama => {
            let host = spec
                .host
                .as_deref()
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .unwrap_or(ollama::DEFAULT_HOST);
            Ok(Box::new(OllamaProvider::new(
                host.to_string(),
                spec.model.clone(),
                timeout,
            )))
        }
    }
}

/// Print the rendered prompt before a call, when debug mode is on.
pub(crate) fn debug_dump_prompt(provider: &str, system: Option<&str>, user: &str) {
    eprintln!("--- [{}] prompt ---", provider);
    if let Some(system) = system {
        eprintln!("{}\n", system);
    }
    eprintln!("{}\n--- end of prompt ---", user);
}

/// Print the raw model reply, when debug mode is on.
pub(crate) fn debug_dump_response(provider: &str, raw: &str) {
    eprintln!("--- [{}] raw response ---\n{}\n--- end of response ---", provider, raw);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_locality() {
        assert!(ProviderKind::Ollama.is_local());
        assert!(!ProviderKind::OpenRouter.is_local());
    }

    #[test]
    fn test_kind_display_matches_config_value() {
        assert_eq!(ProviderKind::OpenRouter.to_string(), "openrouter");
        assert_eq!(ProviderKind::Ollama.to_string(), "ollama");
    }

    #[test]
    fn test_kind_deserializes_from_lowercase() {
        let kind: ProviderKind = serde_json::from_str("\"ollama\"").unwrap();
        assert_eq!(kind, ProviderKind::Ollama);
    }
}
