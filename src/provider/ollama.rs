//! Local-inference provider backed by an Ollama endpoint.
//!
//! Talks to localhost (or another configured host) with no credential;
//! change material never leaves the machine, which is why the pipeline
//! skips summarization for this provider.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::ProviderError;
use crate::provider::{ModelProvider, ModelResponse, debug_dump_prompt, debug_dump_response};

pub const DEFAULT_HOST: &str = "http://localhost:11434";

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    prompt_eval_count: u64,
    #[serde(default)]
    eval_count: u64,
}

pub struct OllamaProvider {
    client: reqwest::Client,
    host: String,
    model: String,
}

impl OllamaProvider {
    pub fn new(host: String, model: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            model,
        }
    }
}

#[async_trait]
impl ModelProvider for OllamaProvider {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_local(&self) -> bool {
        true
    }

    async fn generate(
        &self,
        system: Option<&str>,
        user: &str,
        debug: bool,
    ) -> Result<ModelResponse, ProviderError> {
        if debug {
            debug_dump_prompt(self.name(), system, user);
        }

        let body = json!({
            "model": self.model,
            "system": system.unwrap_or(""),
            "prompt": user,
            "stream": false,
        });

        debug!("Calling Ollama model {} at {}", self.model, self.host);

        let response = self
            .client
            .post(format!("{}/api/generate", self.host))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Network(format!("request timed out: {}", e))
                } else {
                    ProviderError::Network(format!(
                        "cannot reach Ollama at {}: {}",
                        self.host, e
                    ))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Network(format!("{}: {}", status, body.trim())));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Network(format!("invalid response body: {}", e)))?;

        if generated.response.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }

        if debug {
            debug_dump_response(self.name(), &generated.response);
        }

        Ok(ModelResponse {
            raw_text: generated.response,
            tokens_in: generated.prompt_eval_count,
            tokens_out: generated.eval_count,
            provider: self.name().to_string(),
            model: self.model.clone(),
        })
    }
}
