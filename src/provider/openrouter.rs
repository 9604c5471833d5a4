//! Remote-hosted provider backed by the OpenRouter chat completions API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::ProviderError;
use crate::provider::{ModelProvider, ModelResponse, debug_dump_prompt, debug_dump_response};

const API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Completion response shape, reduced to what the pipeline consumes.
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

pub struct OpenRouterProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    url: String,
}

impl OpenRouterProvider {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_key,
            model,
            url: API_URL.to_string(),
        }
    }

    /// Point the provider at a different endpoint. Used by tests.
    pub fn with_url(mut self, url: String) -> Self {
        self.url = url;
        self
    }

    fn classify_status(status: StatusCode, body: &str) -> ProviderError {
        let detail = if body.trim().is_empty() {
            status.to_string()
        } else {
            format!("{}: {}", status, body.trim())
        };
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Auth(detail),
            StatusCode::TOO_MANY_REQUESTS | StatusCode::PAYMENT_REQUIRED => {
                ProviderError::Quota(detail)
            }
            _ => ProviderError::Network(detail),
        }
    }
}

#[async_trait]
impl ModelProvider for OpenRouterProvider {
    fn name(&self) -> &'static str {
        "openrouter"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_local(&self) -> bool {
        false
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

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": user}));

        let body = json!({
            "model": self.model,
            "messages": messages,
        });

        debug!("Calling OpenRouter model {}", self.model);

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Network(format!("request timed out: {}", e))
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &body));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Network(format!("invalid response body: {}", e)))?;

        let raw_text = completion
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default();
        if raw_text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }

        if debug {
            debug_dump_response(self.name(), &raw_text);
        }

        let usage = completion.usage.unwrap_or_default();
        Ok(ModelResponse {
            raw_text,
            tokens_in: usage.prompt_tokens,
            tokens_out: usage.completion_tokens,
            provider: self.name().to_string(),
            model: self.model.clone(),
        })
    }
}
