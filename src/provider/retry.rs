//! Single fixed-backoff retry for transient provider failures.
//!
//! Network-class errors (including timeouts) get exactly one retry after
//! a short fixed delay; auth and quota failures are not self-correcting
//! and surface immediately.

use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use tracing::warn;

use crate::error::ProviderError;
use crate::provider::{ModelProvider, ModelResponse};

/// Total attempts: the first call plus one retry.
pub const MAX_ATTEMPTS: u32 = 2;
const RETRY_INTERVAL_SECS: u64 = 2;

fn fixed_backoff() -> ExponentialBackoff {
    // Multiplier 1.0 turns the exponential schedule into a fixed delay.
    ExponentialBackoff {
        initial_interval: Duration::from_secs(RETRY_INTERVAL_SECS),
        multiplier: 1.0,
        randomization_factor: 0.0,
        max_elapsed_time: None,
        ..Default::default()
    }
}

/// Call the provider, retrying once on a network-class failure.
pub async fn generate_with_retry(
    provider: &dyn ModelProvider,
    system: Option<&str>,
    user: &str,
    debug: bool,
) -> Result<ModelResponse, ProviderError> {
    let mut backoff = fixed_backoff();
    let mut attempts = 0;

    loop {
        attempts += 1;
        match provider.generate(system, user, debug).await {
            Ok(response) => return Ok(response),
            Err(e) if e.is_retryable() && attempts < MAX_ATTEMPTS => {
                warn!(
                    "Provider {} failed ({}), retrying once",
                    provider.name(),
                    e
                );
                if let Some(wait) = backoff.next_backoff() {
                    tokio::time::sleep(wait).await;
                }
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails with the given error class a set number of times, then succeeds.
    struct FlakyProvider {
        failures: u32,
        calls: AtomicU32,
        error: fn() -> ProviderError,
    }

    #[async_trait]
    impl ModelProvider for FlakyProvider {
        fn name(&self) -> &'static str {
            "flaky"
        }

        fn model(&self) -> &str {
            "test"
        }

        fn is_local(&self) -> bool {
            false
        }

        async fn generate(
            &self,
            _system: Option<&str>,
            _user: &str,
            _debug: bool,
        ) -> Result<ModelResponse, ProviderError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err((self.error)())
            } else {
                Ok(ModelResponse {
                    raw_text: "chore: ok".to_string(),
                    tokens_in: 1,
                    tokens_out: 1,
                    provider: "flaky".to_string(),
                    model: "test".to_string(),
                })
            }
        }
    }

    fn network_error() -> ProviderError {
        ProviderError::Network("connection reset".to_string())
    }

    fn auth_error() -> ProviderError {
        ProviderError::Auth("bad key".to_string())
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_error_is_retried_once() {
        let provider = FlakyProvider {
            failures: 1,
            calls: AtomicU32::new(0),
            error: network_error,
        };
        let result = generate_with_retry(&provider, None, "p", false).await;
        assert!(result.is_ok());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_network_failure_surfaces() {
        let provider = FlakyProvider {
            failures: 2,
            calls: AtomicU32::new(0),
            error: network_error,
        };
        let result = generate_with_retry(&provider, None, "p", false).await;
        assert!(matches!(result, Err(ProviderError::Network(_))));
        assert_eq!(provider.calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_error_is_not_retried() {
        let provider = FlakyProvider {
            failures: 1,
            calls: AtomicU32::new(0),
            error: auth_error,
        };
        let result = generate_with_retry(&provider, None, "p", false).await;
        assert!(matches!(result, Err(ProviderError::Auth(_))));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }
}
