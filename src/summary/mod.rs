//! Optional change summarization before material leaves the machine.
//!
//! Summarization is a privacy optimization, not a dependency: any failure
//! here falls back to the raw change set. The pipeline never invokes it
//! when the commit-generation provider is local-inference.

use tracing::warn;

use crate::changes::ChangeSet;
use crate::prompt::build_summary_prompt;
use crate::provider::{ModelProvider, ModelResponse, generate_with_retry};

/// A natural-language digest of a change set.
#[derive(Debug, Clone)]
pub struct Summary {
    pub text: String,
    pub source_change_count: usize,
}

/// Summarize a change set with the configured summarizer provider.
///
/// Returns the summary together with the raw response so the caller can
/// record its token usage. `None` means the caller should fall back to
/// the raw change set.
pub async fn summarize_changes(
    provider: &dyn ModelProvider,
    set: &ChangeSet,
    brief: Option<&str>,
    debug: bool,
) -> Option<(Summary, ModelResponse)> {
    let prompt = build_summary_prompt(&set.render_for_prompt(), brief);

    match generate_with_retry(provider, None, &prompt, debug).await {
        Ok(response) => {
            let summary = Summary {
                text: response.raw_text.trim().to_string(),
                source_change_count: set.len(),
            };
            Some((summary, response))
        }
        Err(e) => {
            warn!(
                "Summarization with {} failed, using raw changes: {}",
                provider.name(),
                e
            );
            None
        }
    }
}
