//! End-to-end commit flow against real temporary repositories.

mod common;

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use common::TestRepo;
use scriba::error::ProviderError;
use scriba::message::{CommitMessage, CommitType};
use scriba::pipeline::{CommitContext, CommitMode, CommitOptions, CommitOutcome, run_commit};
use scriba::provider::{ModelProvider, ModelResponse};
use scriba::session::{Decision, Interact};
use scriba::usage::MemoryUsageStore;

/// Replays fixed replies and optionally asserts on the prompt it sees.
struct ScriptProvider {
    replies: Mutex<VecDeque<&'static str>>,
    reject_user_contains: Option<&'static str>,
}

impl ScriptProvider {
    fn new(replies: &[&'static str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().copied().collect()),
            reject_user_contains: None,
        }
    }
}

#[async_trait]
impl ModelProvider for ScriptProvider {
    fn name(&self) -> &'static str {
        "script"
    }

    fn model(&self) -> &str {
        "test-model"
    }

    fn is_local(&self) -> bool {
        // Local keeps the pipeline on raw change material, which is what
        // the prompt assertions inspect.
        true
    }

    async fn generate(
        &self,
        _system: Option<&str>,
        user: &str,
        _debug: bool,
    ) -> Result<ModelResponse, ProviderError> {
        if let Some(needle) = self.reject_user_contains {
            assert!(
                !user.contains(needle),
                "prompt must not mention {:?}",
                needle
            );
        }
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("provider called more times than scripted");
        Ok(ModelResponse {
            raw_text: reply.to_string(),
            tokens_in: 8,
            tokens_out: 4,
            provider: "script".to_string(),
            model: "test-model".to_string(),
        })
    }
}

struct ScriptInteract {
    decisions: VecDeque<Decision>,
    composed: VecDeque<Option<CommitMessage>>,
}

impl ScriptInteract {
    fn new(decisions: &[Decision]) -> Self {
        Self {
            decisions: decisions.iter().copied().collect(),
            composed: VecDeque::new(),
        }
    }

    fn with_composed(mut self, messages: &[Option<CommitMessage>]) -> Self {
        self.composed = messages.iter().cloned().collect();
        self
    }
}

impl Interact for ScriptInteract {
    fn review(&mut self, _rendered: &str) -> Decision {
        self.decisions.pop_front().expect("unexpected review call")
    }

    fn compose(&mut self, _current: Option<&CommitMessage>) -> Option<CommitMessage> {
        self.composed.pop_front().expect("unexpected compose call")
    }

    fn ask_brief(&mut self) -> Option<String> {
        None
    }
}

fn context<'a>(
    provider: Option<&'a dyn ModelProvider>,
    usage: &'a MemoryUsageStore,
) -> CommitContext<'a> {
    CommitContext {
        provider,
        summarizer: None,
        usage,
        device_id: "itest-device",
        title_max: 72,
        max_regenerations: 3,
    }
}

#[tokio::test]
async fn test_manual_commit_end_to_end() {
    let repo = TestRepo::new();
    repo.write_file("src/api.rs", "pub fn endpoint() {}\n");

    let usage = MemoryUsageStore::new();
    let ctx = context(None, &usage);

    let composed = CommitMessage {
        commit_type: CommitType::Feat,
        scope: Some("api".to_string()),
        title: "Add new endpoint".to_string(),
        description: None,
    };
    let mut interact =
        ScriptInteract::new(&[Decision::Accept]).with_composed(&[Some(composed)]);

    let options = CommitOptions {
        mode: CommitMode::Manual,
        ..Default::default()
    };
    let outcome = run_commit(&repo.repo, &ctx, &mut interact, &options)
        .await
        .unwrap();

    assert!(matches!(outcome, CommitOutcome::Committed(_)));
    assert_eq!(repo.head_message(), "\u{2728} feat(api): Add new endpoint");
}

#[tokio::test]
async fn test_edit_replaces_generated_draft() {
    let repo = TestRepo::new();
    repo.write_file("notes.md", "draft\n");

    let usage = MemoryUsageStore::new();
    let provider = ScriptProvider::new(&["docs: Add notes"]);
    let ctx = context(Some(&provider), &usage);

    let edited = CommitMessage {
        commit_type: CommitType::Docs,
        scope: Some("notes".to_string()),
        title: "Start the design notes".to_string(),
        description: None,
    };
    let mut interact = ScriptInteract::new(&[Decision::Edit, Decision::Accept])
        .with_composed(&[Some(edited.clone())]);

    let options = CommitOptions {
        mode: CommitMode::Ai,
        ..Default::default()
    };
    let outcome = run_commit(&repo.repo, &ctx, &mut interact, &options)
        .await
        .unwrap();

    assert!(matches!(outcome, CommitOutcome::Committed(_)));
    assert_eq!(repo.head_message(), edited.render());
}

#[tokio::test]
async fn test_ignored_files_never_reach_the_prompt() {
    let repo = TestRepo::new();
    repo.write_file(".scribaignore", "secrets.env\n");
    repo.write_file("secrets.env", "TOKEN=hunter2\n");
    repo.write_file("main.rs", "fn main() {}\n");

    let usage = MemoryUsageStore::new();
    let mut provider = ScriptProvider::new(&["feat: Add the entry point"]);
    provider.reject_user_contains = Some("secrets.env");
    let ctx = context(Some(&provider), &usage);

    let mut interact = ScriptInteract::new(&[Decision::Accept]);
    let options = CommitOptions {
        mode: CommitMode::Ai,
        ..Default::default()
    };
    let outcome = run_commit(&repo.repo, &ctx, &mut interact, &options)
        .await
        .unwrap();

    assert!(matches!(outcome, CommitOutcome::Committed(_)));
}

#[tokio::test]
async fn test_only_ignored_changes_counts_as_nothing_to_commit() {
    let repo = TestRepo::new();
    repo.write_file("kept.txt", "x\n");
    repo.commit_all("chore: seed");

    repo.write_file(".scribaignore", "*.log\n");
    repo.commit_all("chore: add ignore file");
    repo.write_file("build.log", "noisy output\n");

    let usage = MemoryUsageStore::new();
    let ctx = context(None, &usage);
    let mut interact = ScriptInteract::new(&[]);

    let options = CommitOptions {
        mode: CommitMode::Ai,
        ..Default::default()
    };
    let outcome = run_commit(&repo.repo, &ctx, &mut interact, &options)
        .await
        .unwrap();

    assert_eq!(outcome, CommitOutcome::NoChanges);
    assert_eq!(usage.bucket_count(), 0);
}

#[tokio::test]
async fn test_rejected_drafts_feed_the_next_prompt() {
    let repo = TestRepo::new();
    repo.write_file("lib.rs", "pub fn one() {}\n");

    struct RememberingProvider {
        replies: Mutex<VecDeque<&'static str>>,
    }

    #[async_trait]
    impl ModelProvider for RememberingProvider {
        fn name(&self) -> &'static str {
            "remembering"
        }

        fn model(&self) -> &str {
            "test-model"
        }

        fn is_local(&self) -> bool {
            true
        }

        async fn generate(
            &self,
            _system: Option<&str>,
            user: &str,
            _debug: bool,
        ) -> Result<ModelResponse, ProviderError> {
            let mut replies = self.replies.lock().unwrap();
            if replies.len() == 1 {
                // Second call: the first draft must be quoted back.
                assert!(user.contains("rejected the following earlier drafts"));
                assert!(user.contains("Add the one function"));
            }
            Ok(ModelResponse {
                raw_text: replies.pop_front().unwrap().to_string(),
                tokens_in: 8,
                tokens_out: 4,
                provider: "remembering".to_string(),
                model: "test-model".to_string(),
            })
        }
    }

    let provider = RememberingProvider {
        replies: Mutex::new(
            ["feat: Add the one function", "feat(lib): Introduce the library entry"]
                .into_iter()
                .collect(),
        ),
    };
    let usage = MemoryUsageStore::new();
    let ctx = context(Some(&provider), &usage);

    let mut interact = ScriptInteract::new(&[Decision::Regenerate, Decision::Accept]);
    let options = CommitOptions {
        mode: CommitMode::Ai,
        ..Default::default()
    };
    let outcome = run_commit(&repo.repo, &ctx, &mut interact, &options)
        .await
        .unwrap();

    assert!(matches!(outcome, CommitOutcome::Committed(_)));
    assert_eq!(
        repo.head_message(),
        "\u{2728} feat(lib): Introduce the library entry"
    );
}
