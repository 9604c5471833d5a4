//! scriba - A CLI tool that turns pending working-tree changes into
//! conventional commits.
//!
//! # Overview
//!
//! scriba collects the staged, unstaged, and untracked changes of a
//! repository, optionally summarizes them, asks a configured language
//! model for a conventional commit message, and walks the operator
//! through an accept/edit/regenerate review before committing. Token
//! usage is accounted per device and calendar month.

pub mod changes;
pub mod config;
pub mod error;
pub mod flow;
pub mod git;
pub mod message;
pub mod pipeline;
pub mod prompt;
pub mod provider;
pub mod session;
pub mod summary;
pub mod usage;

// Re-export commonly used types
pub use changes::{Change, ChangeSet, ChangeStatus};
pub use error::{ChangeError, ConfigError, GitError, ParseError, ProviderError, UsageError};
pub use message::{CommitMessage, CommitType};
pub use pipeline::{CommitMode, CommitOptions, CommitOutcome};
pub use provider::{ModelProvider, ModelResponse, ProviderKind};
pub use session::{Decision, Session, SessionState};
