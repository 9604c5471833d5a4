//! Error types for scriba modules using thiserror.

use thiserror::Error;

/// Errors from change collection.
#[derive(Error, Debug)]
pub enum ChangeError {
    #[error("No changes to commit (working tree is clean)")]
    NoChanges,

    #[error("Failed to collect diff: {0}")]
    DiffFailed(#[source] git2::Error),

    #[error("Failed to read ignore file: {0}")]
    IgnoreFile(#[source] std::io::Error),
}

/// Errors from model provider calls.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error(
        "Provider authentication failed: {0}. Check the api_key (or host) in ~/.config/scriba/config.toml"
    )]
    Auth(String),

    #[error("Provider network failure: {0}")]
    Network(String),

    #[error("Provider quota or rate limit exceeded: {0}. Wait for the limit to reset or switch models")]
    Quota(String),

    #[error("Provider returned an empty response")]
    EmptyResponse,
}

impl ProviderError {
    /// Whether this error is transient and worth a single retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Network(_))
    }
}

/// Errors from parsing a model reply into a commit message.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("No `type(scope): title` line found in the model reply")]
    MissingSubject,

    #[error("Unknown commit type '{0}'")]
    UnknownType(String),

    #[error("Commit title is empty")]
    EmptyTitle,

    #[error("Commit title is {len} characters, exceeding the {max} character limit")]
    TitleTooLong { len: usize, max: usize },
}

/// Errors from git operations.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Not a git repository: {0}")]
    OpenRepository(#[source] git2::Error),

    #[error("Failed to stage changes: {0}")]
    StagingFailed(#[source] git2::Error),

    #[error("Failed to create commit: {0}")]
    CommitFailed(#[source] git2::Error),

    #[error("Git config error (missing user.name or user.email): {0}")]
    ConfigError(#[source] git2::Error),

    #[error("Failed to resolve branch '{0}': {1}")]
    BranchFailed(String, #[source] git2::Error),

    #[error("Remote '{0}' not found: {1}")]
    RemoteNotFound(String, #[source] git2::Error),

    #[error("Failed to push to '{0}': {1}")]
    PushFailed(String, #[source] Box<GitError>),

    #[error("Merge of '{0}' failed: {1}")]
    MergeFailed(String, #[source] Box<GitError>),

    #[error("git {0} failed: {1}")]
    CommandFailed(String, String),

    #[error("Tag '{0}' already exists. Use --force to recreate it")]
    TagExists(String),

    #[error("Tag operation failed: {0}")]
    TagFailed(#[source] git2::Error),
}

/// Errors from the usage accumulator. Always non-fatal to the commit flow.
#[derive(Error, Debug)]
pub enum UsageError {
    #[error("Failed to read usage store: {0}")]
    ReadFailed(#[source] std::io::Error),

    #[error("Failed to write usage store: {0}")]
    WriteFailed(#[source] std::io::Error),

    #[error("Usage store is corrupt: {0}")]
    Corrupt(#[source] serde_json::Error),
}

/// Errors from configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not resolve a config directory for this platform")]
    NoConfigDir,

    #[error("Failed to read config file {path}: {source}")]
    ReadFile {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseFile {
        path: std::path::PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to write config file {path}: {source}")]
    WriteFile {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("Missing required config value '{0}' for the selected provider")]
    MissingValue(&'static str),
}
