//! Ignore-file handling for the change collector.
//!
//! `.scribaignore` keeps noisy paths (lockfiles, build output) out of the
//! prompt. One glob per line, `#` comments, blank lines skipped, using
//! gitignore syntax matched relative to the repository root.

use std::path::Path;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use tracing::warn;

use crate::error::ChangeError;

/// Name of the ignore file at the repository root.
pub const IGNORE_FILE: &str = ".scribaignore";

/// Compiled ignore patterns for one invocation.
pub struct IgnoreList {
    matcher: Option<Gitignore>,
}

impl IgnoreList {
    /// Load patterns from `.scribaignore` at the repository root.
    ///
    /// A missing file means nothing is ignored. Unparseable patterns are
    /// skipped with a warning rather than failing collection.
    pub fn load(repo_root: &Path) -> Result<Self, ChangeError> {
        let path = repo_root.join(IGNORE_FILE);
        if !path.exists() {
            return Ok(Self { matcher: None });
        }

        let content = std::fs::read_to_string(&path).map_err(ChangeError::IgnoreFile)?;
        Ok(Self::from_patterns(repo_root, content.lines()))
    }

    /// Build an ignore list from raw pattern lines.
    pub fn from_patterns<'a>(
        repo_root: &Path,
        lines: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let mut builder = GitignoreBuilder::new(repo_root);
        for line in lines {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Err(e) = builder.add_line(None, line) {
                warn!("Skipping invalid ignore pattern '{}': {}", line, e);
            }
        }

        match builder.build() {
            Ok(matcher) => Self {
                matcher: Some(matcher),
            },
            Err(e) => {
                warn!("Failed to compile ignore patterns: {}", e);
                Self { matcher: None }
            }
        }
    }

    /// Whether a repository-relative path should be excluded.
    pub fn is_ignored(&self, path: &str) -> bool {
        match &self.matcher {
            Some(m) => m.matched_path_or_any_parents(path, false).is_ignore(),
            None => false,
        }
    }
}
