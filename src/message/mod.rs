//! Commit types, commit messages, and the wire format written to git.

pub mod parser;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use parser::parse_response;

/// Default maximum length for commit titles.
pub const DEFAULT_TITLE_MAX: usize = 72;

/// The fixed commit-type taxonomy.
///
/// Each type maps 1:1 to a display glyph and a short meaning that is fed
/// to the model as categorization guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitType {
    Feat,
    Fix,
    Bug,
    Docs,
    Style,
    Refactor,
    Perf,
    Improvement,
    Test,
    Lint,
    Build,
    Ci,
    Chore,
    Revert,
    Dependencies,
    Metadata,
    Version,
    Security,
    Critical,
    Review,
    Other,
}

/// All commit types in display order.
pub const ALL_TYPES: [CommitType; 21] = [
    CommitType::Feat,
    CommitType::Fix,
    CommitType::Bug,
    CommitType::Docs,
    CommitType::Style,
    CommitType::Refactor,
    CommitType::Perf,
    CommitType::Improvement,
    CommitType::Test,
    CommitType::Lint,
    CommitType::Build,
    CommitType::Ci,
    CommitType::Chore,
    CommitType::Revert,
    CommitType::Dependencies,
    CommitType::Metadata,
    CommitType::Version,
    CommitType::Security,
    CommitType::Critical,
    CommitType::Review,
    CommitType::Other,
];

impl CommitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitType::Feat => "feat",
            CommitType::Fix => "fix",
            CommitType::Bug => "bug",
            CommitType::Docs => "docs",
            CommitType::Style => "style",
            CommitType::Refactor => "refactor",
            CommitType::Perf => "perf",
            CommitType::Improvement => "improvement",
            CommitType::Test => "test",
            CommitType::Lint => "lint",
            CommitType::Build => "build",
            CommitType::Ci => "ci",
            CommitType::Chore => "chore",
            CommitType::Revert => "revert",
            CommitType::Dependencies => "dependencies",
            CommitType::Metadata => "metadata",
            CommitType::Version => "version",
            CommitType::Security => "security",
            CommitType::Critical => "critical",
            CommitType::Review => "review",
            CommitType::Other => "other",
        }
    }

    /// The display glyph prefixed to the commit subject.
    pub fn glyph(&self) -> &'static str {
        match self {
            CommitType::Feat => "\u{2728}",         // ✨
            CommitType::Fix => "\u{1f41e}",         // 🐞
            CommitType::Bug => "\u{1f41b}",         // 🐛
            CommitType::Docs => "\u{1f4da}",        // 📚
            CommitType::Style => "\u{1f48e}",       // 💎
            CommitType::Refactor => "\u{1f4e6}",    // 📦
            CommitType::Perf => "\u{1f40e}",        // 🐎
            CommitType::Improvement => "\u{267b}\u{fe0f}", // ♻️
            CommitType::Test => "\u{2705}",         // ✅
            CommitType::Lint => "\u{1f6a8}",        // 🚨
            CommitType::Build => "\u{1f527}",       // 🔧
            CommitType::Ci => "\u{2699}\u{fe0f}",   // ⚙️
            CommitType::Chore => "\u{1f9f9}",       // 🧹
            CommitType::Revert => "\u{23ea}",       // ⏪
            CommitType::Dependencies => "\u{23eb}", // ⏫
            CommitType::Metadata => "\u{1f4c7}",    // 📇
            CommitType::Version => "\u{1f516}",     // 🔖
            CommitType::Security => "\u{1f512}",    // 🔒
            CommitType::Critical => "\u{1f691}",    // 🚑
            CommitType::Review => "\u{1f44c}",      // 👌
            CommitType::Other => "\u{1f9f1}",       // 🧱
        }
    }

    /// Human-readable guidance on when to use this type.
    pub fn meaning(&self) -> &'static str {
        match self {
            CommitType::Feat => {
                "Use this when introducing a new feature that changes or adds functionality from the user's perspective."
            }
            CommitType::Fix => {
                "Use this when fixing an issue. This typically addresses flaws in logic or unintended behavior."
            }
            CommitType::Bug => {
                "Use this when resolving a reported bug with a confirmed defect and reproduction."
            }
            CommitType::Docs => {
                "Use this when adding or improving documentation (README, comments, or any project documentation)."
            }
            CommitType::Style => {
                "Use this when making purely stylistic changes that do not affect code behavior (formatting, indentation)."
            }
            CommitType::Refactor => {
                "Use this when restructuring or reorganizing the code without altering its external behavior."
            }
            CommitType::Perf => {
                "Use this when improving performance, optimizing code, or reducing resource usage."
            }
            CommitType::Improvement => {
                "Use this when making minor improvements to existing functionality that are not fixes or new features."
            }
            CommitType::Test => "Use this when adding or updating tests.",
            CommitType::Lint => {
                "Use this when fixing or adjusting linter, compiler warnings, or related code-quality checks."
            }
            CommitType::Build => {
                "Use this when changing the build process or external dependencies that affect the build system."
            }
            CommitType::Ci => {
                "Use this when modifying CI configuration or scripts (e.g., GitHub Actions, Jenkins)."
            }
            CommitType::Chore => {
                "Use this when performing general maintenance tasks that do not affect source or test files directly."
            }
            CommitType::Revert => "Use this when reverting a previous commit.",
            CommitType::Dependencies => {
                "Use this when updating or modifying project dependencies."
            }
            CommitType::Metadata => {
                "Use this when updating metadata like project settings or repository information."
            }
            CommitType::Version => "Use this when bumping or modifying version numbers.",
            CommitType::Security => {
                "Use this when addressing security vulnerabilities or implementing security-related fixes."
            }
            CommitType::Critical => {
                "Use this for urgent, high-priority fixes addressing critical issues in production."
            }
            CommitType::Review => {
                "Use this when merging PRs or making changes based on code reviews."
            }
            CommitType::Other => {
                "Use this for any commit that does not fit into the other categories."
            }
        }
    }
}

impl fmt::Display for CommitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommitType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        ALL_TYPES
            .iter()
            .find(|t| t.as_str() == lower)
            .copied()
            .ok_or_else(|| format!("Unknown commit type: {}", s))
    }
}

/// Render the allowed types as a `type;meaning` CSV for the model.
pub fn types_csv(allowed: &[CommitType]) -> String {
    let mut out = String::from("type;meaning");
    for t in allowed {
        out.push('\n');
        out.push_str(&t.as_str().to_uppercase());
        out.push(';');
        out.push_str(t.meaning());
    }
    out
}

/// The allowed type set, excluding `feat` when no-feat mode is requested.
pub fn allowed_types(no_feat: bool) -> Vec<CommitType> {
    ALL_TYPES
        .iter()
        .copied()
        .filter(|t| !(no_feat && *t == CommitType::Feat))
        .collect()
}

/// A structured conventional commit message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitMessage {
    #[serde(rename = "type")]
    pub commit_type: CommitType,
    pub scope: Option<String>,
    pub title: String,
    pub description: Option<String>,
}

impl CommitMessage {
    /// Validate the title against the single-line and length invariants.
    pub fn validate(&self, title_max: usize) -> Result<(), crate::error::ParseError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(crate::error::ParseError::EmptyTitle);
        }
        let len = title.chars().count();
        if len > title_max {
            return Err(crate::error::ParseError::TitleTooLong {
                len,
                max: title_max,
            });
        }
        Ok(())
    }

    /// Format the message for git:
    ///
    /// ```text
    /// {glyph} {type}({scope}): {title}
    ///
    /// {description}
    /// ```
    ///
    /// Scope parentheses are omitted when scope is empty; the description
    /// block is omitted when empty.
    pub fn render(&self) -> String {
        let scope = self
            .scope
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let subject = match scope {
            Some(scope) => format!(
                "{} {}({}): {}",
                self.commit_type.glyph(),
                self.commit_type,
                scope,
                self.title.trim()
            ),
            None => format!(
                "{} {}: {}",
                self.commit_type.glyph(),
                self.commit_type,
                self.title.trim()
            ),
        };

        match self.description.as_deref().map(str::trim) {
            Some(desc) if !desc.is_empty() => format!("{}\n\n{}", subject, desc),
            _ => subject,
        }
    }
}
