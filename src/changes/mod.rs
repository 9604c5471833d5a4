//! Change collection from the working tree using git2.

pub mod ignore;

use std::collections::HashMap;
use std::fmt;

use git2::{Delta, Diff, DiffFormat, DiffOptions, ErrorCode, Repository, Tree};
use tracing::warn;

use crate::error::ChangeError;

pub use ignore::{IGNORE_FILE, IgnoreList};

/// Maximum characters of diff text kept per file before truncation.
const MAX_FILE_DIFF_LENGTH: usize = 12_000;

/// Status of a pending change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeStatus::Added => write!(f, "added"),
            ChangeStatus::Modified => write!(f, "modified"),
            ChangeStatus::Deleted => write!(f, "deleted"),
            ChangeStatus::Renamed => write!(f, "renamed"),
        }
    }
}

/// One pending modification in the working tree.
#[derive(Debug, Clone)]
pub struct Change {
    pub path: String,
    pub status: ChangeStatus,
    pub diff_text: String,
}

/// The ignore-filtered set of pending changes for one invocation.
///
/// Order follows collector traversal: staged deltas first, then unstaged
/// and untracked, deduplicated by path with the staged entry winning.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    pub fn new(changes: Vec<Change>) -> Self {
        Self { changes }
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Render the set as change material for a prompt.
    ///
    /// Frames each file so the model can tell where one ends and the next
    /// begins:
    ///
    /// ```text
    /// >>>> src/lib.rs (modified)
    /// ...diff...
    /// <<<< end of file
    /// ```
    pub fn render_for_prompt(&self) -> String {
        let mut out = Vec::with_capacity(self.changes.len() * 3);
        for change in &self.changes {
            out.push(format!(">>>> {} ({})", change.path, change.status));
            out.push(change.diff_text.clone());
            out.push("<<<< end of file".to_string());
        }
        out.join("\n")
    }
}

/// Resolve the HEAD tree, distinguishing empty-repo errors from real failures.
///
/// Returns `Ok(None)` for repos with no commits (unborn branch / not found)
/// and `Err` for real errors such as a corrupt HEAD.
fn resolve_head_tree(repo: &Repository) -> Result<Option<Tree<'_>>, ChangeError> {
    let head_ref = match repo.head() {
        Ok(r) => r,
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
            return Ok(None);
        }
        Err(e) => return Err(ChangeError::DiffFailed(e)),
    };

    let tree = head_ref.peel_to_tree().map_err(ChangeError::DiffFailed)?;
    Ok(Some(tree))
}

/// Collect pending changes (staged + unstaged + untracked) as a filtered
/// [`ChangeSet`].
///
/// Fails with [`ChangeError::NoChanges`] when nothing survives the ignore
/// filter, which callers treat as a clean no-op rather than a failure.
pub fn collect_changes(repo: &Repository, ignore: &IgnoreList) -> Result<ChangeSet, ChangeError> {
    let head_tree = resolve_head_tree(repo)?;

    let mut staged_diff = repo
        .diff_tree_to_index(head_tree.as_ref(), None, None)
        .map_err(ChangeError::DiffFailed)?;

    let mut opts = DiffOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .show_untracked_content(true);
    let mut unstaged_diff = repo
        .diff_index_to_workdir(None, Some(&mut opts))
        .map_err(ChangeError::DiffFailed)?;

    // Pair deleted+added entries back into renames.
    staged_diff
        .find_similar(None)
        .map_err(ChangeError::DiffFailed)?;
    unstaged_diff
        .find_similar(None)
        .map_err(ChangeError::DiffFailed)?;

    let mut entries: Vec<(String, ChangeStatus)> = Vec::new();
    collect_paths_from_diff(&staged_diff, &mut entries);
    collect_paths_from_diff(&unstaged_diff, &mut entries);

    // Dedup by path; the first (staged) entry wins. The ignore file
    // itself never belongs in prompt material.
    let mut seen = std::collections::HashSet::new();
    entries.retain(|(path, _)| seen.insert(path.clone()));
    entries.retain(|(path, _)| path != IGNORE_FILE && !ignore.is_ignored(path));

    if entries.is_empty() {
        return Err(ChangeError::NoChanges);
    }

    let mut texts: HashMap<String, String> = HashMap::new();
    append_diff_text(&staged_diff, &mut texts);
    append_diff_text(&unstaged_diff, &mut texts);

    let changes = entries
        .into_iter()
        .map(|(path, status)| {
            let diff_text = texts.remove(&path).unwrap_or_default();
            Change {
                path,
                status,
                diff_text,
            }
        })
        .collect();

    Ok(ChangeSet::new(changes))
}

/// Collect (path, status) pairs from a diff, in delta order.
fn collect_paths_from_diff(diff: &Diff<'_>, entries: &mut Vec<(String, ChangeStatus)>) {
    for delta in diff.deltas() {
        let status = match delta.status() {
            Delta::Added | Delta::Untracked => ChangeStatus::Added,
            Delta::Deleted => ChangeStatus::Deleted,
            Delta::Renamed => ChangeStatus::Renamed,
            _ => ChangeStatus::Modified,
        };

        let path = delta
            .new_file()
            .path()
            .or_else(|| delta.old_file().path())
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();

        if !path.is_empty() {
            entries.push((path, status));
        }
    }
}

/// Accumulate patch text per file, truncating oversized files.
fn append_diff_text(diff: &Diff<'_>, texts: &mut HashMap<String, String>) {
    let result = diff.print(DiffFormat::Patch, |delta, _hunk, line| {
        let path = delta
            .new_file()
            .path()
            .or_else(|| delta.old_file().path())
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();
        if path.is_empty() {
            return true;
        }

        let text = texts.entry(path).or_default();
        if text.len() >= MAX_FILE_DIFF_LENGTH {
            return true;
        }

        let origin = line.origin();
        if origin == '+' || origin == '-' || origin == ' ' {
            text.push(origin);
        }
        text.push_str(std::str::from_utf8(line.content()).unwrap_or(""));

        if text.len() >= MAX_FILE_DIFF_LENGTH {
            text.push_str("\n[diff truncated]\n");
        }
        true
    });

    if let Err(e) = result {
        warn!("Failed to collect diff text: {e}");
    }
}
