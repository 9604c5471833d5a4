//! Repository mutations: staging, committing, branching, and pushing.
//!
//! Reads and in-repo mutations go through `git2`. Anything that touches a
//! remote shells out to the system `git` binary so the user's existing
//! credential helpers and SSH agent keep working.

use std::path::Path;
use std::process::Command;

use git2::Repository;
use tracing::debug;

use crate::error::GitError;

/// Open the repository containing `path`, searching upward.
pub fn open_repository(path: &Path) -> Result<Repository, GitError> {
    Repository::discover(path).map_err(GitError::OpenRepository)
}

/// The short name of the currently checked-out branch.
pub fn current_branch(repo: &Repository) -> Result<String, GitError> {
    let head = repo
        .head()
        .map_err(|e| GitError::BranchFailed("HEAD".to_string(), e))?;
    Ok(head.shorthand().unwrap_or("HEAD").to_string())
}

/// Stage every change in the working tree and create a commit on HEAD.
///
/// Handles the unborn-branch case: the first commit in a fresh repository
/// has no parent.
pub fn stage_and_commit(repo: &Repository, message: &str) -> Result<git2::Oid, GitError> {
    let mut index = repo.index().map_err(GitError::StagingFailed)?;
    index
        .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
        .map_err(GitError::StagingFailed)?;
    index.write().map_err(GitError::StagingFailed)?;

    let tree_oid = index.write_tree().map_err(GitError::CommitFailed)?;
    let tree = repo.find_tree(tree_oid).map_err(GitError::CommitFailed)?;

    let signature = repo.signature().map_err(GitError::ConfigError)?;

    let parent = match repo.head() {
        Ok(head) => Some(
            head.peel_to_commit()
                .map_err(|e| GitError::BranchFailed("HEAD".to_string(), e))?,
        ),
        // Unborn HEAD: this will be the root commit.
        Err(e) if e.code() == git2::ErrorCode::UnbornBranch => None,
        Err(e) if e.code() == git2::ErrorCode::NotFound => None,
        Err(e) => return Err(GitError::BranchFailed("HEAD".to_string(), e)),
    };
    let parents: Vec<&git2::Commit> = parent.iter().collect();

    let oid = repo
        .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
        .map_err(GitError::CommitFailed)?;

    debug!("Created commit {}", oid);
    Ok(oid)
}

/// Push the given branch to a remote via the system git binary.
pub fn push(workdir: &Path, remote: &str, branch: &str) -> Result<(), GitError> {
    run_git(workdir, &["push", remote, branch])
        .map_err(|e| GitError::PushFailed(remote.to_string(), Box::new(e)))
}

/// Push a tag to a remote.
pub fn push_tag(workdir: &Path, remote: &str, tag: &str) -> Result<(), GitError> {
    run_git(workdir, &["push", remote, tag])
        .map_err(|e| GitError::PushFailed(remote.to_string(), Box::new(e)))
}

/// Run a git subcommand in `workdir`, surfacing stderr on failure.
pub fn run_git(workdir: &Path, args: &[&str]) -> Result<(), GitError> {
    debug!("Running git {}", args.join(" "));
    let output = Command::new("git")
        .current_dir(workdir)
        .args(args)
        .output()
        .map_err(|e| GitError::CommandFailed(args.join(" "), e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GitError::CommandFailed(
            args.join(" "),
            stderr.trim().to_string(),
        ));
    }

    Ok(())
}
