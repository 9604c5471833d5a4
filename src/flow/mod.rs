//! Straight-line repository flow commands: init, merge, and tag.
//!
//! These are thin sequences over the git module. They do exactly what
//! their manual equivalents do, in order, and stop at the first failure.

use std::path::Path;

use git2::Repository;
use tracing::debug;

use crate::error::GitError;
use crate::git;

/// Initialize a repository, optionally wiring a remote and a dev branch.
pub fn init(path: &Path, origin: Option<&str>, dev_branch: Option<&str>) -> Result<(), GitError> {
    let repo = Repository::init(path).map_err(GitError::OpenRepository)?;
    println!("Initialized repository at {}", path.display());

    if let Some(url) = origin {
        repo.remote("origin", url)
            .map_err(|e| GitError::RemoteNotFound("origin".to_string(), e))?;
        println!("Added remote origin -> {}", url);
    }

    if let Some(branch) = dev_branch {
        // A branch needs a commit to point at.
        let oid = git::stage_and_commit(&repo, "\u{1f9f1} other: Initialize repository")?;
        let commit = repo.find_commit(oid).map_err(GitError::CommitFailed)?;
        repo.branch(branch, &commit, false)
            .map_err(|e| GitError::BranchFailed(branch.to_string(), e))?;
        repo.set_head(&format!("refs/heads/{}", branch))
            .map_err(|e| GitError::BranchFailed(branch.to_string(), e))?;
        println!("Created and switched to branch {}", branch);
    }

    Ok(())
}

/// Merge `source` into `destination` with an explicit merge commit.
///
/// Sequence: checkout destination, pull it, `merge --no-ff` the source,
/// optionally push. Shells out so credentials and merge drivers behave
/// exactly as they do for the operator.
pub fn merge(
    workdir: &Path,
    source: &str,
    destination: &str,
    push: bool,
) -> Result<(), GitError> {
    debug!("Merging {} into {}", source, destination);
    git::run_git(workdir, &["checkout", destination])?;

    // A stale destination would produce a misleading merge base.
    if let Err(e) = git::run_git(workdir, &["pull", "--ff-only"]) {
        debug!("Pull skipped: {}", e);
    }

    git::run_git(workdir, &["merge", "--no-ff", source])
        .map_err(|e| GitError::MergeFailed(source.to_string(), Box::new(e)))?;
    println!("Merged {} into {}.", source, destination);

    if push {
        git::push(workdir, "origin", destination)?;
        println!("Pushed to origin/{}.", destination);
    }

    Ok(())
}

/// Create a tag on HEAD, optionally annotated, optionally pushed.
pub fn tag(
    repo: &Repository,
    name: &str,
    message: Option<&str>,
    force: bool,
    push: bool,
) -> Result<(), GitError> {
    let exists = repo
        .find_reference(&format!("refs/tags/{}", name))
        .is_ok();
    if exists {
        if !force {
            return Err(GitError::TagExists(name.to_string()));
        }
        repo.tag_delete(name).map_err(GitError::TagFailed)?;
        println!("Replaced existing tag {}.", name);
    }

    let target = repo
        .head()
        .and_then(|h| h.peel(git2::ObjectType::Commit))
        .map_err(|e| GitError::BranchFailed("HEAD".to_string(), e))?;

    match message {
        Some(message) => {
            let signature = repo.signature().map_err(GitError::ConfigError)?;
            repo.tag(name, &target, &signature, message, force)
                .map_err(GitError::TagFailed)?;
        }
        None => {
            repo.tag_lightweight(name, &target, force)
                .map_err(GitError::TagFailed)?;
        }
    }
    println!("Created tag {}.", name);

    if push {
        let workdir = repo.workdir().unwrap_or_else(|| Path::new("."));
        git::push_tag(workdir, "origin", name)?;
        println!("Pushed tag {} to origin.", name);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_repo() -> (tempfile::TempDir, Repository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let mut config = repo.config().unwrap();
        config.set_str("user.name", "Test User").unwrap();
        config.set_str("user.email", "test@example.com").unwrap();
        std::fs::write(dir.path().join("a.txt"), "x\n").unwrap();
        git::stage_and_commit(&repo, "chore: seed").unwrap();
        (dir, repo)
    }

    #[test]
    fn test_init_with_origin_and_dev_branch() {
        let dir = tempfile::tempdir().unwrap();
        // Seed the identity before init() needs a signature.
        let repo = Repository::init(dir.path()).unwrap();
        let mut config = repo.config().unwrap();
        config.set_str("user.name", "Test User").unwrap();
        config.set_str("user.email", "test@example.com").unwrap();
        drop(repo);

        init(
            dir.path(),
            Some("git@example.com:me/project.git"),
            Some("dev"),
        )
        .unwrap();

        let repo = Repository::open(dir.path()).unwrap();
        assert!(repo.find_remote("origin").is_ok());
        assert!(repo.find_branch("dev", git2::BranchType::Local).is_ok());
        let head = repo.head().unwrap();
        assert_eq!(head.shorthand(), Some("dev"));
    }

    #[test]
    fn test_tag_annotated_and_duplicate_rejected() {
        let (_dir, repo) = seeded_repo();

        tag(&repo, "v1.0.0", Some("Release v1.0.0"), false, false).unwrap();
        assert!(repo.find_reference("refs/tags/v1.0.0").is_ok());

        let err = tag(&repo, "v1.0.0", None, false, false).unwrap_err();
        assert!(matches!(err, GitError::TagExists(_)));
    }

    #[test]
    fn test_tag_force_recreates() {
        let (_dir, repo) = seeded_repo();

        tag(&repo, "v1.0.0", None, false, false).unwrap();
        tag(&repo, "v1.0.0", Some("Release v1.0.0"), true, false).unwrap();

        // Now annotated: the ref peels to a tag object.
        let reference = repo.find_reference("refs/tags/v1.0.0").unwrap();
        assert!(reference.peel(git2::ObjectType::Tag).is_ok());
    }

    #[test]
    fn test_merge_no_ff_creates_merge_commit() {
        let (dir, repo) = seeded_repo();

        // Branch off, add a commit, then merge back into the starting branch.
        let start_branch = git::current_branch(&repo).unwrap();
        git::run_git(dir.path(), &["checkout", "-b", "feature"]).unwrap();
        std::fs::write(dir.path().join("b.txt"), "y\n").unwrap();
        git::stage_and_commit(&repo, "feat: branch work").unwrap();

        merge(dir.path(), "feature", &start_branch, false).unwrap();

        let repo = Repository::open(dir.path()).unwrap();
        let head = repo.head().unwrap().peel_to_commit().unwrap();
        assert_eq!(head.parent_count(), 2);
    }
}
