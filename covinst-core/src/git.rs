//! Git metadata for the runtime bootstrap, reports, and path prefixes
//!
//! Extracts the repository facts published once per batch as
//! `global["__git_info__"]`.
//!
//! Global invariants enforced:
//! - Extraction never fails: every field is best effort, empty when unknown
//! - The project name is derived from the remote URL only
//!
//! Uses git CLI directly (no libgit2) for portability.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;

/// Repository metadata injected next to the first instrumented file of a batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitInfo {
    pub commit_hash: String,
    pub version: String,
    pub branch: String,
    pub last_commit_datetime: String,
    pub remote: String,
    pub project_name: String,
}

impl GitInfo {
    /// True when nothing could be extracted
    pub fn is_empty(&self) -> bool {
        self.commit_hash.is_empty() && self.remote.is_empty()
    }
}

/// Execute a git command in a specific directory and return the trimmed stdout
fn git_at(repo_path: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .current_dir(repo_path)
        .args(args)
        .output()
        .context("failed to invoke git")?;

    if !output.status.success() {
        anyhow::bail!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn best_effort(repo_path: &Path, field: &str, args: &[&str]) -> String {
    match git_at(repo_path, args) {
        Ok(value) => value,
        Err(err) => {
            tracing::debug!(field, error = %err, "git metadata unavailable");
            String::new()
        }
    }
}

/// Extract git metadata for the repository containing `repo_path`
///
/// Outside a repository (or without git installed) every field is empty.
pub fn extract_git_info(repo_path: &Path) -> GitInfo {
    if git_at(repo_path, &["rev-parse", "--git-dir"]).is_err() {
        tracing::warn!(path = %repo_path.display(), "not in a git repository, git info left empty");
        return GitInfo::default();
    }

    let remote = best_effort(repo_path, "remote", &["config", "--get", "remote.origin.url"])
        .trim_end_matches('/')
        .to_string();
    GitInfo {
        commit_hash: best_effort(repo_path, "commit_hash", &["rev-parse", "HEAD"]),
        version: best_effort(repo_path, "version", &["describe", "--always"]),
        branch: best_effort(repo_path, "branch", &["rev-parse", "--abbrev-ref", "HEAD"]),
        last_commit_datetime: best_effort(
            repo_path,
            "last_commit_datetime",
            &["log", "-1", "--format=%cI"],
        ),
        project_name: project_name_from_remote(&remote),
        remote,
    }
}

/// Last path segment of a remote URL, without a `.git` suffix
///
/// Handles `https://host/org/repo.git`, `git@host:org/repo.git` and local paths.
pub fn project_name_from_remote(remote: &str) -> String {
    let trimmed = remote.trim().trim_end_matches('/');
    let last = trimmed
        .rsplit(|c: char| c == '/' || c == ':')
        .next()
        .unwrap_or_default();
    last.strip_suffix(".git").unwrap_or(last).to_string()
}
