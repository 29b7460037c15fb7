use std::path::Path;

use crate::error::Result;
use crate::utils::command;

// ============================================================================
// Queries (read-only)
// ============================================================================

fn git(path: &Path, args: &[&str]) -> Result<String> {
    command::run_in(path, "git", args)
}

fn lines(stdout: String) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Name of the checked-out branch (`HEAD` when detached).
pub fn current_branch(path: &Path) -> Result<String> {
    git(path, &["rev-parse", "--abbrev-ref", "HEAD"])
}

/// Files whose working-tree content differs from the index.
pub fn unstaged_changes(path: &Path) -> Result<Vec<String>> {
    git(path, &["diff", "--name-only"]).map(lines)
}

/// Files whose index content differs from HEAD.
pub fn staged_changes(path: &Path) -> Result<Vec<String>> {
    git(path, &["diff", "--cached", "--name-only"]).map(lines)
}

/// Untracked files and directories, honouring .gitignore and excludes.
pub fn untracked_files(path: &Path) -> Result<Vec<String>> {
    git(path, &["ls-files", "-o", "--directory", "--exclude-standard"]).map(lines)
}

/// Full hash of HEAD.
pub fn head_commit(path: &Path) -> Result<String> {
    git(path, &["rev-parse", "HEAD"])
}

/// Whether a tag with this name exists in the local repository.
pub fn tag_exists(path: &Path, name: &str) -> Result<bool> {
    let reference = format!("refs/tags/{}", name);
    command::output_in(path, "git", &["rev-parse", "-q", "--verify", &reference]).map(|o| o.success)
}

// ============================================================================
// Mutations
// ============================================================================

/// Stage every change in the working tree, including deletions.
pub fn add_all(path: &Path) -> Result<()> {
    git(path, &["add", "-A"]).map(|_| ())
}

pub fn commit(path: &Path, message: &str) -> Result<()> {
    git(path, &["commit", "-m", message]).map(|_| ())
}

/// Push the current branch to its upstream.
pub fn push(path: &Path) -> Result<()> {
    git(path, &["push"]).map(|_| ())
}

/// Create a lightweight tag at HEAD.
pub fn tag(path: &Path, name: &str) -> Result<()> {
    git(path, &["tag", name]).map(|_| ())
}

pub fn push_tags(path: &Path) -> Result<()> {
    git(path, &["push", "--tags"]).map(|_| ())
}
