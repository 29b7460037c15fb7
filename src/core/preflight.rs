//! Read-only checks that must all pass before a deploy mutates anything.

use serde::Serialize;
use std::path::Path;

use crate::config::{DeployConfig, DeployPaths};
use crate::error::{Error, Result};
use crate::git;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreflightReport {
    pub branch: String,
    pub current_version: String,
}

/// The deploy repo counts as present when its version marker is a regular file.
pub fn validate_deploy_repo(paths: &DeployPaths) -> Result<()> {
    if !paths.version_file.is_file() {
        return Err(Error::deploy_repo_not_found(
            paths.deploy_repo_dir.display().to_string(),
            paths.version_file.display().to_string(),
        ));
    }

    let deploy = canonical(&paths.deploy_repo_dir)?;
    let source = canonical(&paths.source_dir)?;
    if source.starts_with(&deploy) {
        return Err(Error::config_invalid_value(
            "deploy_repo_dir",
            Some(paths.deploy_repo_dir.display().to_string()),
            "must not contain the source repository",
        ));
    }

    // The build step deletes the build dir wholesale.
    let build = match paths.build_dir.strip_prefix(&paths.source_dir) {
        Ok(relative) => source.join(relative),
        Err(_) => paths.build_dir.clone(),
    };
    if deploy.starts_with(&build) {
        return Err(Error::config_invalid_value(
            "deploy_repo_dir",
            Some(paths.deploy_repo_dir.display().to_string()),
            "must not be inside the build directory",
        ));
    }

    Ok(())
}

pub fn ensure_on_expected_branch(source_dir: &Path, expected: &str) -> Result<String> {
    let branch = git::current_branch(source_dir)?;
    if branch != expected {
        return Err(Error::precondition_wrong_branch(expected, branch));
    }
    Ok(branch)
}

/// Fails on staged or unstaged changes first, then on untracked files.
pub fn ensure_clean_worktree(source_dir: &Path) -> Result<()> {
    let mut changed = git::unstaged_changes(source_dir)?;
    for file in git::staged_changes(source_dir)? {
        if !changed.contains(&file) {
            changed.push(file);
        }
    }
    if !changed.is_empty() {
        return Err(Error::precondition_uncommitted_changes(
            source_dir.display().to_string(),
            changed,
        ));
    }

    let untracked = git::untracked_files(source_dir)?;
    if !untracked.is_empty() {
        return Err(Error::precondition_untracked_files(
            source_dir.display().to_string(),
            untracked,
        ));
    }

    Ok(())
}

/// Run every check in order: config values, deploy repo, branch, clean tree, marker format.
///
/// The marker format is checked here too so that a malformed marker aborts
/// before the build rather than after publishing.
pub fn run(config: &DeployConfig, paths: &DeployPaths) -> Result<PreflightReport> {
    config.validate()?;
    validate_deploy_repo(paths)?;
    let branch = ensure_on_expected_branch(&paths.source_dir, &config.expected_branch)?;
    ensure_clean_worktree(&paths.source_dir)?;
    let current = crate::version::read_version(&paths.version_file)?;

    log_status!(
        "preflight",
        "On {} with a clean tree; deploy repo at {}",
        branch,
        crate::version::format_marker(&current)
    );

    Ok(PreflightReport {
        branch,
        current_version: crate::version::format_marker(&current),
    })
}

fn canonical(path: &Path) -> Result<std::path::PathBuf> {
    path.canonicalize().map_err(|e| {
        Error::internal_io(
            e.to_string(),
            Some(format!("resolve {}", path.display())),
        )
    })
}
