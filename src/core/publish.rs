//! Replace the deploy repo's published files with the fresh build output.

use glob_match::glob_match;
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::config::{DeployConfig, DeployPaths};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishOutput {
    pub removed: Vec<String>,
    pub preserved: Vec<String>,
    pub copied_files: usize,
}

/// Rules deciding which top-level deploy-repo entries survive clearing.
pub struct KeepRules<'a> {
    patterns: &'a [String],
    version_root: Option<String>,
}

impl<'a> KeepRules<'a> {
    pub fn from_config(config: &'a DeployConfig) -> Self {
        Self {
            patterns: &config.preserve,
            version_root: config.version_file_root(),
        }
    }

    /// Dotfiles (`.git`, `.version`, `.nojekyll`), the version file's entry
    /// and anything matching a preserve pattern.
    pub fn keeps(&self, name: &str) -> bool {
        name.starts_with('.')
            || self.version_root.as_deref() == Some(name)
            || self.patterns.iter().any(|p| glob_match(p, name))
    }
}

fn io_err(e: std::io::Error, context: String) -> Error {
    Error::internal_io(e.to_string(), Some(context))
}

fn entry_names(dir: &Path) -> Result<Vec<String>> {
    let entries =
        fs::read_dir(dir).map_err(|e| io_err(e, format!("list {}", dir.display())))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| io_err(e, format!("list {}", dir.display())))?;
        names.push(entry.file_name().to_string_lossy().to_string());
    }
    names.sort();
    Ok(names)
}

/// Remove every top-level entry of the deploy repo that the rules do not keep.
pub fn clear_deploy_repo(deploy_dir: &Path, rules: &KeepRules) -> Result<(Vec<String>, Vec<String>)> {
    let mut removed = Vec::new();
    let mut preserved = Vec::new();

    for name in entry_names(deploy_dir)? {
        if rules.keeps(&name) {
            preserved.push(name);
            continue;
        }

        let path = deploy_dir.join(&name);
        let metadata = fs::symlink_metadata(&path)
            .map_err(|e| io_err(e, format!("inspect {}", path.display())))?;

        if metadata.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        }
        .map_err(|e| io_err(e, format!("remove {}", path.display())))?;

        removed.push(name);
    }

    Ok((removed, preserved))
}

fn copy_dir_contents(src: &Path, dst: &Path, copied: &mut usize) -> Result<()> {
    for name in entry_names(src)? {
        copy_entry(&src.join(&name), &dst.join(&name), copied)?;
    }
    Ok(())
}

/// Copy one entry recursively, counting the files written.
///
/// Permissions and timestamps are carried over where the platform allows;
/// symlinks are recreated rather than followed on unix.
fn copy_entry(src: &Path, dst: &Path, copied: &mut usize) -> Result<()> {
    let metadata =
        fs::symlink_metadata(src).map_err(|e| io_err(e, format!("inspect {}", src.display())))?;

    if metadata.file_type().is_symlink() {
        return copy_symlink(src, dst, copied);
    }

    if metadata.is_dir() {
        fs::create_dir_all(dst).map_err(|e| io_err(e, format!("create {}", dst.display())))?;
        copy_dir_contents(src, dst, copied)?;
        fs::set_permissions(dst, metadata.permissions())
            .map_err(|e| io_err(e, format!("set permissions on {}", dst.display())))?;
        copy_times(&metadata, dst);
        return Ok(());
    }

    fs::copy(src, dst).map_err(|e| {
        io_err(e, format!("copy {} to {}", src.display(), dst.display()))
    })?;
    copy_times(&metadata, dst);
    *copied += 1;
    log_status!("publish", "{}", dst.display());
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path, copied: &mut usize) -> Result<()> {
    let target =
        fs::read_link(src).map_err(|e| io_err(e, format!("read link {}", src.display())))?;

    if fs::symlink_metadata(dst).is_ok() {
        fs::remove_file(dst).map_err(|e| io_err(e, format!("replace {}", dst.display())))?;
    }

    std::os::unix::fs::symlink(&target, dst)
        .map_err(|e| io_err(e, format!("link {}", dst.display())))?;
    *copied += 1;
    log_status!("publish", "{} -> {}", dst.display(), target.display());
    Ok(())
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path, copied: &mut usize) -> Result<()> {
    let metadata = fs::metadata(src).map_err(|e| io_err(e, format!("follow {}", src.display())))?;
    if metadata.is_dir() {
        fs::create_dir_all(dst).map_err(|e| io_err(e, format!("create {}", dst.display())))?;
        return copy_dir_contents(src, dst, copied);
    }
    fs::copy(src, dst)
        .map_err(|e| io_err(e, format!("copy {} to {}", src.display(), dst.display())))?;
    *copied += 1;
    Ok(())
}

/// Best effort: read-only files or platforms without the syscall keep their new times.
fn copy_times(metadata: &fs::Metadata, dst: &Path) {
    let mut times = fs::FileTimes::new();
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
    }
    if let Ok(modified) = metadata.modified() {
        times = times.set_modified(modified);
    }

    let handle = if metadata.is_dir() {
        fs::File::open(dst)
    } else {
        fs::OpenOptions::new().write(true).open(dst)
    };

    if let Ok(file) = handle {
        let _ = file.set_times(times);
    }
}

/// Top-level build entries never replace what the deploy repo kept:
/// dotfiles, the version file's entry and preserved entries stay as they were.
fn copies_from_build(name: &str, rules: &KeepRules, preserved: &[String]) -> bool {
    !name.starts_with('.')
        && rules.version_root.as_deref() != Some(name)
        && !preserved.iter().any(|kept| kept == name)
}

/// Clear the deploy repo and copy the build output into it.
pub fn run(config: &DeployConfig, paths: &DeployPaths) -> Result<PublishOutput> {
    let rules = KeepRules::from_config(config);

    let (removed, preserved) = clear_deploy_repo(&paths.deploy_repo_dir, &rules)?;
    log_status!(
        "publish",
        "Cleared {} entries from {} (kept {})",
        removed.len(),
        paths.deploy_repo_dir.display(),
        preserved.join(", ")
    );

    let mut copied_files = 0;
    for name in entry_names(&paths.build_dir)? {
        if !copies_from_build(&name, &rules, &preserved) {
            log_status!("publish", "Skipping {} from build output", name);
            continue;
        }
        copy_entry(
            &paths.build_dir.join(&name),
            &paths.deploy_repo_dir.join(&name),
            &mut copied_files,
        )?;
    }

    Ok(PublishOutput {
        removed,
        preserved,
        copied_files,
    })
}
