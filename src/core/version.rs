//! Version marker handling: a one-line `vMAJOR.MINOR.PATCH` file in the deploy repo.

use semver::Version;
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::utils::io;

pub const VERSION_PREFIX: &str = "v";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionBump {
    pub previous: String,
    pub version: String,
}

/// Parse a marker line such as `v1.2.3` into its semantic version.
///
/// Returns the problem description on failure so callers can attach the file path.
pub fn parse_marker(line: &str) -> std::result::Result<Version, String> {
    let rest = line
        .strip_prefix(VERSION_PREFIX)
        .ok_or_else(|| format!("expected '{}' prefix", VERSION_PREFIX))?;

    Version::parse(rest).map_err(|e| format!("invalid semantic version '{}': {}", rest, e))
}

/// Increment the patch component. Pre-release and build metadata are dropped.
pub fn bump_patch(version: &Version) -> Option<Version> {
    let patch = version.patch.checked_add(1)?;
    Some(Version::new(version.major, version.minor, patch))
}

/// Render a version as marker text, without the trailing newline.
pub fn format_marker(version: &Version) -> String {
    format!("{}{}", VERSION_PREFIX, version)
}

/// First line of the marker file with trailing whitespace removed.
///
/// Bytes that are not UTF-8 are replaced rather than rejected, so garbage
/// content fails as a format problem instead of an I/O one.
pub fn read_marker(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| {
        Error::internal_io(
            e.to_string(),
            Some(format!("read version file {}", path.display())),
        )
    })?;
    let content = String::from_utf8_lossy(&bytes);
    Ok(content.lines().next().unwrap_or("").trim_end().to_string())
}

/// Read, validate and parse the marker without touching it.
pub fn read_version(path: &Path) -> Result<Version> {
    let line = read_marker(path)?;
    parse_marker(&line)
        .map_err(|problem| Error::version_invalid_format(path.display().to_string(), line, problem))
}

/// Bump the patch version stored in the marker file and write it back.
///
/// The file is left untouched when its content does not parse.
pub fn update_marker(path: &Path) -> Result<VersionBump> {
    let current = read_version(path)?;

    let next = bump_patch(&current).ok_or_else(|| {
        Error::version_invalid_format(
            path.display().to_string(),
            format_marker(&current),
            "patch component overflows",
        )
    })?;

    let previous = format_marker(&current);
    let version = format_marker(&next);

    io::write_file_atomic(
        path,
        &format!("{}\n", version),
        &format!("write version file {}", path.display()),
    )?;

    log_status!("version", "{} -> {}", previous, version);

    Ok(VersionBump { previous, version })
}
