use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};
use crate::utils::io;

/// Optional per-repository config file, looked up in the source directory.
pub const CONFIG_FILENAME: &str = "ghpages-push.json";

/// Settings for one deploy run. Every key is optional in ghpages-push.json.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DeployConfig {
    #[serde(default = "default_expected_branch")]
    pub expected_branch: String,

    #[serde(default = "default_build_dir")]
    pub build_dir: String,

    #[serde(default = "default_build_command")]
    pub build_command: String,

    #[serde(default = "default_deploy_repo_dir")]
    pub deploy_repo_dir: String,

    #[serde(default = "default_version_file")]
    pub version_file: String,

    /// Glob patterns for deploy-repo entries that survive clearing, on top of dotfiles.
    #[serde(default)]
    pub preserve: Vec<String>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            expected_branch: default_expected_branch(),
            build_dir: default_build_dir(),
            build_command: default_build_command(),
            deploy_repo_dir: default_deploy_repo_dir(),
            version_file: default_version_file(),
            preserve: Vec::new(),
        }
    }
}

fn default_expected_branch() -> String {
    "master".to_string()
}

fn default_build_dir() -> String {
    "build".to_string()
}

fn default_build_command() -> String {
    "npm run-script build".to_string()
}

fn default_deploy_repo_dir() -> String {
    "../graphit-ghpages".to_string()
}

fn default_version_file() -> String {
    ".version".to_string()
}

/// Absolute locations derived from a config and the source directory.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployPaths {
    pub source_dir: PathBuf,
    pub build_dir: PathBuf,
    pub deploy_repo_dir: PathBuf,
    pub version_file: PathBuf,
}

impl DeployConfig {
    /// Check values that would make a run destructive or meaningless.
    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("expected_branch", &self.expected_branch),
            ("build_command", &self.build_command),
            ("deploy_repo_dir", &self.deploy_repo_dir),
        ] {
            if value.trim().is_empty() {
                return Err(Error::config_invalid_value(key, None, "must not be empty"));
            }
        }

        if !is_plain_relative(&self.build_dir) {
            return Err(Error::config_invalid_value(
                "build_dir",
                Some(self.build_dir.clone()),
                "must be a relative path below the source directory",
            ));
        }

        if !is_plain_relative(&self.version_file) {
            return Err(Error::config_invalid_value(
                "version_file",
                Some(self.version_file.clone()),
                "must be a relative path inside the deploy repo",
            ));
        }

        for pattern in &self.preserve {
            if pattern.trim().is_empty() || pattern.contains('/') {
                return Err(Error::config_invalid_value(
                    "preserve",
                    Some(pattern.clone()),
                    "patterns match top-level entry names and must not contain '/'",
                ));
            }
        }

        Ok(())
    }

    /// Resolve configured paths against the source directory.
    pub fn resolve(&self, source_dir: &Path) -> DeployPaths {
        let deploy_repo_dir = source_dir.join(&self.deploy_repo_dir);
        DeployPaths {
            source_dir: source_dir.to_path_buf(),
            build_dir: source_dir.join(&self.build_dir),
            version_file: deploy_repo_dir.join(&self.version_file),
            deploy_repo_dir,
        }
    }

    /// Top-level deploy-repo entry holding the version file. Never cleared.
    pub fn version_file_root(&self) -> Option<String> {
        Path::new(&self.version_file)
            .components()
            .next()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
    }
}

fn is_plain_relative(value: &str) -> bool {
    let path = Path::new(value);
    let mut components = path.components().peekable();
    if components.peek().is_none() {
        return false;
    }
    components.all(|c| matches!(c, Component::Normal(_)))
}

/// Load config for a source directory, merging the file with built-in defaults.
///
/// A missing file yields the built-in defaults. An unreadable or malformed
/// file is an error rather than a silent fallback.
pub fn load(source_dir: &Path) -> Result<DeployConfig> {
    let path = source_dir.join(CONFIG_FILENAME);

    if !path.exists() {
        return Ok(DeployConfig::default());
    }

    let content = io::read_file(&path, &format!("read {}", path.display()))?;

    let config: DeployConfig = serde_json::from_str(&content)
        .map_err(|e| Error::config_invalid_json(path.display().to_string(), e))?;

    config.validate()?;
    Ok(config)
}
