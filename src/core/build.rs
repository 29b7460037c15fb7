use serde::Serialize;

use crate::config::{DeployConfig, DeployPaths};
use crate::error::{CommandFailedDetails, Error, Result};
use crate::utils::{command, io};

/// Lines of build output kept in a failure report.
const ERROR_TAIL_LINES: usize = 40;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOutput {
    pub build_command: String,
    pub build_dir: String,
    pub removed_previous: bool,
    pub exit_code: i32,
}

/// Delete the previous build output. Succeeds when there is none.
pub fn clean(paths: &DeployPaths) -> Result<bool> {
    io::remove_dir_if_exists(&paths.build_dir, "remove build output")
}

/// Remove stale output, run the build command in the source directory and
/// require the build directory to exist afterwards.
pub fn run(config: &DeployConfig, paths: &DeployPaths) -> Result<BuildOutput> {
    let removed_previous = clean(paths)?;
    if removed_previous {
        log_status!("build", "Removed {}", paths.build_dir.display());
    }

    log_status!("build", "Running '{}'", config.build_command);
    let output = command::run_shell_in(&config.build_command, &paths.source_dir);

    if !output.success {
        return Err(Error::build_failed(CommandFailedDetails {
            command: config.build_command.clone(),
            exit_code: output.exit_code,
            working_dir: Some(paths.source_dir.display().to_string()),
            stdout: tail(&output.stdout, ERROR_TAIL_LINES),
            stderr: tail(&output.stderr, ERROR_TAIL_LINES),
        }));
    }

    if !paths.build_dir.is_dir() {
        return Err(Error::build_failed(CommandFailedDetails {
            command: config.build_command.clone(),
            exit_code: output.exit_code,
            working_dir: Some(paths.source_dir.display().to_string()),
            stdout: tail(&output.stdout, ERROR_TAIL_LINES),
            stderr: format!(
                "build finished but produced no output directory at {}",
                paths.build_dir.display()
            ),
        }));
    }

    Ok(BuildOutput {
        build_command: config.build_command.clone(),
        build_dir: paths.build_dir.display().to_string(),
        removed_previous,
        exit_code: output.exit_code,
    })
}

fn tail(text: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = text.trim_end().lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::fs;

    fn config_with(command: &str) -> DeployConfig {
        DeployConfig {
            build_command: command.to_string(),
            ..DeployConfig::default()
        }
    }

    #[test]
    fn tail_keeps_last_lines() {
        assert_eq!(tail("a\nb\nc\n", 2), "b\nc");
        assert_eq!(tail("a", 5), "a");
        assert_eq!(tail("", 5), "");
    }

    #[test]
    fn clean_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DeployConfig::default().resolve(dir.path());
        assert!(!clean(&paths).unwrap());

        fs::create_dir_all(paths.build_dir.join("static")).unwrap();
        assert!(clean(&paths).unwrap());
        assert!(!paths.build_dir.exists());
    }

    #[cfg(unix)]
    #[test]
    fn run_replaces_stale_output() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with("mkdir -p build && echo fresh > build/index.html");
        let paths = config.resolve(dir.path());
        fs::create_dir_all(&paths.build_dir).unwrap();
        fs::write(paths.build_dir.join("stale.js"), "old").unwrap();

        let output = run(&config, &paths).unwrap();

        assert!(output.removed_previous);
        assert!(!paths.build_dir.join("stale.js").exists());
        assert_eq!(
            fs::read_to_string(paths.build_dir.join("index.html")).unwrap(),
            "fresh\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn failing_build_is_build_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with("echo compiling; echo 'syntax error' >&2; exit 2");
        let paths = config.resolve(dir.path());

        let err = run(&config, &paths).unwrap_err();

        assert_eq!(err.code, ErrorCode::BuildFailed);
        assert_eq!(err.details["exitCode"], 2);
        assert_eq!(err.details["stderr"], "syntax error");
        assert_eq!(err.details["stdout"], "compiling");
    }

    #[cfg(unix)]
    #[test]
    fn build_without_output_dir_is_build_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with("true");
        let paths = config.resolve(dir.path());

        let err = run(&config, &paths).unwrap_err();
        assert_eq!(err.code, ErrorCode::BuildFailed);
    }
}
