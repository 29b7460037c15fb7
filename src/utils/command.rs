//! Command execution primitives with consistent error handling.
//!
//! Every helper takes the working directory explicitly; nothing here changes
//! the process-wide current directory.

use std::path::Path;
use std::process::Command;

use serde::Serialize;

use crate::error::{CommandFailedDetails, Error, Result};

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOutput {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stdout: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stderr: String,
    pub success: bool,
    pub exit_code: i32,
}

impl CommandOutput {
    fn from_output(output: std::process::Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            exit_code: output.status.code().unwrap_or(-1),
        }
    }

    /// Prefers stderr, falls back to stdout if stderr is empty.
    pub fn error_text(&self) -> String {
        if !self.stderr.trim().is_empty() {
            self.stderr.trim().to_string()
        } else {
            self.stdout.trim().to_string()
        }
    }
}

/// Render a program and its arguments for messages and error details.
pub fn describe(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run a program in `dir` and capture its output.
///
/// Only a failure to spawn is an error here; a non-zero exit is reported
/// through `CommandOutput::success`.
pub fn output_in(dir: &Path, program: &str, args: &[&str]) -> Result<CommandOutput> {
    Command::new(program)
        .args(args)
        .current_dir(dir)
        .output()
        .map(CommandOutput::from_output)
        .map_err(|e| {
            command_failed(
                program,
                CommandFailedDetails {
                    command: describe(program, args),
                    exit_code: -1,
                    working_dir: Some(dir.display().to_string()),
                    stdout: String::new(),
                    stderr: format!("Failed to run {}: {}", program, e),
                },
            )
        })
}

/// Run a program in `dir` and return trimmed stdout on success.
///
/// Returns an error carrying stdout/stderr if the program exits non-zero.
pub fn run_in(dir: &Path, program: &str, args: &[&str]) -> Result<String> {
    let output = output_in(dir, program, args)?;

    if !output.success {
        return Err(command_failed(
            program,
            CommandFailedDetails {
                command: describe(program, args),
                exit_code: output.exit_code,
                working_dir: Some(dir.display().to_string()),
                stdout: output.stdout.trim().to_string(),
                stderr: output.stderr.trim().to_string(),
            },
        ));
    }

    Ok(output.stdout.trim().to_string())
}

/// Run a shell command line (`sh -c` / `cmd /C`) in `dir`.
///
/// Build commands are arbitrary project scripts (`npm run-script build`,
/// `make site && cp CNAME build/`), so they go through the shell.
pub fn run_shell_in(command: &str, dir: &Path) -> CommandOutput {
    #[cfg(windows)]
    let mut cmd = {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    };

    #[cfg(not(windows))]
    let mut cmd = {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    };

    cmd.current_dir(dir);

    match cmd.output() {
        Ok(out) => CommandOutput::from_output(out),
        Err(e) => CommandOutput {
            stdout: String::new(),
            stderr: format!("Command error: {}", e),
            success: false,
            exit_code: -1,
        },
    }
}

fn command_failed(program: &str, details: CommandFailedDetails) -> Error {
    if program == "git" {
        Error::git_command_failed(details)
    } else {
        Error::external_command_failed(details)
    }
}
