//! CLI response formatting and output.
//!
//! Provides JSON envelope, printing, and exit code mapping.

use ghpages_push::error::Hint;
use ghpages_push::{Error, ErrorCategory, Result};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct CliResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CliError>,
}

#[derive(Debug, Serialize)]
pub struct CliError {
    pub code: String,
    pub category: ErrorCategory,
    pub message: String,
    pub details: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hints: Option<Vec<Hint>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl<T: Serialize> CliResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            Error::internal_json(e.to_string(), Some("serialize response".to_string()))
        })
    }
}

impl CliResponse<()> {
    pub fn from_error(err: &Error) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(CliError {
                code: err.code.as_str().to_string(),
                category: err.category(),
                message: err.message.clone(),
                details: err.details.clone(),
                hints: if err.hints.is_empty() {
                    None
                } else {
                    Some(err.hints.clone())
                },
                retryable: err.retryable,
            }),
        }
    }
}

fn print_response<T: Serialize>(response: &CliResponse<T>) -> Result<()> {
    use std::io::{self, Write};

    let payload = response.to_json()?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", payload) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            return Ok(()); // Exit gracefully on SIGPIPE
        }
        return Err(Error::internal_io(
            e.to_string(),
            Some("write stdout".to_string()),
        ));
    }
    Ok(())
}

/// Print the envelope for a result and return the process exit code.
pub fn print_result<T: Serialize>(result: Result<T>) -> i32 {
    let (printed, exit_code) = match result {
        Ok(data) => (print_response(&CliResponse::success(data)), 0),
        Err(err) => {
            eprintln!("error: {}", describe_error(&err));
            (
                print_response(&CliResponse::<()>::from_error(&err)),
                exit_code_for_error(&err),
            )
        }
    };

    match printed {
        Ok(()) => exit_code,
        Err(err) => {
            eprintln!("error: {}", err);
            exit_code.max(1)
        }
    }
}

/// One-line summary naming the failing stage when the pipeline tagged one.
pub fn describe_error(err: &Error) -> String {
    match err.details.get("stage").and_then(|s| s.as_str()) {
        Some(stage) => format!("{} (stage: {})", err.message, stage),
        None => err.message.clone(),
    }
}

pub fn exit_code_for_error(err: &Error) -> i32 {
    match err.category() {
        ErrorCategory::Configuration => 2,
        ErrorCategory::Precondition => 3,
        ErrorCategory::Format => 4,
        ErrorCategory::Build | ErrorCategory::ExternalCommand => 20,
        ErrorCategory::Io | ErrorCategory::Internal => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghpages_push::error::{CommandFailedDetails, ErrorCode};

    fn build_error() -> Error {
        Error::build_failed(CommandFailedDetails {
            command: "npm run-script build".to_string(),
            exit_code: 1,
            working_dir: None,
            stdout: String::new(),
            stderr: "Module not found".to_string(),
        })
    }

    #[test]
    fn error_envelope_carries_code_category_and_hints() {
        let json = CliResponse::<()>::from_error(&build_error()).to_json().unwrap();

        assert!(json.contains("\"success\": false"));
        assert!(json.contains("\"code\": \"build.failed\""));
        assert!(json.contains("\"category\": \"build\""));
        assert!(json.contains("Module not found"));
        assert!(json.contains("\"hints\""));
    }

    #[test]
    fn success_envelope_omits_error() {
        let json = CliResponse::success(serde_json::json!({"version": "v1.0.1"}))
            .to_json()
            .unwrap();
        assert!(json.contains("\"version\": \"v1.0.1\""));
        assert!(!json.contains("\"error\""));
    }

    #[test]
    fn exit_codes_follow_categories() {
        assert_eq!(
            exit_code_for_error(&Error::deploy_repo_not_found("../p", "../p/.version")),
            2
        );
        assert_eq!(
            exit_code_for_error(&Error::precondition_wrong_branch("master", "dev")),
            3
        );
        assert_eq!(
            exit_code_for_error(&Error::version_invalid_format(".version", "1.0", "x")),
            4
        );
        assert_eq!(exit_code_for_error(&build_error()), 20);
        assert_eq!(exit_code_for_error(&Error::internal_io("x", None)), 1);
    }

    #[test]
    fn every_code_maps_to_non_zero_exit() {
        for code in ghpages_push::error::codes::all_codes() {
            let err = Error::new(*code, "x", serde_json::Value::Null);
            assert!(exit_code_for_error(&err) > 0, "{:?}", code);
        }
        assert_eq!(ErrorCode::BuildFailed.category(), ErrorCategory::Build);
    }

    #[test]
    fn describe_error_mentions_stage() {
        let err = build_error().with_detail("stage", "build");
        assert_eq!(
            describe_error(&err),
            "Build command failed with exit code 1 (stage: build)"
        );
    }
}
