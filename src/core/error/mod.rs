use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod codes;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigDeployRepoNotFound,
    ConfigInvalidJson,
    ConfigInvalidValue,

    PreconditionWrongBranch,
    PreconditionUncommittedChanges,
    PreconditionUntrackedFiles,

    BuildFailed,

    VersionInvalidFormat,

    GitCommandFailed,
    ExternalCommandFailed,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

/// Coarse error taxonomy. Every code belongs to exactly one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Configuration,
    Precondition,
    Build,
    Io,
    Format,
    ExternalCommand,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigDeployRepoNotFound => "config.deploy_repo_not_found",
            ErrorCode::ConfigInvalidJson => "config.invalid_json",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",

            ErrorCode::PreconditionWrongBranch => "precondition.wrong_branch",
            ErrorCode::PreconditionUncommittedChanges => "precondition.uncommitted_changes",
            ErrorCode::PreconditionUntrackedFiles => "precondition.untracked_files",

            ErrorCode::BuildFailed => "build.failed",

            ErrorCode::VersionInvalidFormat => "version.invalid_format",

            ErrorCode::GitCommandFailed => "git.command_failed",
            ErrorCode::ExternalCommandFailed => "external.command_failed",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ErrorCode::ConfigDeployRepoNotFound
            | ErrorCode::ConfigInvalidJson
            | ErrorCode::ConfigInvalidValue => ErrorCategory::Configuration,

            ErrorCode::PreconditionWrongBranch
            | ErrorCode::PreconditionUncommittedChanges
            | ErrorCode::PreconditionUntrackedFiles => ErrorCategory::Precondition,

            ErrorCode::BuildFailed => ErrorCategory::Build,

            ErrorCode::VersionInvalidFormat => ErrorCategory::Format,

            ErrorCode::GitCommandFailed | ErrorCode::ExternalCommandFailed => {
                ErrorCategory::ExternalCommand
            }

            ErrorCode::InternalIoError => ErrorCategory::Io,

            ErrorCode::InternalJsonError | ErrorCode::InternalUnexpected => {
                ErrorCategory::Internal
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
    pub retryable: Option<bool>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployRepoNotFoundDetails {
    pub deploy_repo_dir: String,
    pub version_file: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidJsonDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WrongBranchDetails {
    pub expected: String,
    pub actual: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirtyTreeDetails {
    pub path: String,
    pub files: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandFailedDetails {
    pub command: String,
    pub exit_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInvalidFormatDetails {
    pub path: String,
    pub content: String,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalJsonErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
            retryable: None,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    pub fn deploy_repo_not_found(
        deploy_repo_dir: impl Into<String>,
        version_file: impl Into<String>,
    ) -> Self {
        let details = to_details(DeployRepoNotFoundDetails {
            deploy_repo_dir: deploy_repo_dir.into(),
            version_file: version_file.into(),
        });

        Self::new(
            ErrorCode::ConfigDeployRepoNotFound,
            "deploy repo dir not found",
            details,
        )
        .with_hint("Clone the pages repository next to this one, or set deploy_repo_dir in ghpages-push.json")
    }

    pub fn config_invalid_json(path: impl Into<String>, err: serde_json::Error) -> Self {
        let details = to_details(ConfigInvalidJsonDetails {
            path: path.into(),
            error: err.to_string(),
        });

        Self::new(
            ErrorCode::ConfigInvalidJson,
            "Invalid JSON in configuration",
            details,
        )
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        let details = to_details(ConfigInvalidValueDetails {
            key: key.into(),
            value,
            problem: problem.into(),
        });

        Self::new(
            ErrorCode::ConfigInvalidValue,
            "Invalid configuration value",
            details,
        )
    }

    pub fn precondition_wrong_branch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        let expected = expected.into();
        let details = to_details(WrongBranchDetails {
            expected: expected.clone(),
            actual: actual.into(),
        });

        Self::new(
            ErrorCode::PreconditionWrongBranch,
            format!("not on branch: {}", expected),
            details,
        )
        .with_hint(format!("Run 'git checkout {}' and try again", expected))
    }

    pub fn precondition_uncommitted_changes(path: impl Into<String>, files: Vec<String>) -> Self {
        let details = to_details(DirtyTreeDetails {
            path: path.into(),
            files,
        });

        Self::new(
            ErrorCode::PreconditionUncommittedChanges,
            "there are uncommitted changes",
            details,
        )
        .with_hint("Commit or stash your changes before deploying")
    }

    pub fn precondition_untracked_files(path: impl Into<String>, files: Vec<String>) -> Self {
        let details = to_details(DirtyTreeDetails {
            path: path.into(),
            files,
        });

        Self::new(
            ErrorCode::PreconditionUntrackedFiles,
            "there are untracked files",
            details,
        )
        .with_hint("Add, remove, or ignore untracked files before deploying")
    }

    pub fn build_failed(details: CommandFailedDetails) -> Self {
        let message = format!("Build command failed with exit code {}", details.exit_code);
        Self::new(ErrorCode::BuildFailed, message, to_details(details))
            .with_hint("Fix the build and rerun; nothing was published")
    }

    pub fn version_invalid_format(
        path: impl Into<String>,
        content: impl Into<String>,
        problem: impl Into<String>,
    ) -> Self {
        let details = to_details(VersionInvalidFormatDetails {
            path: path.into(),
            content: content.into(),
            problem: problem.into(),
        });

        Self::new(
            ErrorCode::VersionInvalidFormat,
            "version file not recognized",
            details,
        )
        .with_hint("The version file must contain a single line like 'v1.2.3'")
    }

    pub fn git_command_failed(details: CommandFailedDetails) -> Self {
        let message = format!("{} failed", details.command);
        Self::new(ErrorCode::GitCommandFailed, message, to_details(details))
    }

    pub fn external_command_failed(details: CommandFailedDetails) -> Self {
        let message = format!("{} failed", details.command);
        Self::new(ErrorCode::ExternalCommandFailed, message, to_details(details))
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalIoErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalIoError, "IO error", details)
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalJsonErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalJsonError, "JSON error", details)
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InternalUnexpected,
            "Unexpected error",
            serde_json::json!({ "error": error.into() }),
        )
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }

    /// Insert a key into the details object. Non-object details are wrapped first.
    pub fn with_detail(mut self, key: &str, value: impl Serialize) -> Self {
        if !self.details.is_object() {
            let previous = std::mem::take(&mut self.details);
            let mut map = serde_json::Map::new();
            if !previous.is_null() {
                map.insert("value".to_string(), previous);
            }
            self.details = Value::Object(map);
        }

        if let Value::Object(map) = &mut self.details {
            map.insert(key.to_string(), to_details(value));
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_code_has_a_dotted_name() {
        for code in codes::all_codes() {
            assert!(code.as_str().contains('.'), "{:?}", code);
        }
    }

    #[test]
    fn categories_follow_the_taxonomy() {
        assert_eq!(
            ErrorCode::ConfigDeployRepoNotFound.category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            ErrorCode::PreconditionUntrackedFiles.category(),
            ErrorCategory::Precondition
        );
        assert_eq!(ErrorCode::BuildFailed.category(), ErrorCategory::Build);
        assert_eq!(ErrorCode::InternalIoError.category(), ErrorCategory::Io);
        assert_eq!(ErrorCode::VersionInvalidFormat.category(), ErrorCategory::Format);
        assert_eq!(
            ErrorCode::GitCommandFailed.category(),
            ErrorCategory::ExternalCommand
        );
    }

    #[test]
    fn deploy_repo_not_found_message_is_stable() {
        let err = Error::deploy_repo_not_found("../pages", "../pages/.version");
        assert_eq!(err.to_string(), "deploy repo dir not found");
        assert_eq!(err.details["deployRepoDir"], "../pages");
        assert_eq!(err.hints.len(), 1);
    }

    #[test]
    fn with_detail_extends_object_details() {
        let err = Error::internal_io("boom", Some("copy".to_string())).with_detail("stage", "publish");
        assert_eq!(err.details["error"], "boom");
        assert_eq!(err.details["stage"], "publish");
    }

    #[test]
    fn with_detail_wraps_non_object_details() {
        let err = Error::new(ErrorCode::InternalUnexpected, "x", Value::String("raw".into()))
            .with_detail("stage", "build");
        assert_eq!(err.details["value"], "raw");
        assert_eq!(err.details["stage"], "build");
    }
}
