use super::ErrorCode;

pub fn all_codes() -> &'static [ErrorCode] {
    &[
        ErrorCode::ConfigDeployRepoNotFound,
        ErrorCode::ConfigInvalidJson,
        ErrorCode::ConfigInvalidValue,
        ErrorCode::PreconditionWrongBranch,
        ErrorCode::PreconditionUncommittedChanges,
        ErrorCode::PreconditionUntrackedFiles,
        ErrorCode::BuildFailed,
        ErrorCode::VersionInvalidFormat,
        ErrorCode::GitCommandFailed,
        ErrorCode::ExternalCommandFailed,
        ErrorCode::InternalIoError,
        ErrorCode::InternalJsonError,
        ErrorCode::InternalUnexpected,
    ]
}

pub fn parse_code(code: &str) -> Option<ErrorCode> {
    all_codes()
        .iter()
        .copied()
        .find(|candidate| candidate.as_str() == code)
}
