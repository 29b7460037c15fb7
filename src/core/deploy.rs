//! The deploy pipeline: validate, build, publish, bump, push deploy repo, tag source.
//!
//! Each stage moves the run one state forward. The first failure aborts the
//! run; nothing already done is rolled back. The error is tagged with the
//! failing stage and the last state reached so the operator knows where the
//! two repositories stand.

use serde::Serialize;
use std::path::Path;

use crate::build::{self, BuildOutput};
use crate::config::{self, DeployConfig, DeployPaths};
use crate::error::{Error, Result};
use crate::git;
use crate::preflight::{self, PreflightReport};
use crate::publish::{self, PublishOutput};
use crate::version::{self, VersionBump};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Start,
    Validated,
    Built,
    Published,
    Versioned,
    DeployPushed,
    SourceTagged,
    Done,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validate,
    Build,
    Publish,
    Version,
    DeployPush,
    SourceTag,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Validate,
        Stage::Build,
        Stage::Publish,
        Stage::Version,
        Stage::DeployPush,
        Stage::SourceTag,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Validate => "validate",
            Stage::Build => "build",
            Stage::Publish => "publish",
            Stage::Version => "version",
            Stage::DeployPush => "deploy_push",
            Stage::SourceTag => "source_tag",
        }
    }

    /// State the run is in before this stage starts.
    pub fn from_state(&self) -> RunState {
        match self {
            Stage::Validate => RunState::Start,
            Stage::Build => RunState::Validated,
            Stage::Publish => RunState::Built,
            Stage::Version => RunState::Published,
            Stage::DeployPush => RunState::Versioned,
            Stage::SourceTag => RunState::DeployPushed,
        }
    }

    /// State reached once this stage succeeds.
    pub fn completes_into(&self) -> RunState {
        match self {
            Stage::Validate => RunState::Validated,
            Stage::Build => RunState::Built,
            Stage::Publish => RunState::Published,
            Stage::Version => RunState::Versioned,
            Stage::DeployPush => RunState::DeployPushed,
            Stage::SourceTag => RunState::SourceTagged,
        }
    }
}

/// Forward-only progress tracker for one run.
#[derive(Debug)]
pub struct RunTracker {
    state: RunState,
}

impl Default for RunTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RunTracker {
    pub fn new() -> Self {
        Self {
            state: RunState::Start,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Run one stage. On success the state advances; on failure the error is
    /// tagged with the stage and the state reached, and the tracker aborts.
    pub fn step<T>(&mut self, stage: Stage, op: impl FnOnce() -> Result<T>) -> Result<T> {
        if self.state != stage.from_state() {
            return Err(Error::internal_unexpected(format!(
                "stage {} cannot run from state {:?}",
                stage.as_str(),
                self.state
            )));
        }

        match op() {
            Ok(value) => {
                self.state = stage.completes_into();
                Ok(value)
            }
            Err(err) => {
                let reached = self.state;
                self.state = RunState::Aborted;
                Err(err
                    .with_detail("stage", stage)
                    .with_detail("reached", reached))
            }
        }
    }

    pub fn finish(&mut self) -> RunState {
        if self.state == RunState::SourceTagged {
            self.state = RunState::Done;
        }
        self.state
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployRun {
    pub previous_version: String,
    pub version: String,
    pub tag: String,
    pub deploy_commit: String,
    pub branch: String,
    pub paths: DeployPaths,
    pub build: BuildOutput,
    pub publish: PublishOutput,
    pub state: RunState,
    pub message: String,
}

/// Load config from the source directory and run the full pipeline.
pub fn run_in(source_dir: &Path) -> Result<DeployRun> {
    let config = config::load(source_dir)?;
    run(&config, source_dir)
}

/// Run the full pipeline for an explicit config and source directory.
pub fn run(config: &DeployConfig, source_dir: &Path) -> Result<DeployRun> {
    let paths = config.resolve(source_dir);
    let mut tracker = RunTracker::new();

    let preflight: PreflightReport =
        tracker.step(Stage::Validate, || preflight::run(config, &paths))?;

    let build: BuildOutput = tracker.step(Stage::Build, || build::run(config, &paths))?;

    let publish: PublishOutput = tracker.step(Stage::Publish, || publish::run(config, &paths))?;

    let bump: VersionBump =
        tracker.step(Stage::Version, || version::update_marker(&paths.version_file))?;

    let deploy_commit = tracker.step(Stage::DeployPush, || {
        push_deploy_repo(&paths.deploy_repo_dir, &bump.version)
    })?;

    tracker
        .step(Stage::SourceTag, || tag_source(&paths.source_dir, &bump.version))
        .map_err(|err| with_resync_hint(err, &paths.source_dir, &bump.version))?;

    let state = tracker.finish();
    let message = format!("Successfully pushed version {}!", bump.version);
    log_status!("deploy", "{}", message);

    Ok(DeployRun {
        previous_version: bump.previous,
        tag: bump.version.clone(),
        version: bump.version,
        deploy_commit,
        branch: preflight.branch,
        paths,
        build,
        publish,
        state,
        message,
    })
}

fn push_deploy_repo(deploy_dir: &Path, version: &str) -> Result<String> {
    git::add_all(deploy_dir)?;
    git::commit(deploy_dir, version)?;
    let commit = git::head_commit(deploy_dir)?;
    log_status!("git", "Committed {} in {}", version, deploy_dir.display());

    git::push(deploy_dir)?;
    log_status!("git", "Pushed {}", deploy_dir.display());
    Ok(commit)
}

fn tag_source(source_dir: &Path, version: &str) -> Result<()> {
    git::tag(source_dir, version)?;
    git::push_tags(source_dir)?;
    log_status!("git", "Tagged {} and pushed tags", version);
    Ok(())
}

/// The deploy repo is already published when tagging fails. The manual
/// follow-up depends on whether the tag made it into the source repo.
fn with_resync_hint(err: Error, source_dir: &Path, version: &str) -> Error {
    let hint = if git::tag_exists(source_dir, version).unwrap_or(false) {
        format!(
            "Deploy repo already pushed {}; tag {} exists locally, finish by hand with 'git push --tags'",
            version, version
        )
    } else {
        format!(
            "Deploy repo already pushed {}; finish by hand with 'git tag {} && git push --tags'",
            version, version
        )
    };
    err.with_hint(hint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn stages_chain_without_gaps() {
        let mut previous = RunState::Start;
        for stage in Stage::ALL {
            assert_eq!(stage.from_state(), previous);
            previous = stage.completes_into();
        }
        assert_eq!(previous, RunState::SourceTagged);
    }

    #[test]
    fn tracker_advances_through_every_stage() {
        let mut tracker = RunTracker::new();
        for stage in Stage::ALL {
            tracker.step(stage, || Ok(())).unwrap();
            assert_eq!(tracker.state(), stage.completes_into());
        }
        assert_eq!(tracker.finish(), RunState::Done);
    }

    #[test]
    fn tracker_tags_failures_and_aborts() {
        let mut tracker = RunTracker::new();
        tracker.step(Stage::Validate, || Ok(())).unwrap();

        let err = tracker
            .step(Stage::Build, || -> Result<()> {
                Err(Error::internal_io("disk full", None))
            })
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::InternalIoError);
        assert_eq!(err.details["stage"], "build");
        assert_eq!(err.details["reached"], "validated");
        assert_eq!(tracker.state(), RunState::Aborted);
        assert_eq!(tracker.finish(), RunState::Aborted);
    }

    #[test]
    fn tracker_refuses_out_of_order_stages() {
        let mut tracker = RunTracker::new();
        let err = tracker.step(Stage::Publish, || Ok(())).unwrap_err();
        assert_eq!(err.code, ErrorCode::InternalUnexpected);
        assert_eq!(tracker.state(), RunState::Start);
    }

    #[test]
    fn tracker_never_moves_backward_after_abort() {
        let mut tracker = RunTracker::new();
        let _ = tracker.step(Stage::Validate, || -> Result<()> {
            Err(Error::internal_unexpected("nope"))
        });
        assert!(tracker.step(Stage::Validate, || Ok(())).is_err());
        assert_eq!(tracker.state(), RunState::Aborted);
    }

    #[test]
    fn resync_hint_creates_tag_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = with_resync_hint(
            Error::internal_unexpected("tag failed"),
            dir.path(),
            "v1.2.10",
        );
        assert!(err.hints[0]
            .message
            .contains("'git tag v1.2.10 && git push --tags'"));
    }

    #[cfg(unix)]
    #[test]
    fn resync_hint_only_pushes_existing_tag() {
        use std::process::Command;

        let dir = tempfile::tempdir().unwrap();
        for args in [
            vec!["init", "-q"],
            vec!["config", "user.name", "Test"],
            vec!["config", "user.email", "test@example.com"],
            vec!["config", "commit.gpgsign", "false"],
            vec!["commit", "-q", "--allow-empty", "-m", "initial"],
            vec!["tag", "v1.2.10"],
        ] {
            let status = Command::new("git")
                .args(&args)
                .current_dir(dir.path())
                .status()
                .unwrap();
            assert!(status.success());
        }

        let err = with_resync_hint(
            Error::internal_unexpected("push rejected"),
            dir.path(),
            "v1.2.10",
        );
        let hint = &err.hints[0].message;
        assert!(hint.contains("'git push --tags'"), "{}", hint);
        assert!(!hint.contains("'git tag"), "{}", hint);
    }
}
