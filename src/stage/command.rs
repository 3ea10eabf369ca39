use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::process::Command;

use crate::config::StagesConfig;
use crate::error::{AppError, Result};
use crate::stage::{StageOutcome, StageRequest, StageRunner};

/// Runs stages as external processes, e.g. `npx playwright planner --request "..."`.
pub struct CommandStageRunner {
    program: String,
    base_args: Vec<String>,
    planner: String,
    generator: String,
    healer: String,
    timeout: Option<Duration>,
}

impl CommandStageRunner {
    pub fn new(config: &StagesConfig) -> Self {
        Self {
            program: config.program.clone(),
            base_args: config.base_args.clone(),
            planner: config.planner.clone(),
            generator: config.generator.clone(),
            healer: config.healer.clone(),
            timeout: config.timeout_secs.map(Duration::from_secs),
        }
    }

    /// Full argument list passed to the program for a stage.
    pub fn args_for(&self, request: &StageRequest) -> Vec<String> {
        let mut args = self.base_args.clone();
        match request {
            StageRequest::Plan { request } => {
                args.push(self.planner.clone());
                args.push("--request".to_string());
                args.push(request.clone());
            }
            StageRequest::Generate => args.push(self.generator.clone()),
            StageRequest::Heal => args.push(self.healer.clone()),
        }
        args
    }
}

#[async_trait]
impl StageRunner for CommandStageRunner {
    async fn run_stage(&self, request: &StageRequest, project_dir: &Path) -> Result<StageOutcome> {
        let stage = request.name();
        let args = self.args_for(request);
        let started_at = Utc::now();

        tracing::info!(
            stage = %stage,
            program = %self.program,
            dir = %project_dir.display(),
            "Launching stage"
        );

        // stdio is inherited so the agent's own progress output reaches the user
        let mut child = Command::new(&self.program)
            .args(&args)
            .current_dir(project_dir)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AppError::StageLaunch {
                stage,
                message: format!("could not start `{}`: {e}", self.program),
            })?;

        let status = match self.timeout {
            Some(limit) => {
                let waited = tokio::time::timeout(limit, child.wait()).await;
                match waited {
                    Ok(status) => status?,
                    Err(_) => {
                        tracing::error!(stage = %stage, secs = limit.as_secs(), "Stage timed out");
                        let _ = child.kill().await;
                        return Err(AppError::StageTimeout {
                            stage,
                            secs: limit.as_secs(),
                        });
                    }
                }
            }
            None => child.wait().await?,
        };

        let outcome =
            StageOutcome::new(stage, status.success(), started_at).with_exit_code(status.code());

        if outcome.success {
            tracing::info!(stage = %stage, duration_ms = outcome.duration_ms, "Stage succeeded");
        } else {
            tracing::warn!(stage = %stage, exit_code = ?status.code(), "Stage failed");
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::StageName;

    fn runner(program: &str) -> CommandStageRunner {
        CommandStageRunner::new(&StagesConfig {
            program: program.to_string(),
            base_args: vec![],
            ..StagesConfig::default()
        })
    }

    #[test]
    fn test_args_for_default_playwright_layout() {
        let runner = CommandStageRunner::new(&StagesConfig::default());

        assert_eq!(
            runner.args_for(&StageRequest::plan("Homepage contains a URL")),
            vec!["playwright", "planner", "--request", "Homepage contains a URL"]
        );
        assert_eq!(
            runner.args_for(&StageRequest::Generate),
            vec!["playwright", "generator"]
        );
        assert_eq!(runner.args_for(&StageRequest::Heal), vec!["playwright", "healer"]);
    }

    #[tokio::test]
    async fn test_missing_program_is_launch_error() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = runner("playmaker-definitely-not-a-real-program");

        let err = runner
            .run_stage(&StageRequest::Generate, tmp.path())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::StageLaunch {
                stage: StageName::Generate,
                ..
            }
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_zero_exit_is_success() {
        let tmp = tempfile::tempdir().unwrap();
        let outcome = runner("true")
            .run_stage(&StageRequest::plan("anything"), tmp.path())
            .await
            .unwrap();

        assert_eq!(outcome.stage, StageName::Plan);
        assert!(outcome.success);
        assert_eq!(outcome.exit_code, Some(0));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_failure_not_error() {
        let tmp = tempfile::tempdir().unwrap();
        let outcome = runner("false")
            .run_stage(&StageRequest::Heal, tmp.path())
            .await
            .unwrap();

        assert_eq!(outcome.stage, StageName::Heal);
        assert!(!outcome.success);
        assert_eq!(outcome.exit_code, Some(1));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_hung_stage() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = CommandStageRunner::new(&StagesConfig {
            program: "sh".to_string(),
            // the stage subcommand lands in $1 and is ignored
            base_args: vec!["-c".to_string(), "sleep 30".to_string(), "sh".to_string()],
            timeout_secs: Some(1),
            ..StagesConfig::default()
        });

        let err = runner
            .run_stage(&StageRequest::Generate, tmp.path())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::StageTimeout {
                stage: StageName::Generate,
                secs: 1
            }
        ));
    }
}
