pub mod command;

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::judge::Verdict;

pub use command::CommandStageRunner;

/// Identifies a pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageName {
    Plan,
    Generate,
    Heal,
    Judge,
}

impl StageName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::Plan => "plan",
            StageName::Generate => "generate",
            StageName::Heal => "heal",
            StageName::Judge => "judge",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stage backed by an external capability, with its stage-specific arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageRequest {
    /// Turn a natural-language request into a test plan.
    Plan { request: String },
    /// Generate test code from the plan.
    Generate,
    /// Repair failing tests.
    Heal,
}

impl StageRequest {
    pub fn plan(request: impl Into<String>) -> Self {
        StageRequest::Plan {
            request: request.into(),
        }
    }

    pub fn name(&self) -> StageName {
        match self {
            StageRequest::Plan { .. } => StageName::Plan,
            StageRequest::Generate => StageName::Generate,
            StageRequest::Heal => StageName::Heal,
        }
    }
}

/// Result of running one stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageOutcome {
    pub stage: StageName,
    pub success: bool,
    /// Raw process exit code, when the stage was an external process that exited normally.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Verdicts produced by a judge stage; empty for every other stage.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub verdicts: Vec<Verdict>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl StageOutcome {
    pub fn new(stage: StageName, success: bool, started_at: DateTime<Utc>) -> Self {
        let duration_ms = (Utc::now() - started_at).num_milliseconds().max(0) as u64;
        Self {
            stage,
            success,
            exit_code: None,
            verdicts: Vec::new(),
            started_at,
            duration_ms,
        }
    }

    pub fn with_exit_code(mut self, code: Option<i32>) -> Self {
        self.exit_code = code;
        self
    }

    /// Build the outcome of a judge stage. It succeeds only if no verdict failed,
    /// so an empty verdict set is a (vacuous) success.
    pub fn judged(verdicts: Vec<Verdict>, started_at: DateTime<Utc>) -> Self {
        let success = verdicts.iter().all(|v| v.passed());
        let mut outcome = Self::new(StageName::Judge, success, started_at);
        outcome.verdicts = verdicts;
        outcome
    }
}

/// Runs a single externally implemented stage in a project directory.
///
/// Implementations block the calling workflow until the capability terminates.
/// A capability that started and failed is `Ok` with `success == false`;
/// `Err(AppError::StageLaunch)` is reserved for a capability that could not start.
#[async_trait]
pub trait StageRunner: Send + Sync {
    async fn run_stage(&self, request: &StageRequest, project_dir: &Path) -> Result<StageOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn verdict(score: u32, threshold: u32) -> Verdict {
        Verdict::new(PathBuf::from("tests/a.spec.ts"), score, threshold, vec![], vec![])
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(StageRequest::plan("x").name(), StageName::Plan);
        assert_eq!(StageRequest::Generate.name(), StageName::Generate);
        assert_eq!(StageRequest::Heal.name(), StageName::Heal);
        assert_eq!(StageName::Judge.to_string(), "judge");
    }

    #[test]
    fn test_judged_outcome_fails_if_any_verdict_fails() {
        let outcome = StageOutcome::judged(vec![verdict(90, 70), verdict(40, 70)], Utc::now());
        assert_eq!(outcome.stage, StageName::Judge);
        assert!(!outcome.success);
        assert_eq!(outcome.verdicts.len(), 2);
    }

    #[test]
    fn test_judged_outcome_with_no_verdicts_succeeds() {
        let outcome = StageOutcome::judged(vec![], Utc::now());
        assert!(outcome.success);
    }

    #[test]
    fn test_outcome_serializes_lowercase_stage() {
        let outcome =
            StageOutcome::new(StageName::Generate, true, Utc::now()).with_exit_code(Some(0));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["stage"], "generate");
        assert_eq!(json["exit_code"], 0);
        assert!(json.get("verdicts").is_none());
    }
}
