use std::path::PathBuf;

use serde::Serialize;

use crate::judge::Verdict;
use crate::stage::{StageName, StageOutcome};

/// Settings fixed for the lifetime of an orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Working directory for every stage; stages hand off through files here.
    pub project_dir: PathBuf,
    /// Passed unchanged to every evaluation in a run.
    pub judge_threshold: u32,
}

/// Stage outcomes of one workflow run, in execution order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkflowReport {
    outcomes: Vec<StageOutcome>,
}

impl WorkflowReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, outcome: StageOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[StageOutcome] {
        &self.outcomes
    }

    pub fn stages(&self) -> Vec<StageName> {
        self.outcomes.iter().map(|o| o.stage).collect()
    }

    pub fn last(&self) -> Option<&StageOutcome> {
        self.outcomes.last()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// True when the run stopped on a failed plan, generate or heal stage.
    /// A failing final judge is a completed run, not an aborted one.
    pub fn aborted(&self) -> bool {
        matches!(self.last(), Some(o) if !o.success && o.stage != StageName::Judge)
    }

    /// True when the run reached a judge stage and its final verdicts all passed.
    pub fn passed(&self) -> bool {
        matches!(self.last(), Some(o) if o.success && o.stage == StageName::Judge)
    }

    /// Verdicts of the last judge stage, if one ran.
    pub fn final_verdicts(&self) -> &[Verdict] {
        self.outcomes
            .iter()
            .rev()
            .find(|o| o.stage == StageName::Judge)
            .map(|o| o.verdicts.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn outcome(stage: StageName, success: bool) -> StageOutcome {
        StageOutcome::new(stage, success, Utc::now())
    }

    #[test]
    fn test_failed_plan_is_aborted() {
        let mut report = WorkflowReport::new();
        report.push(outcome(StageName::Plan, false));
        assert!(report.aborted());
        assert!(!report.passed());
        assert!(report.final_verdicts().is_empty());
    }

    #[test]
    fn test_failed_judge_is_completed_not_aborted() {
        let mut report = WorkflowReport::new();
        report.push(outcome(StageName::Plan, true));
        report.push(outcome(StageName::Generate, true));
        report.push(outcome(StageName::Judge, false));
        assert!(!report.aborted());
        assert!(!report.passed());
        assert_eq!(
            report.stages(),
            vec![StageName::Plan, StageName::Generate, StageName::Judge]
        );
    }

    #[test]
    fn test_final_verdicts_come_from_last_judge() {
        let first = Verdict::new(PathBuf::from("a.spec.ts"), 40, 70, vec![], vec![]);
        let second = Verdict::new(PathBuf::from("a.spec.ts"), 90, 70, vec![], vec![]);

        let mut report = WorkflowReport::new();
        report.push(StageOutcome::judged(vec![first], Utc::now()));
        report.push(outcome(StageName::Heal, true));
        report.push(StageOutcome::judged(vec![second], Utc::now()));

        assert!(report.passed());
        assert_eq!(report.final_verdicts().len(), 1);
        assert_eq!(report.final_verdicts()[0].score(), 90);
    }
}
