use std::path::Path;

use chrono::Utc;

use crate::error::Result;
use crate::judge::{Evaluator, Verdict};
use crate::stage::{StageOutcome, StageRequest, StageRunner};
use crate::workflow::types::{OrchestratorConfig, WorkflowReport};

/// Sequences plan, generate, judge and heal stages and gates on judge verdicts.
///
/// Stages run one at a time. Stage failures are recorded in the report and end
/// the run; only environment errors (launch failures, unusable verdicts) are
/// returned as `Err`. Nothing is retried.
pub struct Orchestrator {
    config: OrchestratorConfig,
    runner: Box<dyn StageRunner>,
    evaluator: Box<dyn Evaluator>,
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        runner: Box<dyn StageRunner>,
        evaluator: Box<dyn Evaluator>,
    ) -> Self {
        Self {
            config,
            runner,
            evaluator,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run one external stage on its own.
    pub async fn run_single_stage(&self, request: &StageRequest) -> Result<StageOutcome> {
        self.runner
            .run_stage(request, &self.config.project_dir)
            .await
    }

    /// plan → generate → judge.
    pub async fn workflow_plan_generate_judge(&self, request: &str) -> Result<WorkflowReport> {
        let mut report = WorkflowReport::new();

        if !self.plan_and_generate(request, &mut report).await? {
            return Ok(report);
        }

        report.push(self.judge_stage().await?);
        self.log_finished(&report);
        Ok(report)
    }

    /// plan → generate → judge, then on a failing judge one heal → judge cycle.
    ///
    /// The repair cycle runs at most once; the second judge is final.
    pub async fn workflow_full(&self, request: &str) -> Result<WorkflowReport> {
        let mut report = WorkflowReport::new();

        if !self.plan_and_generate(request, &mut report).await? {
            return Ok(report);
        }

        let first_judge = self.judge_stage().await?;
        let needs_healing = !first_judge.success;
        report.push(first_judge);

        if needs_healing {
            tracing::info!("Judge verdict below threshold, healing");

            if !self.run_into(&StageRequest::Heal, &mut report).await? {
                return Ok(report);
            }

            report.push(self.judge_stage().await?);
        }

        self.log_finished(&report);
        Ok(report)
    }

    /// Judge whatever tests already exist in the project directory.
    ///
    /// Read-only: no stage runs and nothing is written. An empty suite yields
    /// an empty list.
    pub async fn judge_existing_tests(&self) -> Result<Vec<Verdict>> {
        let verdicts = self.evaluate_suite().await?;
        if verdicts.is_empty() {
            tracing::warn!(
                dir = %self.config.project_dir.display(),
                "No tests found to judge"
            );
        }
        Ok(verdicts)
    }

    /// Judge a single test file against the configured threshold.
    pub async fn judge_file(&self, artifact: &Path) -> Result<Verdict> {
        self.evaluator
            .evaluate(artifact, self.config.judge_threshold)
            .await
    }

    /// Returns false when the run must stop because a stage failed.
    async fn plan_and_generate(&self, request: &str, report: &mut WorkflowReport) -> Result<bool> {
        tracing::info!(request, threshold = self.config.judge_threshold, "Starting workflow");

        if !self.run_into(&StageRequest::plan(request), report).await? {
            return Ok(false);
        }
        self.run_into(&StageRequest::Generate, report).await
    }

    async fn run_into(&self, request: &StageRequest, report: &mut WorkflowReport) -> Result<bool> {
        let outcome = self.run_single_stage(request).await?;
        let success = outcome.success;
        if !success {
            tracing::warn!(stage = %outcome.stage, "Stage failed, aborting workflow");
        }
        report.push(outcome);
        Ok(success)
    }

    async fn judge_stage(&self) -> Result<StageOutcome> {
        let started_at = Utc::now();
        let verdicts = self.evaluate_suite().await?;

        if verdicts.is_empty() {
            tracing::warn!(
                dir = %self.config.project_dir.display(),
                "No tests found to judge; treating judge stage as passed"
            );
        }

        let outcome = StageOutcome::judged(verdicts, started_at);
        tracing::info!(
            verdicts = outcome.verdicts.len(),
            failed = outcome.verdicts.iter().filter(|v| !v.passed()).count(),
            success = outcome.success,
            "Judge stage finished"
        );
        Ok(outcome)
    }

    async fn evaluate_suite(&self) -> Result<Vec<Verdict>> {
        self.evaluator
            .evaluate_suite(&self.config.project_dir, self.config.judge_threshold)
            .await
    }

    fn log_finished(&self, report: &WorkflowReport) {
        tracing::info!(
            stages = report.len(),
            passed = report.passed(),
            "Workflow finished"
        );
    }
}
