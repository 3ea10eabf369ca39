use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::JudgeConfig;
use crate::error::{AppError, Result};
use crate::judge::claude::ClaudeClient;
use crate::judge::{discover_tests, prompt, Evaluator, Verdict};

/// Judges test files by asking Claude for a structured score.
pub struct ClaudeEvaluator {
    client: ClaudeClient,
    test_suffixes: Vec<String>,
    max_file_size: u64,
    timeout: Option<Duration>,
}

impl ClaudeEvaluator {
    pub fn new(client: ClaudeClient, config: &JudgeConfig) -> Self {
        Self {
            client,
            test_suffixes: config.test_suffixes.clone(),
            max_file_size: config.max_file_size_bytes,
            timeout: config.timeout_secs.map(Duration::from_secs),
        }
    }

    async fn read_artifact(&self, artifact: &Path) -> Result<String> {
        let metadata = tokio::fs::metadata(artifact).await.map_err(|e| {
            AppError::Evaluation(format!("test file not found: {}: {e}", artifact.display()))
        })?;

        if !metadata.is_file() {
            return Err(AppError::Evaluation(format!(
                "{} is not a file",
                artifact.display()
            )));
        }

        if metadata.len() > self.max_file_size {
            return Err(AppError::Evaluation(format!(
                "{} is too large to judge ({} bytes, max {})",
                artifact.display(),
                metadata.len(),
                self.max_file_size
            )));
        }

        tokio::fs::read_to_string(artifact).await.map_err(|e| {
            AppError::Evaluation(format!("failed to read {}: {e}", artifact.display()))
        })
    }
}

#[async_trait]
impl Evaluator for ClaudeEvaluator {
    async fn evaluate(&self, artifact: &Path, threshold: u32) -> Result<Verdict> {
        let source = self.read_artifact(artifact).await?;

        tracing::info!(file = %artifact.display(), threshold, "Judging test file");

        let message = prompt::judge_user_message(&artifact.display().to_string(), &source);
        let call = self.client.complete(prompt::judge_system_prompt(), &message);
        let reply = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                AppError::Evaluation(format!(
                    "judging {} timed out after {}s",
                    artifact.display(),
                    limit.as_secs()
                ))
            })??,
            None => call.await?,
        };

        let verdict = parse_verdict(&reply, artifact.to_path_buf(), threshold)?;

        tracing::info!(
            file = %artifact.display(),
            score = verdict.score(),
            passed = verdict.passed(),
            issues = verdict.issues().len(),
            "Verdict"
        );

        Ok(verdict)
    }

    async fn evaluate_suite(&self, project_dir: &Path, threshold: u32) -> Result<Vec<Verdict>> {
        let files = discover_tests(project_dir, &self.test_suffixes).await?;
        tracing::info!(count = files.len(), dir = %project_dir.display(), "Discovered tests");

        let mut verdicts = Vec::with_capacity(files.len());
        for file in &files {
            verdicts.push(self.evaluate(file, threshold).await?);
        }
        Ok(verdicts)
    }
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    score: f64,
    #[serde(default)]
    issues: Vec<String>,
    #[serde(default)]
    suggestions: Vec<String>,
}

/// Build a verdict from the judge's reply.
///
/// The first JSON object in the reply that has the verdict shape wins; prose,
/// code fences and unrelated `{ ... }` snippets around it are skipped.
/// Fractional scores are rounded; scores outside 0..=100 are rejected.
pub fn parse_verdict(reply: &str, artifact: PathBuf, threshold: u32) -> Result<Verdict> {
    let mut last_error = None;
    let mut found = None;

    for (start, _) in reply.match_indices('{') {
        let mut stream =
            serde_json::Deserializer::from_str(&reply[start..]).into_iter::<RawVerdict>();
        match stream.next() {
            Some(Ok(raw)) => {
                found = Some(raw);
                break;
            }
            Some(Err(e)) => last_error = Some(e),
            None => {}
        }
    }

    let raw = match (found, last_error) {
        (Some(raw), _) => raw,
        (None, Some(e)) => {
            return Err(AppError::Evaluation(format!(
                "malformed verdict for {}: {e}",
                artifact.display()
            )))
        }
        (None, None) => {
            return Err(AppError::Evaluation(format!(
                "judge reply for {} contained no JSON object",
                artifact.display()
            )))
        }
    };

    if !raw.score.is_finite() || !(0.0..=100.0).contains(&raw.score) {
        return Err(AppError::Evaluation(format!(
            "score {} for {} is outside 0..=100",
            raw.score,
            artifact.display()
        )));
    }

    Ok(Verdict::new(
        artifact,
        raw.score.round() as u32,
        threshold,
        raw.issues,
        raw.suggestions,
    ))
}
