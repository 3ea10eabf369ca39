pub mod claude;
pub mod evaluator;
pub mod prompt;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{AppError, Result};

pub use evaluator::ClaudeEvaluator;

/// Structured quality assessment of one test file.
///
/// `passed` is fixed at construction from the threshold active at the time;
/// fields are read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    artifact: PathBuf,
    score: u32,
    threshold: u32,
    passed: bool,
    issues: Vec<String>,
    suggestions: Vec<String>,
}

impl Verdict {
    pub fn new(
        artifact: PathBuf,
        score: u32,
        threshold: u32,
        issues: Vec<String>,
        suggestions: Vec<String>,
    ) -> Self {
        Self {
            artifact,
            score,
            threshold,
            passed: score >= threshold,
            issues,
            suggestions,
        }
    }

    pub fn artifact(&self) -> &Path {
        &self.artifact
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn issues(&self) -> &[String] {
        &self.issues
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }
}

/// Judges test files. Each call performs exactly one assessment per artifact
/// with no retries; a missing structured result is an `Err`, never a low score.
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Judge a single test file against `threshold`.
    async fn evaluate(&self, artifact: &Path, threshold: u32) -> Result<Verdict>;

    /// Judge every test discovered in `project_dir`, in discovery order.
    /// Must not write to the project directory.
    async fn evaluate_suite(&self, project_dir: &Path, threshold: u32) -> Result<Vec<Verdict>>;
}

/// Recursively find test files under `project_dir` whose names end with one of `suffixes`.
///
/// Hidden entries and `node_modules` are skipped. Results are sorted by path
/// so repeated calls over an unchanged tree agree.
pub async fn discover_tests(project_dir: &Path, suffixes: &[String]) -> Result<Vec<PathBuf>> {
    let is_dir = tokio::fs::metadata(project_dir)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);
    if !is_dir {
        return Err(AppError::Evaluation(format!(
            "project directory not found: {}",
            project_dir.display()
        )));
    }

    let mut found = Vec::new();
    let mut pending = vec![project_dir.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut read_dir = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') || name == "node_modules" {
                continue;
            }
            if entry.file_type().await?.is_dir() {
                pending.push(entry.path());
            } else if suffixes.iter().any(|s| name.ends_with(s.as_str())) {
                found.push(entry.path());
            }
        }
    }

    found.sort();
    Ok(found)
}
