//! Plain-text rendering of verdicts and workflow reports for the terminal.

use std::fmt::Write;

use crate::judge::Verdict;
use crate::stage::StageName;
use crate::workflow::WorkflowReport;

pub fn render_verdict(verdict: &Verdict) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "File: {}", verdict.artifact().display());
    let _ = writeln!(out, "Score: {}/100", verdict.score());
    let _ = writeln!(out, "Passed: {} (threshold {})", verdict.passed(), verdict.threshold());
    push_list(&mut out, "Issues", verdict.issues());
    push_list(&mut out, "Suggestions", verdict.suggestions());
    out
}

pub fn render_verdicts(verdicts: &[Verdict]) -> String {
    if verdicts.is_empty() {
        return "No tests found to judge.\n".to_string();
    }

    let passed = verdicts.iter().filter(|v| v.passed()).count();
    let mut out = verdicts
        .iter()
        .map(render_verdict)
        .collect::<Vec<_>>()
        .join("\n");
    let _ = writeln!(out, "\n{passed}/{} test files passed", verdicts.len());
    out
}

pub fn render_report(report: &WorkflowReport) -> String {
    let mut out = String::from("\n📋 Workflow Summary:\n");

    for outcome in report.outcomes() {
        let status = if outcome.success { "✅" } else { "❌" };
        let _ = write!(out, "  {status} {}", outcome.stage);
        if outcome.stage == StageName::Judge {
            if outcome.verdicts.is_empty() {
                out.push_str(" (no tests found)");
            } else {
                let scores = outcome
                    .verdicts
                    .iter()
                    .map(|v| v.score().to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                let _ = write!(out, " (scores: {scores})");
            }
        }
        out.push('\n');
    }

    if report.aborted() {
        out.push_str("  workflow aborted\n");
    }
    out
}

fn push_list(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "{title}:");
    for item in items {
        let _ = writeln!(out, "  - {item}");
    }
}
