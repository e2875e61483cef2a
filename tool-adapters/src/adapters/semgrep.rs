//! Semgrep adapter (`semgrep --json`).

use std::path::Path;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::errors::{AdapterError, AdapterResult};
use crate::parse::relativize;
use crate::proc;
use crate::types::{IssueCategory, Severity, ToolIssue};

/// Languages semgrep has useful rule packs for.
const LANGUAGES: &[&str] = &[
    "python",
    "javascript",
    "typescript",
    "go",
    "java",
    "ruby",
    "php",
    "c",
    "cpp",
    "rust",
    "kotlin",
    "shell",
];

#[derive(Debug, Clone, Default)]
pub struct SemgrepAdapter;

impl SemgrepAdapter {
    pub fn selects_file(&self, _path: &str, language: &str) -> bool {
        LANGUAGES.contains(&language)
    }

    pub async fn version(&self, root: &Path) -> Option<String> {
        proc::probe_version("semgrep", "--version", root).await
    }

    pub async fn invoke(
        &self,
        root: &Path,
        files: &[String],
        timeout: Duration,
    ) -> AdapterResult<Vec<ToolIssue>> {
        let mut args = vec![
            "--json".to_string(),
            "--quiet".to_string(),
            "--config".to_string(),
            "auto".to_string(),
        ];
        if files.is_empty() {
            args.push(".".to_string());
        } else {
            args.extend(files.iter().cloned());
        }

        // Semgrep exits 1 when findings exist; only unparseable output is
        // a failure.
        let out = proc::run_tool("semgrep", &args, root, timeout).await?;
        let issues = parse_semgrep_json(&out.stdout, root)?;
        debug!(count = issues.len(), "semgrep issues parsed");
        Ok(issues)
    }
}

/// Parses semgrep's `--json` report into canonical issues.
pub fn parse_semgrep_json(raw: &str, root: &Path) -> AdapterResult<Vec<ToolIssue>> {
    let doc: Value = serde_json::from_str(raw)
        .map_err(|e| AdapterError::Parse(format!("semgrep json: {e}")))?;
    let results = doc
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| AdapterError::Parse("semgrep json: missing results".into()))?;

    let mut issues = Vec::with_capacity(results.len());
    for r in results {
        let Some(rule_id) = r.get("check_id").and_then(Value::as_str) else {
            continue;
        };
        let Some(path) = r.get("path").and_then(Value::as_str) else {
            continue;
        };
        let start_line = r
            .pointer("/start/line")
            .and_then(Value::as_u64)
            .unwrap_or(1) as u32;
        let extra = r.get("extra").cloned().unwrap_or(Value::Null);
        let message = extra
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("semgrep finding");
        let severity = match extra.get("severity").and_then(Value::as_str) {
            Some("ERROR") => Severity::High,
            Some("WARNING") => Severity::Medium,
            Some("INFO") => Severity::Info,
            _ => Severity::Low,
        };
        let category = match extra
            .pointer("/metadata/category")
            .and_then(Value::as_str)
        {
            Some("security") => IssueCategory::Security,
            Some("performance") => IssueCategory::Performance,
            _ => IssueCategory::Quality,
        };

        let file = relativize(path, root);
        let mut issue = ToolIssue::new(
            "semgrep",
            rule_id,
            category,
            severity,
            &file,
            start_line,
            message,
        );
        issue.end_line = r.pointer("/end/line").and_then(Value::as_u64).map(|v| v as u32);
        issue.start_column = r
            .pointer("/start/col")
            .and_then(Value::as_u64)
            .map(|v| v as u32);
        issue.end_column = r.pointer("/end/col").and_then(Value::as_u64).map(|v| v as u32);
        issue.snippet = extra
            .get("lines")
            .and_then(Value::as_str)
            .map(|s| s.to_string());
        issue.docs_url = extra
            .pointer("/metadata/source")
            .and_then(Value::as_str)
            .map(|s| s.to_string());
        if let Some(conf) = extra.pointer("/metadata/confidence").and_then(Value::as_str) {
            issue.confidence = match conf {
                "HIGH" => 0.9,
                "MEDIUM" => 0.7,
                _ => 0.5,
            };
            issue.tags.push(format!("confidence:{}", conf.to_lowercase()));
        }
        issues.push(issue);
    }
    Ok(issues)
}
