//! ESLint adapter (`eslint -f json`).

use std::path::Path;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::errors::{AdapterError, AdapterResult};
use crate::parse::relativize;
use crate::proc;
use crate::types::{IssueCategory, Severity, ToolIssue};

const EXTENSIONS: &[&str] = &[".js", ".jsx", ".ts", ".tsx", ".mjs", ".cjs"];

#[derive(Debug, Clone, Default)]
pub struct EslintAdapter;

impl EslintAdapter {
    pub fn selects_file(&self, path: &str, _language: &str) -> bool {
        EXTENSIONS.iter().any(|ext| path.ends_with(ext))
    }

    pub async fn version(&self, root: &Path) -> Option<String> {
        proc::probe_version("eslint", "--version", root).await
    }

    pub async fn invoke(
        &self,
        root: &Path,
        files: &[String],
        timeout: Duration,
    ) -> AdapterResult<Vec<ToolIssue>> {
        let mut args = vec!["-f".to_string(), "json".to_string()];
        if files.is_empty() {
            args.push(".".to_string());
        } else {
            args.extend(files.iter().cloned());
        }

        // ESLint exits 1 when lint errors exist; parseable output wins.
        let out = proc::run_tool("eslint", &args, root, timeout).await?;
        let issues = parse_eslint_json(&out.stdout, root)?;
        debug!(count = issues.len(), "eslint issues parsed");
        Ok(issues)
    }
}

/// Parses ESLint's `-f json` report. ESLint severity 2 (error) maps to
/// `Medium` and 1 (warn) to `Low`: a lint error is not a security-grade
/// finding, and the mapping must be deterministic.
pub fn parse_eslint_json(raw: &str, root: &Path) -> AdapterResult<Vec<ToolIssue>> {
    let doc: Value =
        serde_json::from_str(raw).map_err(|e| AdapterError::Parse(format!("eslint json: {e}")))?;
    let entries = doc
        .as_array()
        .ok_or_else(|| AdapterError::Parse("eslint json: expected top-level array".into()))?;

    let mut issues = Vec::new();
    for entry in entries {
        let Some(file_path) = entry.get("filePath").and_then(Value::as_str) else {
            continue;
        };
        let file = relativize(file_path, root);
        let Some(messages) = entry.get("messages").and_then(Value::as_array) else {
            continue;
        };
        for m in messages {
            let rule_id = m
                .get("ruleId")
                .and_then(Value::as_str)
                .unwrap_or("eslint.parse");
            let message = m.get("message").and_then(Value::as_str).unwrap_or("");
            let line = m.get("line").and_then(Value::as_u64).unwrap_or(1) as u32;
            let severity = match m.get("severity").and_then(Value::as_u64) {
                Some(2) => Severity::Medium,
                Some(1) => Severity::Low,
                _ => Severity::Low,
            };

            let mut issue = ToolIssue::new(
                "eslint",
                rule_id,
                IssueCategory::Quality,
                severity,
                &file,
                line,
                message,
            );
            issue.end_line = m.get("endLine").and_then(Value::as_u64).map(|v| v as u32);
            issue.start_column = m.get("column").and_then(Value::as_u64).map(|v| v as u32);
            issue.end_column = m.get("endColumn").and_then(Value::as_u64).map(|v| v as u32);
            issue.suggestion = m
                .pointer("/fix/text")
                .and_then(Value::as_str)
                .map(|s| s.to_string());
            issues.push(issue);
        }
    }
    Ok(issues)
}
