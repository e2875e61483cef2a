//! npm audit adapter (`npm audit --json`).
//!
//! Dependency findings have no source location; they are pinned to
//! `package.json:1` so they survive the same matching machinery as
//! code-level issues.

use std::path::Path;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::errors::{AdapterError, AdapterResult};
use crate::parse::severity_from_label;
use crate::proc;
use crate::types::{IssueCategory, ToolIssue};

const MANIFEST: &str = "package.json";

#[derive(Debug, Clone, Default)]
pub struct NpmAuditAdapter;

impl NpmAuditAdapter {
    pub fn selects_file(&self, path: &str, _language: &str) -> bool {
        path == MANIFEST || path.ends_with("/package.json")
    }

    pub async fn version(&self, root: &Path) -> Option<String> {
        proc::probe_version("npm", "--version", root).await
    }

    pub async fn invoke(
        &self,
        root: &Path,
        files: &[String],
        timeout: Duration,
    ) -> AdapterResult<Vec<ToolIssue>> {
        // The audit is manifest-level; a file list without a manifest means
        // there is nothing to do.
        if !files.is_empty() && !files.iter().any(|f| self.selects_file(f, "")) {
            return Ok(Vec::new());
        }

        let args = vec!["audit".to_string(), "--json".to_string()];
        let out = proc::run_tool("npm", &args, root, timeout).await?;
        let issues = parse_npm_audit_json(&out.stdout)?;
        debug!(count = issues.len(), "npm audit issues parsed");
        Ok(issues)
    }
}

/// Parses the npm v7+ audit report (`vulnerabilities` keyed by package).
pub fn parse_npm_audit_json(raw: &str) -> AdapterResult<Vec<ToolIssue>> {
    let doc: Value = serde_json::from_str(raw)
        .map_err(|e| AdapterError::Parse(format!("npm audit json: {e}")))?;
    let Some(vulns) = doc.get("vulnerabilities").and_then(Value::as_object) else {
        // An empty report ({} or audit disabled) is a clean result.
        return Ok(Vec::new());
    };

    let mut issues = Vec::new();
    for (package, vuln) in vulns {
        let severity =
            severity_from_label(vuln.get("severity").and_then(Value::as_str).unwrap_or(""));
        let range = vuln.get("range").and_then(Value::as_str).unwrap_or("*");

        // `via` mixes advisory objects and plain package-name strings; the
        // strings are transitive pointers, not advisories of their own.
        let advisories: Vec<&Value> = vuln
            .get("via")
            .and_then(Value::as_array)
            .map(|v| v.iter().filter(|x| x.is_object()).collect())
            .unwrap_or_default();

        if advisories.is_empty() {
            let message = format!("{package} {range} has a known vulnerability (transitive)");
            let mut issue = ToolIssue::new(
                "npm-audit",
                &format!("npm:{package}"),
                IssueCategory::Dependency,
                severity,
                MANIFEST,
                1,
                &message,
            );
            issue.tags.push(format!("package:{package}"));
            issues.push(issue);
            continue;
        }

        for advisory in advisories {
            let title = advisory
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or("known vulnerability");
            let message = format!("{package} {range}: {title}");
            let rule_id = advisory
                .get("source")
                .and_then(Value::as_u64)
                .map(|s| format!("npm-advisory-{s}"))
                .unwrap_or_else(|| format!("npm:{package}"));

            let mut issue = ToolIssue::new(
                "npm-audit",
                &rule_id,
                IssueCategory::Dependency,
                severity,
                MANIFEST,
                1,
                &message,
            );
            issue.docs_url = advisory
                .get("url")
                .and_then(Value::as_str)
                .map(|s| s.to_string());
            issue.details = vuln
                .get("fixAvailable")
                .map(|f| match f {
                    Value::Bool(true) => "fix available via `npm audit fix`".to_string(),
                    Value::Bool(false) => "no fix available".to_string(),
                    other => format!("fix available: {other}"),
                });
            issue.tags.push(format!("package:{package}"));
            issues.push(issue);
        }
    }
    Ok(issues)
}
