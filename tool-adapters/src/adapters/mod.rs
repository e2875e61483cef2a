//! Adapter dispatch.
//!
//! One variant per analyzer; the `Command` variant is the escape hatch for
//! any external linter that can emit `path:line:col: severity: message`
//! lines. Matching is exhaustive, so adding an analyzer is a compile-time
//! checklist rather than a runtime registry surprise.

pub mod command;
pub mod eslint;
pub mod npm_audit;
pub mod semgrep;

use std::path::Path;
use std::time::Duration;

use crate::errors::AdapterError;
use crate::types::{IssueCategory, ToolIssue, ToolRunStatus, sort_issues};

pub use command::CommandToolConfig;

/// Default per-invocation deadline; quick linters finish well inside it.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(60);

/// Hard ceiling for slow analyzers.
pub const MAX_TOOL_TIMEOUT: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
pub enum ToolAdapter {
    Semgrep(semgrep::SemgrepAdapter),
    Eslint(eslint::EslintAdapter),
    NpmAudit(npm_audit::NpmAuditAdapter),
    Command(command::CommandAdapter),
}

impl ToolAdapter {
    pub fn name(&self) -> &str {
        match self {
            ToolAdapter::Semgrep(_) => "semgrep",
            ToolAdapter::Eslint(_) => "eslint",
            ToolAdapter::NpmAudit(_) => "npm-audit",
            ToolAdapter::Command(a) => a.name(),
        }
    }

    pub fn categories(&self) -> &[IssueCategory] {
        match self {
            ToolAdapter::Semgrep(_) => &[IssueCategory::Security, IssueCategory::Quality],
            ToolAdapter::Eslint(_) => &[IssueCategory::Quality],
            ToolAdapter::NpmAudit(_) => &[IssueCategory::Dependency],
            ToolAdapter::Command(a) => std::slice::from_ref(a.category()),
        }
    }

    /// Narrows the input file set before invocation.
    pub fn selects_file(&self, path: &str, language: &str) -> bool {
        match self {
            ToolAdapter::Semgrep(a) => a.selects_file(path, language),
            ToolAdapter::Eslint(a) => a.selects_file(path, language),
            ToolAdapter::NpmAudit(a) => a.selects_file(path, language),
            ToolAdapter::Command(a) => a.selects_file(path, language),
        }
    }

    /// Best-effort tool version, bounded to a few seconds.
    pub async fn version(&self, root: &Path) -> Option<String> {
        match self {
            ToolAdapter::Semgrep(a) => a.version(root).await,
            ToolAdapter::Eslint(a) => a.version(root).await,
            ToolAdapter::NpmAudit(a) => a.version(root).await,
            ToolAdapter::Command(_) => None,
        }
    }

    /// Runs the analyzer over `files` (empty slice = whole tree) and
    /// normalizes the output. Never panics on malformed output; a parse
    /// failure is a `Failure` status with an empty issue list.
    pub async fn invoke(
        &self,
        root: &Path,
        files: &[String],
        timeout: Duration,
    ) -> (Vec<ToolIssue>, ToolRunStatus) {
        let result = match self {
            ToolAdapter::Semgrep(a) => a.invoke(root, files, timeout).await,
            ToolAdapter::Eslint(a) => a.invoke(root, files, timeout).await,
            ToolAdapter::NpmAudit(a) => a.invoke(root, files, timeout).await,
            ToolAdapter::Command(a) => a.invoke(root, files, timeout).await,
        };
        match result {
            Ok(mut issues) => {
                sort_issues(&mut issues);
                (issues, ToolRunStatus::Success)
            }
            Err(AdapterError::Timeout) => (Vec::new(), ToolRunStatus::Timeout),
            Err(_) => (Vec::new(), ToolRunStatus::Failure),
        }
    }
}
