//! Generic command adapter.
//!
//! Runs a configured argv and parses GCC-style diagnostic lines:
//! `path:line[:col]: [severity:] message [rule]`. This is the integration
//! path for analyzers without a dedicated adapter.

use std::path::Path;
use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::errors::AdapterResult;
use crate::parse::{relativize, severity_from_label};
use crate::proc;
use crate::types::{IssueCategory, Severity, ToolIssue};

lazy_static! {
    /// `src/a.c:10:5: warning: something bad [rule-name]`
    static ref DIAG_LINE: Regex = Regex::new(
        r"^(?P<path>[^:\s][^:]*):(?P<line>\d+)(?::(?P<col>\d+))?:\s*(?:(?P<sev>[A-Za-z]+):\s*)?(?P<msg>.*?)(?:\s*\[(?P<rule>[^\]]+)\])?\s*$"
    )
    .expect("diagnostic line regex");
}

/// Static configuration for one external command.
#[derive(Debug, Clone)]
pub struct CommandToolConfig {
    /// Registry name, e.g. `"shellcheck"`.
    pub name: String,
    pub program: String,
    /// Arguments placed before the file list.
    pub args: Vec<String>,
    /// Category assigned to every parsed finding.
    pub category: IssueCategory,
    /// Used when a line carries no severity label.
    pub default_severity: Severity,
    /// Extensions this tool accepts (with dot); empty = all files.
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CommandAdapter {
    config: CommandToolConfig,
}

impl CommandAdapter {
    pub fn new(config: CommandToolConfig) -> Self {
        Self { config }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn category(&self) -> &IssueCategory {
        &self.config.category
    }

    pub fn selects_file(&self, path: &str, _language: &str) -> bool {
        self.config.extensions.is_empty()
            || self.config.extensions.iter().any(|ext| path.ends_with(ext))
    }

    pub async fn invoke(
        &self,
        root: &Path,
        files: &[String],
        timeout: Duration,
    ) -> AdapterResult<Vec<ToolIssue>> {
        let mut args = self.config.args.clone();
        if files.is_empty() {
            args.push(".".to_string());
        } else {
            args.extend(files.iter().cloned());
        }

        let out = proc::run_tool(&self.config.program, &args, root, timeout).await?;
        let issues = self.parse_lines(&out.stdout, root);
        debug!(tool = %self.config.name, count = issues.len(), "command tool issues parsed");
        Ok(issues)
    }

    /// Parses diagnostic lines; anything that does not match the shape is
    /// ignored (tools print banners and summaries around the findings).
    pub fn parse_lines(&self, raw: &str, root: &Path) -> Vec<ToolIssue> {
        let mut issues = Vec::new();
        for line in raw.lines() {
            let Some(caps) = DIAG_LINE.captures(line.trim()) else {
                continue;
            };
            let Ok(start_line) = caps["line"].parse::<u32>() else {
                continue;
            };
            let message = caps["msg"].trim();
            if message.is_empty() {
                continue;
            }
            let severity = caps
                .name("sev")
                .map(|m| severity_from_label(m.as_str()))
                .unwrap_or(self.config.default_severity);
            let rule_id = caps
                .name("rule")
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| format!("{}.default", self.config.name));
            let file = relativize(&caps["path"], root);

            let mut issue = ToolIssue::new(
                &self.config.name,
                &rule_id,
                self.config.category,
                severity,
                &file,
                start_line,
                message,
            );
            issue.start_column = caps.name("col").and_then(|m| m.as_str().parse().ok());
            issues.push(issue);
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shellcheck_like() -> CommandAdapter {
        CommandAdapter::new(CommandToolConfig {
            name: "shellcheck".into(),
            program: "shellcheck".into(),
            args: vec!["-f".into(), "gcc".into()],
            category: IssueCategory::Quality,
            default_severity: Severity::Low,
            extensions: vec![".sh".into()],
        })
    }

    #[test]
    fn parses_gcc_style_lines() {
        let adapter = shellcheck_like();
        let raw = "\
deploy.sh:3:10: warning: Quote this to prevent word splitting [SC2046]
deploy.sh:8: error: Unterminated string
some banner line without a location
lib/util.sh:14:1: note: Consider using $() [SC2006]
";
        let issues = adapter.parse_lines(raw, Path::new("/w"));
        assert_eq!(issues.len(), 3);

        assert_eq!(issues[0].file, "deploy.sh");
        assert_eq!(issues[0].start_line, 3);
        assert_eq!(issues[0].start_column, Some(10));
        assert_eq!(issues[0].severity, Severity::Medium);
        assert_eq!(issues[0].rule_id, "SC2046");

        assert_eq!(issues[1].severity, Severity::High);
        assert_eq!(issues[1].rule_id, "shellcheck.default");
        assert_eq!(issues[1].start_column, None);

        assert_eq!(issues[2].severity, Severity::Info);
        assert_eq!(issues[2].message, "Consider using $()");
    }

    #[test]
    fn line_without_severity_uses_default() {
        let adapter = shellcheck_like();
        let issues = adapter.parse_lines("run.sh:2: do the thing", Path::new("/w"));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Low);
    }

    #[test]
    fn selects_by_extension() {
        let adapter = shellcheck_like();
        assert!(adapter.selects_file("deploy.sh", "shell"));
        assert!(!adapter.selects_file("main.rs", "rust"));
    }

    #[tokio::test]
    async fn invoke_runs_the_configured_program() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = CommandAdapter::new(CommandToolConfig {
            name: "fake-lint".into(),
            program: "sh".into(),
            args: vec![
                "-c".into(),
                "printf 'a.sh:1:1: warning: stub finding [F1]\\n' #".into(),
            ],
            category: IssueCategory::Quality,
            default_severity: Severity::Low,
            extensions: vec![],
        });
        let issues = adapter
            .invoke(dir.path(), &[], Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].rule_id, "F1");
    }
}
