//! Tool registry: which adapters exist, which are enabled, which run.

use std::collections::BTreeSet;

use crate::adapters::{ToolAdapter, command, eslint, npm_audit, semgrep};
use crate::types::IssueCategory;

/// A specialized review profile that knows which tools it needs.
/// When profiles are supplied to a run, the scheduled set is the union of
/// their tool lists (intersected with the enabled set).
#[derive(Debug, Clone)]
pub struct AgentProfile {
    pub name: String,
    relevant_tools: Vec<String>,
}

impl AgentProfile {
    pub fn new(name: &str, relevant_tools: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            relevant_tools: relevant_tools.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn relevant_tools(&self) -> &[String] {
        &self.relevant_tools
    }
}

/// Registered adapters plus the enabled subset.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    adapters: Vec<ToolAdapter>,
    enabled: BTreeSet<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stock set: semgrep, eslint, npm-audit, all enabled.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(ToolAdapter::Semgrep(semgrep::SemgrepAdapter));
        registry.register(ToolAdapter::Eslint(eslint::EslintAdapter));
        registry.register(ToolAdapter::NpmAudit(npm_audit::NpmAuditAdapter));
        registry
    }

    /// Registers an adapter and enables it. A re-registration under an
    /// existing name replaces the previous adapter.
    pub fn register(&mut self, adapter: ToolAdapter) {
        let name = adapter.name().to_string();
        self.adapters.retain(|a| a.name() != name);
        self.adapters.push(adapter);
        self.adapters.sort_by(|a, b| a.name().cmp(b.name()));
        self.enabled.insert(name);
    }

    /// Convenience for the generic command adapter.
    pub fn register_command_tool(&mut self, config: command::CommandToolConfig) {
        self.register(ToolAdapter::Command(command::CommandAdapter::new(config)));
    }

    pub fn disable(&mut self, name: &str) {
        self.enabled.remove(name);
    }

    pub fn enable(&mut self, name: &str) {
        if self.adapters.iter().any(|a| a.name() == name) {
            self.enabled.insert(name.to_string());
        }
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.contains(name)
    }

    /// All registered adapters, sorted by name.
    pub fn all(&self) -> &[ToolAdapter] {
        &self.adapters
    }

    /// Selects the adapters for one run: enabled, intersecting the
    /// requested categories, and (when agent profiles are supplied)
    /// required by at least one profile. Returned in name order.
    pub fn select(
        &self,
        categories: &[IssueCategory],
        agents: Option<&[AgentProfile]>,
    ) -> Vec<&ToolAdapter> {
        let agent_union: Option<BTreeSet<&str>> = agents.map(|profiles| {
            profiles
                .iter()
                .flat_map(|p| p.relevant_tools().iter().map(String::as_str))
                .collect()
        });

        self.adapters
            .iter()
            .filter(|a| self.enabled.contains(a.name()))
            .filter(|a| {
                categories.is_empty() || a.categories().iter().any(|c| categories.contains(c))
            })
            .filter(|a| {
                agent_union
                    .as_ref()
                    .map(|union| union.contains(a.name()))
                    .unwrap_or(true)
            })
            .collect()
    }
}
