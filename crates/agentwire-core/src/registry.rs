//! Agent registry for looking up and detecting agents.
//!
//! The registry provides a central place to discover agents by name and to
//! sweep the host or a project for the ones in use.

use std::path::Path;

use crate::agent::{Agent, builtin};
use crate::detection::{CommandProbe, DetectionCache};
use crate::platform::Platform;

/// Registry of known agents, unique by name.
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    agents: Vec<Agent>,
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::with_default_agents()
    }
}

impl AgentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { agents: Vec::new() }
    }

    /// Create a registry with the built-in catalog.
    pub fn with_default_agents() -> Self {
        Self {
            agents: builtin::all(),
        }
    }

    /// Register an agent, replacing any agent with the same name.
    pub fn register(&mut self, agent: Agent) {
        match self.agents.iter_mut().find(|a| a.name() == agent.name()) {
            Some(existing) => *existing = agent,
            None => self.agents.push(agent),
        }
    }

    pub fn all(&self) -> &[Agent] {
        &self.agents
    }

    pub fn get(&self, name: &str) -> Option<&Agent> {
        self.agents.iter().find(|a| a.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.agents.iter().map(|a| a.name()).collect()
    }

    /// Agents whose name is in `names`, in registry order.
    pub fn filter_by_names(&self, names: &[String]) -> Vec<&Agent> {
        self.agents
            .iter()
            .filter(|a| names.iter().any(|n| n == a.name()))
            .collect()
    }

    /// Agents installed on the host. Results are memoized in `cache`.
    pub fn detect_on_system(
        &self,
        platform: Platform,
        probe: &dyn CommandProbe,
        cache: &mut DetectionCache,
    ) -> Vec<&Agent> {
        self.agents
            .iter()
            .filter(|agent| {
                cache.get_or_detect(agent.name(), platform, || {
                    agent.detect_on_system(platform, probe)
                })
            })
            .collect()
    }

    /// Agents the project at `project_root` already uses.
    pub fn detect_in_project(&self, project_root: &Path) -> Vec<&Agent> {
        self.agents
            .iter()
            .filter(|agent| agent.detect_in_project(project_root))
            .collect()
    }
}
