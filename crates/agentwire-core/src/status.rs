//! Status collection for known agents.
//!
//! Gathers, per agent: whether it is installed on the host, whether the
//! project uses it, where its config lives and which servers it declares.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::agent::Agent;
use crate::context::InstallContext;
use crate::detection::{CommandProbe, DetectionCache};
use crate::error::InstallError;
use crate::platform::Platform;
use crate::registry::AgentRegistry;

/// Status of every agent in a registry, for one project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub project_root: PathBuf,
    pub platform: Platform,
    pub agents: Vec<AgentStatus>,
    pub summary: StatusSummary,
}

/// Summary counts for quick overview
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub total: usize,
    pub on_system: usize,
    pub in_project: usize,
    pub issues: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStatus {
    pub name: String,
    pub display_name: String,
    pub strategy: String,
    pub on_system: bool,
    pub in_project: bool,
    pub config_path: Option<PathBuf>,
    pub guidelines_path: PathBuf,
    /// Server keys declared in the agent's config file. Empty for agents
    /// configured through their CLI.
    pub servers: Vec<String>,
    /// Why `servers` could not be read (e.g. a malformed config file).
    pub error: Option<String>,
}

impl AgentStatus {
    pub fn collect(
        agent: &Agent,
        ctx: &InstallContext,
        probe: &dyn CommandProbe,
        cache: &mut DetectionCache,
    ) -> Self {
        let platform = ctx.platform();
        let on_system = cache.get_or_detect(agent.name(), platform, || {
            agent.detect_on_system(platform, probe)
        });

        let (servers, error) = match agent.installed_servers(ctx) {
            Ok(servers) => (servers, None),
            Err(InstallError::Unsupported { .. }) => (Vec::new(), None),
            Err(err) => {
                tracing::warn!(agent = %agent.name(), error = %err, "could not read agent config");
                (Vec::new(), Some(err.to_string()))
            }
        };

        Self {
            name: agent.name().to_string(),
            display_name: agent.display_name().to_string(),
            strategy: agent.strategy().kind().to_string(),
            on_system,
            in_project: agent.detect_in_project(ctx.project_root()),
            config_path: agent.config_path(ctx),
            guidelines_path: ctx.resolve(agent.guidelines_path()),
            servers,
            error,
        }
    }

    pub fn has_server(&self, key: &str) -> bool {
        self.servers.iter().any(|s| s == key)
    }
}

/// Collect the status of every agent in `registry`.
pub fn collect_status(
    registry: &AgentRegistry,
    ctx: &InstallContext,
    probe: &dyn CommandProbe,
    cache: &mut DetectionCache,
) -> StatusReport {
    let agents: Vec<AgentStatus> = registry
        .all()
        .iter()
        .map(|agent| AgentStatus::collect(agent, ctx, probe, cache))
        .collect();

    let summary = StatusSummary {
        total: agents.len(),
        on_system: agents.iter().filter(|a| a.on_system).count(),
        in_project: agents.iter().filter(|a| a.in_project).count(),
        issues: agents.iter().filter(|a| a.error.is_some()).count(),
    };

    StatusReport {
        project_root: ctx.project_root().to_path_buf(),
        platform: ctx.platform(),
        agents,
        summary,
    }
}
