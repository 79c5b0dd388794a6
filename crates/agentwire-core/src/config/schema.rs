//! Configuration schema for agentwire.toml

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::server::{ServerEntry, is_env_name};

pub const DEFAULT_SERVER_KEY: &str = "agentwire";

/// Root configuration structure for agentwire.toml
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentwireConfig {
    /// Explicit agent selection; detection decides when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agents: Option<Vec<String>>,

    /// Upper bound for agent CLI invocations
    #[serde(default = "default_shell_timeout")]
    pub shell_timeout_secs: u64,

    /// Markdown file (relative to the project) upserted into each agent's
    /// guidelines file on install
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidelines: Option<String>,

    /// The server registered with each agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,
}

impl Default for AgentwireConfig {
    fn default() -> Self {
        Self {
            agents: None,
            shell_timeout_secs: default_shell_timeout(),
            guidelines: None,
            server: None,
        }
    }
}

fn default_shell_timeout() -> u64 {
    30
}

/// `[server]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_key")]
    pub key: String,

    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

fn default_server_key() -> String {
    DEFAULT_SERVER_KEY.to_string()
}

impl ServerConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.key.trim().is_empty() {
            bail!("Server key must not be empty");
        }
        if self.command.trim().is_empty() {
            bail!("Server command must not be empty");
        }
        if let Some(name) = self.env.keys().find(|name| !is_env_name(name)) {
            bail!("Invalid environment variable name: '{}'", name);
        }
        Ok(())
    }

    pub fn to_entry(&self) -> ServerEntry {
        ServerEntry {
            key: self.key.clone(),
            command: self.command.clone(),
            args: self.args.clone(),
            env: self.env.clone(),
        }
    }
}

impl AgentwireConfig {
    pub fn shell_timeout(&self) -> Duration {
        Duration::from_secs(self.shell_timeout_secs)
    }

    /// Validate the configuration against the set of known agent names.
    pub fn validate(&self, known_agents: &[&str]) -> anyhow::Result<()> {
        if self.shell_timeout_secs == 0 {
            bail!("shell_timeout_secs must be greater than zero");
        }

        if let Some(agents) = &self.agents {
            for name in agents {
                if !known_agents.contains(&name.as_str()) {
                    bail!(
                        "Unknown agent '{}' (known agents: {})",
                        name,
                        known_agents.join(", ")
                    );
                }
            }
        }

        if let Some(server) = &self.server {
            server
                .validate()
                .context("Invalid [server] configuration")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KNOWN: &[&str] = &["codex", "cursor"];

    fn server(command: &str) -> ServerConfig {
        ServerConfig {
            key: DEFAULT_SERVER_KEY.to_string(),
            command: command.to_string(),
            args: vec![],
            env: BTreeMap::new(),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = AgentwireConfig::default();
        assert_eq!(config.shell_timeout(), Duration::from_secs(30));
        assert!(config.validate(KNOWN).is_ok());
    }

    #[test]
    fn test_unknown_agent_rejected() {
        let config = AgentwireConfig {
            agents: Some(vec!["cursor".to_string(), "emacs".to_string()]),
            ..AgentwireConfig::default()
        };
        let err = config.validate(KNOWN).unwrap_err().to_string();
        assert!(err.contains("emacs"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = AgentwireConfig {
            shell_timeout_secs: 0,
            ..AgentwireConfig::default()
        };
        assert!(config.validate(KNOWN).is_err());
    }

    #[test]
    fn test_empty_command_rejected() {
        let config = AgentwireConfig {
            server: Some(server("  ")),
            ..AgentwireConfig::default()
        };
        let err = format!("{:#}", config.validate(KNOWN).unwrap_err());
        assert!(err.contains("Invalid [server] configuration"));
        assert!(err.contains("command"));
    }

    #[test]
    fn test_env_names_checked() {
        let mut server = server("php");
        server.env.insert("SITE_PATH".to_string(), "/tmp/".to_string());
        assert!(server.validate().is_ok());

        server.env.insert("1BAD".to_string(), "x".to_string());
        assert!(server.validate().is_err());
    }

    #[test]
    fn test_to_entry() {
        let mut server = server("php");
        server.args = vec!["artisan".to_string()];
        let entry = server.to_entry();

        assert_eq!(entry.key, "agentwire");
        assert_eq!(entry.command, "php");
        assert_eq!(entry.args, vec!["artisan".to_string()]);
    }
}
