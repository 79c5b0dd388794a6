//! Agent descriptors and installation dispatch.
//!
//! An [`Agent`] is plain data: how to detect it, where its guidelines and
//! skills live, and one fixed [`InstallStrategy`] for registering a server.
//! The built-in catalog lives in [`builtin`].

pub mod builtin;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::context::InstallContext;
use crate::detection::{self, CommandProbe, DetectionSpec};
use crate::error::{InstallError, InstallOutcome, Result};
use crate::guidelines::GuidelinesWriter;
use crate::platform::Platform;
use crate::server::{EntryShape, ServerEntry};
use crate::writers::{ShellCommandInstaller, StructuredMergeWriter, TableSectionWriter};

/// How an agent's configuration is modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InstallStrategy {
    /// Parse the JSON document, set one entry under `config_key`, write it back.
    StructuredMerge { path: String, config_key: String },
    /// Replace the `[config_key.<key>]` section of a TOML file as text.
    TableSection { path: String, config_key: String },
    /// Run the agent's own CLI.
    ShellCommand { template: String },
}

impl InstallStrategy {
    pub fn kind(&self) -> &'static str {
        match self {
            InstallStrategy::StructuredMerge { .. } => "structured",
            InstallStrategy::TableSection { .. } => "table",
            InstallStrategy::ShellCommand { .. } => "shell",
        }
    }

    /// The config file path as declared (unresolved), if the strategy owns a file.
    pub fn path(&self) -> Option<&str> {
        match self {
            InstallStrategy::StructuredMerge { path, .. }
            | InstallStrategy::TableSection { path, .. } => Some(path),
            InstallStrategy::ShellCommand { .. } => None,
        }
    }
}

/// System detection specs per platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformDetection {
    #[serde(default)]
    pub darwin: DetectionSpec,
    #[serde(default)]
    pub linux: DetectionSpec,
    #[serde(default)]
    pub windows: DetectionSpec,
}

impl PlatformDetection {
    /// The same spec on every platform.
    pub fn uniform(spec: DetectionSpec) -> Self {
        Self {
            darwin: spec.clone(),
            linux: spec.clone(),
            windows: spec,
        }
    }

    pub fn for_platform(&self, platform: Platform) -> &DetectionSpec {
        match platform {
            Platform::Darwin => &self.darwin,
            Platform::Linux => &self.linux,
            Platform::Windows => &self.windows,
        }
    }
}

/// A coding agent that can be detected and configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agent {
    name: String,
    display_name: String,
    system_detection: PlatformDetection,
    project_detection: DetectionSpec,
    strategy: InstallStrategy,
    shape: EntryShape,
    guidelines_path: String,
    guidelines_frontmatter: bool,
    skills_path: Option<String>,
    absolute_executable: bool,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        strategy: InstallStrategy,
        guidelines_path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            system_detection: PlatformDetection::default(),
            project_detection: DetectionSpec::default(),
            strategy,
            shape: EntryShape::Standard,
            guidelines_path: guidelines_path.into(),
            guidelines_frontmatter: false,
            skills_path: None,
            absolute_executable: false,
        }
    }

    pub fn with_system_detection(mut self, detection: PlatformDetection) -> Self {
        self.system_detection = detection;
        self
    }

    pub fn with_project_detection(mut self, spec: DetectionSpec) -> Self {
        self.project_detection = spec;
        self
    }

    pub fn with_shape(mut self, shape: EntryShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_guidelines_frontmatter(mut self) -> Self {
        self.guidelines_frontmatter = true;
        self
    }

    pub fn with_skills_path(mut self, path: impl Into<String>) -> Self {
        self.skills_path = Some(path.into());
        self
    }

    /// Resolve the server command (and a leading project-file argument) to
    /// absolute paths before installing.
    pub fn with_absolute_executable(mut self) -> Self {
        self.absolute_executable = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn system_detection(&self, platform: Platform) -> &DetectionSpec {
        self.system_detection.for_platform(platform)
    }

    pub fn project_detection(&self) -> &DetectionSpec {
        &self.project_detection
    }

    pub fn strategy(&self) -> &InstallStrategy {
        &self.strategy
    }

    pub fn shape(&self) -> EntryShape {
        self.shape
    }

    pub fn guidelines_path(&self) -> &str {
        &self.guidelines_path
    }

    pub fn guidelines_frontmatter(&self) -> bool {
        self.guidelines_frontmatter
    }

    pub fn skills_path(&self) -> Option<&str> {
        self.skills_path.as_deref()
    }

    pub fn uses_absolute_executable(&self) -> bool {
        self.absolute_executable
    }

    pub fn detect_on_system(&self, platform: Platform, probe: &dyn CommandProbe) -> bool {
        detection::detect_on_system(self.system_detection(platform), platform, probe)
    }

    pub fn detect_in_project(&self, project_root: &Path) -> bool {
        detection::detect_in_project(&self.project_detection, project_root)
    }

    /// Resolved config file path, for file-based strategies.
    pub fn config_path(&self, ctx: &InstallContext) -> Option<PathBuf> {
        self.strategy.path().map(|path| ctx.resolve(path))
    }

    /// Register `entry` in this agent's configuration.
    ///
    /// Never fails: the outcome carries the diagnostic instead.
    pub fn install_mcp(&self, ctx: &InstallContext, entry: &ServerEntry) -> InstallOutcome {
        let result = self.try_install_mcp(ctx, entry);
        if let Err(err) = &result {
            tracing::warn!(agent = %self.name, error = %err, "installation failed");
        }
        result.into()
    }

    /// Register `entry`, returning an optional note on success.
    pub fn try_install_mcp(
        &self,
        ctx: &InstallContext,
        entry: &ServerEntry,
    ) -> Result<Option<String>> {
        let entry = if self.absolute_executable {
            entry.absolutized(ctx.project_root())
        } else {
            entry.clone()
        };
        tracing::debug!(
            agent = %self.name,
            strategy = self.strategy.kind(),
            key = %entry.key,
            "installing server"
        );

        match &self.strategy {
            InstallStrategy::StructuredMerge { path, config_key } => {
                StructuredMergeWriter::new(ctx.resolve(path), config_key)
                    .with_shape(self.shape)
                    .install(&entry)
                    .map(|()| None)
            }
            InstallStrategy::TableSection { path, config_key } => {
                TableSectionWriter::new(ctx.resolve(path), config_key.as_str())
                    .install(&entry)
                    .map(|()| None)
            }
            InstallStrategy::ShellCommand { template } => {
                let installer = ShellCommandInstaller::new(
                    template.as_str(),
                    ctx.platform(),
                    ctx.shell_timeout(),
                );
                installer.install(&entry, ctx.project_root(), ctx.runner())
            }
        }
    }

    /// Remove the entry named `key`. Returns whether it was present.
    pub fn remove_mcp(&self, ctx: &InstallContext, key: &str) -> Result<bool> {
        match &self.strategy {
            InstallStrategy::StructuredMerge { path, config_key } => {
                StructuredMergeWriter::new(ctx.resolve(path), config_key).remove(key)
            }
            InstallStrategy::TableSection { path, config_key } => {
                TableSectionWriter::new(ctx.resolve(path), config_key.as_str()).remove(key)
            }
            InstallStrategy::ShellCommand { .. } => Err(self.unsupported("server removal")),
        }
    }

    /// Keys of the servers currently registered in this agent's config file.
    pub fn installed_servers(&self, ctx: &InstallContext) -> Result<Vec<String>> {
        match &self.strategy {
            InstallStrategy::StructuredMerge { path, config_key } => {
                StructuredMergeWriter::new(ctx.resolve(path), config_key).entries()
            }
            InstallStrategy::TableSection { path, config_key } => {
                TableSectionWriter::new(ctx.resolve(path), config_key.as_str()).entries()
            }
            InstallStrategy::ShellCommand { .. } => Err(self.unsupported("listing servers")),
        }
    }

    /// Upsert the managed guidelines block in this agent's guidelines file.
    pub fn write_guidelines(&self, ctx: &InstallContext, content: &str) -> Result<()> {
        let writer = if self.guidelines_frontmatter {
            GuidelinesWriter::with_frontmatter()
        } else {
            GuidelinesWriter::new()
        };
        writer.write(&ctx.resolve(&self.guidelines_path), content)
    }

    fn unsupported(&self, operation: &str) -> InstallError {
        InstallError::Unsupported {
            agent: self.name.clone(),
            operation: operation.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use tempfile::TempDir;

    fn cursor_like() -> Agent {
        Agent::new(
            "cursor",
            "Cursor",
            InstallStrategy::StructuredMerge {
                path: ".cursor/mcp.json".to_string(),
                config_key: "mcpServers".to_string(),
            },
            ".cursor/rules/agentwire.mdc",
        )
        .with_project_detection(DetectionSpec::new().path(".cursor"))
    }

    #[test]
    fn test_install_structured_under_project_root() {
        let temp = TempDir::new().expect("create temp dir");
        let ctx = InstallContext::new(temp.path(), temp.path().join("home"));

        let outcome = cursor_like().install_mcp(&ctx, &ServerEntry::new("agentwire", "php"));
        assert!(outcome.success, "{:?}", outcome.message);

        let written: Value = serde_json::from_str(
            &std::fs::read_to_string(temp.path().join(".cursor/mcp.json")).expect("read"),
        )
        .expect("json");
        assert_eq!(written, json!({"mcpServers": {"agentwire": {"command": "php"}}}));
    }

    #[test]
    fn test_install_failure_is_reported_not_raised() {
        let temp = TempDir::new().expect("create temp dir");
        std::fs::create_dir_all(temp.path().join(".cursor")).expect("mkdir");
        std::fs::write(temp.path().join(".cursor/mcp.json"), "{ not json").expect("write");
        let ctx = InstallContext::new(temp.path(), temp.path());

        let outcome = cursor_like().install_mcp(&ctx, &ServerEntry::new("agentwire", "php"));
        assert!(!outcome.success);
        assert!(outcome.message.expect("message").contains("mcp.json"));
        assert_eq!(
            std::fs::read_to_string(temp.path().join(".cursor/mcp.json")).expect("read"),
            "{ not json"
        );
    }

    #[test]
    fn test_shell_strategy_cannot_remove() {
        let temp = TempDir::new().expect("create temp dir");
        let ctx = InstallContext::new(temp.path(), temp.path());
        let agent = Agent::new(
            "claude-code",
            "Claude Code",
            InstallStrategy::ShellCommand {
                template: "claude mcp add {key}".to_string(),
            },
            "CLAUDE.md",
        );

        let err = agent.remove_mcp(&ctx, "agentwire").expect_err("unsupported");
        assert!(matches!(err, InstallError::Unsupported { .. }));
        assert!(agent.config_path(&ctx).is_none());
    }

    #[test]
    fn test_detect_in_project() {
        let temp = TempDir::new().expect("create temp dir");
        let agent = cursor_like();
        assert!(!agent.detect_in_project(temp.path()));

        std::fs::create_dir(temp.path().join(".cursor")).expect("mkdir");
        assert!(agent.detect_in_project(temp.path()));
    }

    #[test]
    fn test_platform_detection_lookup() {
        let detection = PlatformDetection {
            darwin: DetectionSpec::new().path("/Applications/Cursor.app"),
            ..PlatformDetection::default()
        };
        assert_eq!(detection.for_platform(Platform::Darwin).paths.len(), 1);
        assert!(detection.for_platform(Platform::Linux).is_empty());
    }

    #[test]
    fn test_strategy_serializes_with_kind_tag() {
        let strategy = InstallStrategy::TableSection {
            path: ".codex/config.toml".to_string(),
            config_key: "mcp_servers".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&strategy).expect("json"),
            json!({
                "kind": "table_section",
                "path": ".codex/config.toml",
                "config_key": "mcp_servers"
            })
        );
    }
}
