//! Agent detection.
//!
//! Two read-only checks over declarative specs:
//! - system detection: is the agent installed on this host (commands on
//!   PATH, known install locations)?
//! - project detection: has the project already adopted the agent (marker
//!   directories and files under the project root)?
//!
//! Both use OR semantics across every listed check, and an empty spec never
//! matches.

pub mod cache;
pub mod probe;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::fs::{expand_path, path_exists};
use crate::platform::Platform;

pub use cache::DetectionCache;
pub use probe::{CommandProbe, StaticProbe, WhichProbe};

/// Declarative set of existence checks.
///
/// `commands` and `paths` are used for system detection (paths may contain
/// `~`, environment variables and a trailing `*`). `paths` and `files` are used
/// for project detection, relative to the project root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
}

impl DetectionSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.commands.push(command.into());
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.paths.push(path.into());
        self
    }

    pub fn paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.paths.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn file(mut self, file: impl Into<String>) -> Self {
        self.files.push(file.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.paths.is_empty() && self.files.is_empty()
    }
}

/// Whether the agent described by `spec` is installed on the host.
pub fn detect_on_system(
    spec: &DetectionSpec,
    platform: Platform,
    probe: &dyn CommandProbe,
) -> bool {
    if spec.commands.is_empty() && spec.paths.is_empty() {
        return false;
    }

    if let Some(command) = spec
        .commands
        .iter()
        .find(|command| probe.exists(command, platform))
    {
        tracing::debug!(command = %command, %platform, "system detection matched command");
        return true;
    }

    spec.paths.iter().any(|raw| match expand_path(raw) {
        Some(path) => {
            let found = path_exists(&path);
            if found {
                tracing::debug!(path = %path.display(), %platform, "system detection matched path");
            }
            found
        }
        None => {
            tracing::debug!(path = %raw, "unresolvable detection path");
            false
        }
    })
}

/// Whether the project at `project_root` already uses the agent.
pub fn detect_in_project(spec: &DetectionSpec, project_root: &Path) -> bool {
    let dir_match = spec.paths.iter().any(|rel| {
        std::fs::metadata(project_root.join(rel))
            .map(|meta| meta.is_dir())
            .unwrap_or(false)
    });
    if dir_match {
        return true;
    }

    spec.files.iter().any(|rel| {
        std::fs::metadata(project_root.join(rel))
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    })
}
