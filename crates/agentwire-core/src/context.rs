//! Installation context shared by every agent operation.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;

use crate::platform::Platform;
use crate::writers::{CommandRunner, SystemRunner};

/// Default bound for agent CLI invocations.
pub const DEFAULT_SHELL_TIMEOUT: Duration = Duration::from_secs(30);

/// Where and how an installation runs.
///
/// Frontends build this once and pass it to every agent call. Relative config
/// paths resolve against `project_root`, `~/` paths against `home_dir`.
pub struct InstallContext {
    project_root: PathBuf,
    home_dir: PathBuf,
    platform: Platform,
    shell_timeout: Duration,
    runner: Box<dyn CommandRunner>,
}

impl InstallContext {
    pub fn new(project_root: impl Into<PathBuf>, home_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            home_dir: home_dir.into(),
            platform: Platform::current(),
            shell_timeout: DEFAULT_SHELL_TIMEOUT,
            runner: Box::new(SystemRunner),
        }
    }

    /// Context for `project_root` using the current user's home directory.
    pub fn for_project(project_root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let home_dir = dirs::home_dir().context("Could not determine home directory")?;
        Ok(Self::new(project_root, home_dir))
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_shell_timeout(mut self, timeout: Duration) -> Self {
        self.shell_timeout = timeout;
        self
    }

    /// Replace the runner used for shell-command strategies.
    pub fn with_runner(mut self, runner: impl CommandRunner + 'static) -> Self {
        self.runner = Box::new(runner);
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn home_dir(&self) -> &Path {
        &self.home_dir
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn shell_timeout(&self) -> Duration {
        self.shell_timeout
    }

    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    /// Resolve a configured path: `~/...` under the home directory, absolute
    /// paths as-is, anything else under the project root.
    pub fn resolve(&self, raw: &str) -> PathBuf {
        if raw == "~" {
            return self.home_dir.clone();
        }
        if let Some(rest) = raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
            return self.home_dir.join(rest);
        }
        let path = Path::new(raw);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }
}

impl fmt::Debug for InstallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallContext")
            .field("project_root", &self.project_root)
            .field("home_dir", &self.home_dir)
            .field("platform", &self.platform)
            .field("shell_timeout", &self.shell_timeout)
            .finish_non_exhaustive()
    }
}
