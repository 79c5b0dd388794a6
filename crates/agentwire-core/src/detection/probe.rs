//! Command existence probes.

use crate::platform::Platform;

/// Checks whether an executable is reachable on the host.
///
/// Implementations must not fail outwardly: anything that prevents a
/// conclusive answer is reported as `false`.
pub trait CommandProbe {
    fn exists(&self, command: &str, platform: Platform) -> bool;
}

/// PATH lookup through the `which` crate (honors `PATHEXT` on Windows).
#[derive(Debug, Default, Clone, Copy)]
pub struct WhichProbe;

impl CommandProbe for WhichProbe {
    fn exists(&self, command: &str, platform: Platform) -> bool {
        match which::which(command) {
            Ok(path) => {
                tracing::debug!(command, %platform, path = %path.display(), "command found");
                true
            }
            Err(err) => {
                tracing::debug!(command, %platform, error = %err, "command not found");
                false
            }
        }
    }
}

/// Probe answering from a fixed list, for tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct StaticProbe {
    available: Vec<String>,
}

impl StaticProbe {
    pub fn new<I, S>(available: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            available: available.into_iter().map(Into::into).collect(),
        }
    }
}

impl CommandProbe for StaticProbe {
    fn exists(&self, command: &str, _platform: Platform) -> bool {
        self.available.iter().any(|c| c == command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_which_probe_missing_command() {
        let probe = WhichProbe;
        assert!(!probe.exists("agentwire-definitely-not-installed-binary", Platform::current()));
    }

    #[cfg(unix)]
    #[test]
    fn test_which_probe_finds_shell() {
        let probe = WhichProbe;
        assert!(probe.exists("sh", Platform::current()));
    }

    #[test]
    fn test_static_probe() {
        let probe = StaticProbe::new(["codex"]);
        assert!(probe.exists("codex", Platform::Linux));
        assert!(!probe.exists("claude", Platform::Linux));
    }
}
