//! Host platform resolution.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Operating-system family an agent's system detection is keyed on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Darwin,
    #[default]
    Linux,
    Windows,
}

impl Platform {
    /// Resolve the platform of the running host.
    ///
    /// Hosts that are neither macOS nor Windows are treated as Linux, which
    /// gives every other Unix the POSIX probing behavior.
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    /// Map a `std::env::consts::OS` style identifier to a platform.
    pub fn from_os(os: &str) -> Self {
        match os {
            "macos" | "darwin" | "ios" => Platform::Darwin,
            "windows" => Platform::Windows,
            _ => Platform::Linux,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Darwin => "darwin",
            Platform::Linux => "linux",
            Platform::Windows => "windows",
        }
    }

    pub fn is_windows(self) -> bool {
        self == Platform::Windows
    }

    pub fn all() -> [Platform; 3] {
        [Platform::Darwin, Platform::Linux, Platform::Windows]
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "darwin" | "macos" | "mac" => Ok(Platform::Darwin),
            "linux" => Ok(Platform::Linux),
            "windows" | "win" => Ok(Platform::Windows),
            other => {
                anyhow::bail!("Unknown platform '{other}' (expected darwin, linux or windows)")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_os_known_values() {
        assert_eq!(Platform::from_os("macos"), Platform::Darwin);
        assert_eq!(Platform::from_os("linux"), Platform::Linux);
        assert_eq!(Platform::from_os("windows"), Platform::Windows);
    }

    #[test]
    fn test_from_os_falls_back_to_linux() {
        assert_eq!(Platform::from_os("freebsd"), Platform::Linux);
        assert_eq!(Platform::from_os(""), Platform::Linux);
        assert_eq!(Platform::default(), Platform::Linux);
    }

    #[test]
    fn test_current_matches_compile_target() {
        let platform = Platform::current();
        if cfg!(windows) {
            assert_eq!(platform, Platform::Windows);
        } else if cfg!(target_os = "macos") {
            assert_eq!(platform, Platform::Darwin);
        } else {
            assert_eq!(platform, Platform::Linux);
        }
    }

    #[test]
    fn test_parse_and_display() {
        for platform in Platform::all() {
            let parsed: Platform = platform.to_string().parse().expect("roundtrip");
            assert_eq!(parsed, platform);
        }
        assert!("beos".parse::<Platform>().is_err());
    }

    #[test]
    fn test_platform_serialization() {
        let json = serde_json::to_string(&Platform::Darwin).expect("serialize");
        assert_eq!(json, "\"darwin\"");
    }
}
