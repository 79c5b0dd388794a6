//! Expansion of detection paths: `~`, `%VAR%`, `$VAR`, `${VAR}` and a
//! trailing `*` wildcard in the last component.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};

static VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"%([A-Za-z_][A-Za-z0-9_()]*)%",
        r"|\$\{([A-Za-z_][A-Za-z0-9_]*)\}",
        r"|\$([A-Za-z_][A-Za-z0-9_]*)",
    ))
    .expect("variable pattern is valid")
});

/// Expand `raw` using the process environment and the user's home directory.
///
/// Returns `None` when a referenced variable (or the home directory) cannot
/// be resolved; such a path can never exist.
pub fn expand_path(raw: &str) -> Option<PathBuf> {
    let home = dirs::home_dir();
    expand_path_with(raw, home.as_deref(), |name| std::env::var(name).ok())
}

/// Expansion with explicit home directory and variable lookup.
pub fn expand_path_with(
    raw: &str,
    home: Option<&Path>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<PathBuf> {
    let mut expanded = String::with_capacity(raw.len());
    let rest = if raw == "~" || raw.starts_with("~/") || raw.starts_with("~\\") {
        expanded.push_str(&home?.to_string_lossy());
        &raw[1..]
    } else {
        raw
    };

    let mut missing = false;
    let substituted = VAR_PATTERN.replace_all(rest, |caps: &Captures<'_>| {
        let name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(3))
            .map(|m| m.as_str())
            .unwrap_or_default();
        match lookup(name).filter(|value| !value.is_empty()) {
            Some(value) => value,
            None => {
                missing = true;
                String::new()
            }
        }
    });
    if missing {
        return None;
    }
    expanded.push_str(&substituted);
    Some(PathBuf::from(expanded))
}

/// Whether an expanded path (optionally ending in `*`) names an existing entry.
///
/// Any I/O error while checking counts as "does not exist".
pub fn path_exists(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return std::fs::metadata(path).is_ok();
    };
    let Some(prefix) = name.strip_suffix('*') else {
        return std::fs::metadata(path).is_ok();
    };

    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    match std::fs::read_dir(parent) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .any(|entry| entry.file_name().to_string_lossy().starts_with(prefix)),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "LOCALAPPDATA" => Some("C:/Users/dev/AppData/Local".to_string()),
            "ProgramFiles(x86)" => Some("C:/Program Files (x86)".to_string()),
            "XDG_DATA_HOME" => Some("/home/dev/.local/share".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_expand_tilde() {
        let home = Path::new("/home/dev");
        let path = expand_path_with("~/.local/bin/cursor", Some(home), lookup).expect("expands");
        assert_eq!(path, PathBuf::from("/home/dev/.local/bin/cursor"));
    }

    #[test]
    fn test_expand_tilde_without_home_is_none() {
        assert!(expand_path_with("~/.codex", None, lookup).is_none());
    }

    #[test]
    fn test_expand_windows_variables() {
        let path =
            expand_path_with("%LOCALAPPDATA%/Programs/Cursor", None, lookup).expect("expands");
        assert_eq!(path, PathBuf::from("C:/Users/dev/AppData/Local/Programs/Cursor"));

        let path =
            expand_path_with("%ProgramFiles(x86)%/JetBrains", None, lookup).expect("expands");
        assert_eq!(path, PathBuf::from("C:/Program Files (x86)/JetBrains"));
    }

    #[test]
    fn test_expand_posix_variables() {
        let braced = expand_path_with("${XDG_DATA_HOME}/JetBrains", None, lookup).expect("expands");
        let bare = expand_path_with("$XDG_DATA_HOME/JetBrains", None, lookup).expect("expands");
        assert_eq!(braced, bare);
        assert_eq!(bare, PathBuf::from("/home/dev/.local/share/JetBrains"));
    }

    #[test]
    fn test_unknown_variable_is_none() {
        assert!(expand_path_with("%NOPE%/thing", None, lookup).is_none());
    }

    #[test]
    fn test_plain_path_is_untouched() {
        let path = expand_path_with("/Applications/Cursor.app", None, lookup).expect("expands");
        assert_eq!(path, PathBuf::from("/Applications/Cursor.app"));
    }

    #[test]
    fn test_path_exists_with_trailing_wildcard() {
        let temp = TempDir::new().expect("create temp dir");
        std::fs::create_dir(temp.path().join("PhpStorm2024.3")).expect("mkdir");

        assert!(path_exists(&temp.path().join("PhpStorm*")));
        assert!(!path_exists(&temp.path().join("WebStorm*")));
    }

    #[test]
    fn test_path_exists_plain() {
        let temp = TempDir::new().expect("create temp dir");
        assert!(path_exists(temp.path()));
        assert!(!path_exists(&temp.path().join("missing")));
    }

    #[test]
    fn test_wildcard_in_missing_parent() {
        let temp = TempDir::new().expect("create temp dir");
        assert!(!path_exists(&temp.path().join("missing/PhpStorm*")));
    }
}
