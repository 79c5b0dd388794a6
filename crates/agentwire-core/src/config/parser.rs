//! TOML parser with helpful error messages

use super::schema::AgentwireConfig;
use crate::agent::{Agent, builtin};
use anyhow::{Context, Result};
use std::path::Path;

/// File name of the project configuration.
pub const CONFIG_FILE_NAME: &str = "agentwire.toml";

/// Load `agentwire.toml` from the project root, if present.
pub fn load_project_config(project_root: &Path) -> Result<Option<AgentwireConfig>> {
    let path = project_root.join(CONFIG_FILE_NAME);
    if !path.is_file() {
        tracing::debug!(path = %path.display(), "no project config");
        return Ok(None);
    }
    parse_config(&path).map(Some)
}

/// Parse agentwire.toml with detailed error messages
pub fn parse_config(path: &Path) -> Result<AgentwireConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse agentwire.toml content from string, validating agent names against
/// the built-in catalog.
pub fn parse_config_str(content: &str) -> Result<AgentwireConfig> {
    let config: AgentwireConfig =
        toml::from_str(content).map_err(|e| enhance_toml_error(e, content))?;

    let known: Vec<Agent> = builtin::all();
    let names: Vec<&str> = known.iter().map(|a| a.name()).collect();
    config.validate(&names)?;

    Ok(config)
}

/// Enhance TOML parsing errors with the offending line and its neighbours
fn enhance_toml_error(error: toml::de::Error, content: &str) -> anyhow::Error {
    let message = error.message().to_string();

    let line_num = error
        .span()
        .map(|span| content[..span.start.min(content.len())].matches('\n').count() + 1);

    match line_num {
        Some(line_num) => anyhow::anyhow!(
            "TOML parsing error at line {}:\n{}\n\nError: {}",
            line_num,
            get_line_context(content, line_num),
            message
        ),
        None => anyhow::anyhow!("TOML parsing error: {}", message),
    }
}

/// Get context lines around an error
fn get_line_context(content: &str, line_num: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line_num.saturating_sub(2);
    let end = (line_num + 1).min(lines.len());

    lines[start.min(end)..end]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let num = start + i + 1;
            let marker = if num == line_num { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, num, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_parse_valid_config() {
        let toml = r#"
agents = ["cursor", "codex"]
shell_timeout_secs = 10

[server]
key = "boost"
command = "php"
args = ["artisan", "boost:mcp"]

[server.env]
SITE_PATH = "/tmp/"
"#;

        let config = parse_config_str(toml).expect("valid config");
        assert_eq!(config.agents.as_deref().map(<[String]>::len), Some(2));
        assert_eq!(config.shell_timeout_secs, 10);

        let entry = config.server.expect("server section").to_entry();
        assert_eq!(entry.key, "boost");
        assert_eq!(entry.args, vec!["artisan", "boost:mcp"]);
        assert_eq!(entry.env["SITE_PATH"], "/tmp/");
    }

    #[test]
    fn test_parse_empty_config() {
        let config = parse_config_str("").expect("empty config");
        assert_eq!(config, AgentwireConfig::default());
    }

    #[test]
    fn test_server_key_defaults() {
        let config =
            parse_config_str("[server]\ncommand = \"agentwire-server\"\n").expect("config");
        assert_eq!(config.server.expect("server").key, "agentwire");
    }

    #[test]
    fn test_unknown_agent_rejected() {
        let err = parse_config_str("agents = [\"notepad\"]\n").unwrap_err();
        assert!(err.to_string().contains("Unknown agent 'notepad'"));
    }

    #[test]
    fn test_error_points_at_line() {
        let toml = "agents = [\"cursor\"]\n\n[server\ncommand = \"php\"\n";
        let err = parse_config_str(toml).unwrap_err().to_string();

        assert!(err.contains("TOML parsing error at line 3"), "{err}");
        assert!(err.contains(">>>    3 | [server"), "{err}");
    }

    #[test]
    fn test_parse_from_file() {
        let mut temp_file = NamedTempFile::new().expect("temp file");
        writeln!(temp_file, "shell_timeout_secs = 5").expect("write");

        let config = parse_config(temp_file.path()).expect("config");
        assert_eq!(config.shell_timeout_secs, 5);
    }

    #[test]
    fn test_parse_nonexistent_file() {
        let result = parse_config(Path::new("/nonexistent/path/agentwire.toml"));
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }

    #[test]
    fn test_load_project_config_absent() {
        let temp = TempDir::new().expect("create temp dir");
        assert!(load_project_config(temp.path()).expect("load").is_none());

        std::fs::write(temp.path().join(CONFIG_FILE_NAME), "agents = [\"cursor\"]\n")
            .expect("write");
        let config = load_project_config(temp.path()).expect("load").expect("present");
        assert_eq!(config.agents, Some(vec!["cursor".to_string()]));
    }
}
