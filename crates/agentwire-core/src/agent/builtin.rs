//! Built-in agent catalog.

use super::{Agent, InstallStrategy, PlatformDetection};
use crate::detection::DetectionSpec;
use crate::server::EntryShape;

/// Template for `claude mcp add`. Env flags go last: `-e` takes multiple values.
pub const CLAUDE_CODE_TEMPLATE: &str =
    r#"claude mcp add -s local -t stdio {key} "{command}" {args} {env}"#;

/// Every built-in agent, in display order.
pub fn all() -> Vec<Agent> {
    vec![
        claude_code(),
        codex(),
        cursor(),
        copilot(),
        gemini(),
        junie(),
        opencode(),
    ]
}

fn structured(path: &str, config_key: &str) -> InstallStrategy {
    InstallStrategy::StructuredMerge {
        path: path.to_string(),
        config_key: config_key.to_string(),
    }
}

pub fn claude_code() -> Agent {
    Agent::new(
        "claude-code",
        "Claude Code",
        InstallStrategy::ShellCommand {
            template: CLAUDE_CODE_TEMPLATE.to_string(),
        },
        "CLAUDE.md",
    )
    .with_system_detection(PlatformDetection::uniform(DetectionSpec::new().command("claude")))
    .with_project_detection(DetectionSpec::new().path(".claude").file("CLAUDE.md"))
    .with_skills_path(".claude/skills")
}

pub fn codex() -> Agent {
    Agent::new(
        "codex",
        "Codex",
        InstallStrategy::TableSection {
            path: ".codex/config.toml".to_string(),
            config_key: "mcp_servers".to_string(),
        },
        "AGENTS.md",
    )
    .with_system_detection(PlatformDetection::uniform(DetectionSpec::new().command("codex")))
    .with_project_detection(DetectionSpec::new().path(".codex").file("AGENTS.md"))
    .with_skills_path(".codex/skills")
}

pub fn cursor() -> Agent {
    Agent::new(
        "cursor",
        "Cursor",
        structured(".cursor/mcp.json", "mcpServers"),
        ".cursor/rules/agentwire.mdc",
    )
    .with_system_detection(PlatformDetection {
        darwin: DetectionSpec::new()
            .command("cursor")
            .path("/Applications/Cursor.app"),
        linux: DetectionSpec::new().command("cursor").paths([
            "/opt/cursor",
            "/usr/share/cursor",
            "~/.local/share/cursor",
            "~/Applications/cursor*",
        ]),
        windows: DetectionSpec::new().command("cursor").paths([
            r"%ProgramFiles%\Cursor",
            r"%LOCALAPPDATA%\Programs\Cursor",
        ]),
    })
    .with_project_detection(DetectionSpec::new().path(".cursor"))
    .with_guidelines_frontmatter()
    .with_skills_path(".cursor/skills")
}

pub fn copilot() -> Agent {
    Agent::new(
        "copilot",
        "GitHub Copilot",
        structured(".vscode/mcp.json", "servers"),
        ".github/copilot-instructions.md",
    )
    .with_system_detection(PlatformDetection {
        darwin: DetectionSpec::new()
            .command("code")
            .path("/Applications/Visual Studio Code.app"),
        linux: DetectionSpec::new()
            .command("code")
            .paths(["/usr/share/code", "/snap/bin/code"]),
        windows: DetectionSpec::new().command("code").paths([
            r"%ProgramFiles%\Microsoft VS Code",
            r"%LOCALAPPDATA%\Programs\Microsoft VS Code",
        ]),
    })
    .with_project_detection(
        DetectionSpec::new()
            .path(".vscode")
            .file(".github/copilot-instructions.md"),
    )
    .with_skills_path(".github/skills")
}

pub fn gemini() -> Agent {
    Agent::new(
        "gemini",
        "Gemini CLI",
        structured(".gemini/settings.json", "mcpServers"),
        "GEMINI.md",
    )
    .with_system_detection(PlatformDetection::uniform(DetectionSpec::new().command("gemini")))
    .with_project_detection(DetectionSpec::new().path(".gemini").file("GEMINI.md"))
}

/// Junie launches servers from the IDE's working directory, so commands are
/// made absolute.
pub fn junie() -> Agent {
    Agent::new(
        "junie",
        "Junie",
        structured(".junie/mcp/mcp.json", "mcpServers"),
        ".junie/guidelines.md",
    )
    .with_system_detection(PlatformDetection {
        darwin: DetectionSpec::new().paths([
            "/Applications/PhpStorm.app",
            "/Applications/IntelliJ IDEA.app",
            "~/Library/Application Support/JetBrains/*",
        ]),
        linux: DetectionSpec::new().paths(["/opt/jetbrains", "~/.local/share/JetBrains/*"]),
        windows: DetectionSpec::new().paths([
            r"%ProgramFiles%\JetBrains",
            r"%LOCALAPPDATA%\JetBrains\*",
        ]),
    })
    .with_project_detection(DetectionSpec::new().path(".junie"))
    .with_absolute_executable()
}

pub fn opencode() -> Agent {
    Agent::new(
        "opencode",
        "OpenCode",
        structured("opencode.json", "mcp"),
        "AGENTS.md",
    )
    .with_system_detection(PlatformDetection::uniform(DetectionSpec::new().command("opencode")))
    .with_project_detection(DetectionSpec::new().file("opencode.json"))
    .with_shape(EntryShape::CommandArray)
    .with_skills_path(".opencode/skill")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Platform;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique() {
        let agents = all();
        let names: HashSet<_> = agents.iter().map(|a| a.name().to_string()).collect();
        assert_eq!(names.len(), agents.len());
    }

    #[test]
    fn test_every_agent_has_project_markers() {
        for agent in all() {
            assert!(!agent.project_detection().is_empty(), "{}", agent.name());
        }
    }

    #[test]
    fn test_every_agent_is_detectable_on_every_platform() {
        for agent in all() {
            for platform in Platform::all() {
                assert!(
                    !agent.system_detection(platform).is_empty(),
                    "{} on {platform}",
                    agent.name()
                );
            }
        }
    }

    #[test]
    fn test_strategies() {
        assert_eq!(claude_code().strategy().kind(), "shell");
        assert_eq!(codex().strategy().kind(), "table");
        assert_eq!(cursor().strategy().path(), Some(".cursor/mcp.json"));
        assert_eq!(opencode().shape(), EntryShape::CommandArray);
        assert!(junie().uses_absolute_executable());
        assert!(cursor().guidelines_frontmatter());
        assert_eq!(gemini().skills_path(), None);
    }
}
