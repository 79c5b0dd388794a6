//! Installer for agents whose configuration is only reachable through their
//! own CLI (e.g. `claude mcp add`).

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::LazyLock;
use std::time::Duration;

use regex::{Captures, Regex};
use wait_timeout::ChildExt;

use crate::error::{InstallError, Result};
use crate::platform::Platform;
use crate::server::{ServerEntry, is_env_name};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{(key|command|args|env)\}").expect("placeholder pattern is valid")
});

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs a rendered command line.
pub trait CommandRunner {
    fn run(&self, command_line: &str, cwd: &Path, timeout: Duration) -> Result<CommandOutput>;
}

/// Runs commands through the platform shell (`sh -c` or `cmd /C`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command_line: &str, cwd: &Path, timeout: Duration) -> Result<CommandOutput> {
        let mut command = if cfg!(windows) {
            let mut command = Command::new("cmd");
            command.arg("/C");
            command
        } else {
            let mut command = Command::new("sh");
            command.arg("-c");
            command
        };
        command
            .arg(command_line)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let spawn_error = |source| InstallError::Spawn {
            command: command_line.to_string(),
            source,
        };
        let mut child = command.spawn().map_err(spawn_error)?;

        // Pipes are drained while waiting; a full buffer would block the child.
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdout_reader = std::thread::spawn(move || drain(stdout));
        let stderr_reader = std::thread::spawn(move || drain(stderr));

        let status = match child.wait_timeout(timeout).map_err(spawn_error)? {
            Some(status) => status,
            None => {
                if let Err(err) = child.kill() {
                    tracing::warn!(
                        command = %command_line,
                        error = %err,
                        "failed to kill timed out command"
                    );
                }
                let _ = child.wait();
                return Err(InstallError::Timeout {
                    command: command_line.to_string(),
                    seconds: timeout.as_secs(),
                });
            }
        };

        Ok(CommandOutput {
            status: status.code(),
            stdout: stdout_reader.join().unwrap_or_default(),
            stderr: stderr_reader.join().unwrap_or_default(),
        })
    }
}

fn drain(pipe: Option<impl Read>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Renders a command template for a server entry and runs it.
#[derive(Debug, Clone)]
pub struct ShellCommandInstaller {
    template: String,
    platform: Platform,
    timeout: Duration,
}

impl ShellCommandInstaller {
    pub fn new(template: impl Into<String>, platform: Platform, timeout: Duration) -> Self {
        Self {
            template: template.into(),
            platform,
            timeout,
        }
    }

    /// Substitute `{key}`, `{command}`, `{args}` and `{env}`.
    ///
    /// `{command}` is escaped but not quoted (templates quote it themselves),
    /// each arg is double-quoted and env pairs become `-e NAME="value"`. The
    /// key stays bare when it is a plain word and is quoted otherwise.
    pub fn render(&self, entry: &ServerEntry) -> String {
        let args = entry
            .args
            .iter()
            .map(|arg| quote(arg, self.platform))
            .collect::<Vec<_>>()
            .join(" ");
        let env = entry
            .env
            .iter()
            .map(|(name, value)| format!("-e {name}={}", quote(value, self.platform)))
            .collect::<Vec<_>>()
            .join(" ");

        let rendered = PLACEHOLDER.replace_all(&self.template, |caps: &Captures| match &caps[1] {
            "key" => render_key(&entry.key, self.platform),
            "command" => escape(&entry.command, self.platform),
            "args" => args.clone(),
            _ => env.clone(),
        });
        collapse_whitespace(&rendered)
    }

    /// Run the rendered command. A success may carry a note, e.g. when the
    /// CLI reported that the server was already registered.
    pub fn install(
        &self,
        entry: &ServerEntry,
        cwd: &Path,
        runner: &dyn CommandRunner,
    ) -> Result<Option<String>> {
        if let Some(name) = entry.env.keys().find(|name| !is_env_name(name)) {
            return Err(InstallError::InvalidEntry {
                key: entry.key.clone(),
                message: format!("'{name}' is not a valid environment variable name"),
            });
        }

        let command_line = self.render(entry);
        tracing::debug!(command = %command_line, cwd = %cwd.display(), "running install command");

        let output = runner.run(&command_line, cwd, self.timeout)?;
        interpret(&command_line, output)
    }
}

/// Map a finished command to an install result.
///
/// A non-zero exit whose output says the entry "already exists" counts as
/// success: the CLI refuses to add a duplicate, and the server is registered.
pub fn interpret(command_line: &str, output: CommandOutput) -> Result<Option<String>> {
    if output.success() {
        tracing::info!(command = %command_line, "install command succeeded");
        return Ok(None);
    }

    if mentions_already_exists(&output.stderr) || mentions_already_exists(&output.stdout) {
        tracing::info!(command = %command_line, "server already registered");
        return Ok(Some(ALREADY_REGISTERED.to_string()));
    }

    Err(InstallError::Process {
        command: command_line.to_string(),
        stderr: output.stderr,
    })
}

pub const ALREADY_REGISTERED: &str = "server already registered";

fn mentions_already_exists(text: &str) -> bool {
    text.to_lowercase().contains("already exists")
}

fn render_key(key: &str, platform: Platform) -> String {
    let bare = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '@'));
    if bare { key.to_string() } else { quote(key, platform) }
}

/// Wrap a value in double quotes for the target shell.
pub fn quote(value: &str, platform: Platform) -> String {
    format!("\"{}\"", escape(value, platform))
}

/// Escape characters that stay special inside double quotes.
pub fn escape(value: &str, platform: Platform) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' | '$' | '`' if !platform.is_windows() => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

/// Collapse whitespace runs outside double quotes and trim the ends.
fn collapse_whitespace(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_quotes = false;
    let mut escaped = false;
    let mut pending_space = false;

    for c in line.trim().chars() {
        if in_quotes {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_quotes = false;
            }
            continue;
        }

        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        if c == '"' {
            in_quotes = true;
        }
        out.push(c);
    }

    out
}
