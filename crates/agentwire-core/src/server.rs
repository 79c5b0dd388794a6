//! The server entry registered into agent configurations.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// A named command/args/env tuple an agent launches to reach the tool server.
///
/// Built fresh for every installation, projected into the agent's format and
/// dropped. `env` is a sorted map so rendered output does not depend on
/// insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEntry {
    pub key: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// How an entry is laid out inside a structured (JSON) agent config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EntryShape {
    /// `{ "command": "...", "args": [...], "env": {...} }`
    #[default]
    Standard,
    /// `{ "type": "local", "enabled": true, "command": [cmd, ...args], "environment": {...} }`
    CommandArray,
}

impl ServerEntry {
    pub fn new(key: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            command: command.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(name.into(), value.into());
        self
    }

    /// Project the entry into a JSON object, dropping empty fields.
    pub fn to_json(&self, shape: EntryShape) -> Value {
        let value = match shape {
            EntryShape::Standard => json!({
                "command": self.command,
                "args": self.args,
                "env": self.env,
            }),
            EntryShape::CommandArray => {
                let mut command = Vec::with_capacity(self.args.len() + 1);
                command.push(self.command.clone());
                command.extend(self.args.iter().cloned());
                json!({
                    "type": "local",
                    "enabled": true,
                    "command": command,
                    "environment": self.env,
                })
            }
        };
        prune_empty(value)
    }

    /// Fields used by the table writer, in render order. `env` is excluded;
    /// it is rendered as its own sub-section.
    pub fn table_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("command".to_string(), json!(self.command));
        if !self.args.is_empty() {
            fields.insert("args".to_string(), json!(self.args));
        }
        fields
    }

    /// Rewrite the entry for agents that launch servers from an unpredictable
    /// working directory.
    ///
    /// A bare command name is resolved on PATH. A relative command with a path
    /// separator (`vendor/bin/server`) is resolved against the project root.
    /// A leading argument naming a file inside the project (e.g. a launcher
    /// script) is anchored to the project root as well.
    pub fn absolutized(&self, project_root: &Path) -> Self {
        let mut entry = self.clone();

        let command = Path::new(&entry.command);
        if command.is_relative() {
            let resolved = if has_path_separator(&entry.command) {
                let candidate = project_root.join(command);
                if candidate.is_file() {
                    Ok(candidate)
                } else {
                    Err(format!("{} is not a file", candidate.display()))
                }
            } else {
                which::which(&entry.command).map_err(|err| err.to_string())
            };

            match resolved {
                Ok(path) => entry.command = path.to_string_lossy().into_owned(),
                Err(error) => {
                    tracing::debug!(command = %entry.command, %error, "keeping relative command")
                }
            }
        }

        if let Some(first) = entry.args.first_mut() {
            let candidate = PathBuf::from(first.as_str());
            if candidate.is_relative() && project_root.join(&candidate).is_file() {
                *first = project_root.join(&candidate).to_string_lossy().into_owned();
            }
        }

        entry
    }
}

/// Whether `name` is a portable environment variable name.
pub fn is_env_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn has_path_separator(command: &str) -> bool {
    command.contains('/') || (cfg!(windows) && command.contains('\\'))
}

/// Recursively drop nulls, empty strings, empty arrays and empty objects from
/// an object's fields.
pub fn prune_empty(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, prune_empty(v)))
                .filter(|(_, v)| !is_empty_value(v))
                .collect(),
        ),
        other => other,
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
