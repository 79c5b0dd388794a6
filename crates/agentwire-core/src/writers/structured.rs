//! Structured merge writer for JSON agent configs.
//!
//! The whole document is parsed (leniently), one entry under the configured
//! key path is inserted or replaced, and the document is written back in
//! full. Every other key keeps its value and position.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};

use super::jsonc::to_strict_json;
use crate::error::{InstallError, Result};
use crate::fs::{read_optional, write_atomic};
use crate::server::{EntryShape, ServerEntry};

/// Files whose trimmed content is shorter than this are treated as empty.
pub const TRIVIAL_DOCUMENT_LEN: usize = 3;

#[derive(Debug, Clone)]
pub struct StructuredMergeWriter {
    path: PathBuf,
    key_path: Vec<String>,
    shape: EntryShape,
}

impl StructuredMergeWriter {
    /// `config_key` may be dotted (`servers.mcpServers`) to address a nested
    /// object.
    pub fn new(path: impl Into<PathBuf>, config_key: &str) -> Self {
        Self {
            path: path.into(),
            key_path: split_key_path(config_key),
            shape: EntryShape::Standard,
        }
    }

    pub fn with_shape(mut self, shape: EntryShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn key_path(&self) -> &[String] {
        &self.key_path
    }

    /// Add or replace `entry` in the target file.
    pub fn install(&self, entry: &ServerEntry) -> Result<()> {
        let existing = read_optional(&self.path)?;
        let rendered = self.render(existing.as_deref(), entry)?;

        if existing.as_deref() == Some(rendered.as_str()) {
            tracing::debug!(
                path = %self.path.display(),
                key = %entry.key,
                "entry already up to date"
            );
            return Ok(());
        }

        write_atomic(&self.path, rendered.as_bytes())?;
        tracing::info!(path = %self.path.display(), key = %entry.key, "installed server entry");
        Ok(())
    }

    /// Compute the document that `install` would write, given the current file
    /// content (`None` when the file does not exist).
    pub fn render(&self, existing: Option<&str>, entry: &ServerEntry) -> Result<String> {
        let mut root = self.parse_root(existing)?;
        let servers = object_at_path_mut(&mut root, &self.key_path)
            .map_err(|message| InstallError::parse(&self.path, message))?;
        servers.insert(entry.key.clone(), entry.to_json(self.shape));
        serialize(&root).map_err(|e| InstallError::parse(&self.path, e.to_string()))
    }

    /// Remove the entry named `key`. Returns whether it was present; the file is
    /// only rewritten when something was removed.
    pub fn remove(&self, key: &str) -> Result<bool> {
        let Some(existing) = read_optional(&self.path)? else {
            return Ok(false);
        };
        if is_trivial(&existing) {
            return Ok(false);
        }

        let mut root = self.parse_root(Some(&existing))?;
        let Some(servers) = object_at_path(&mut root, &self.key_path)
            .map_err(|message| InstallError::parse(&self.path, message))?
        else {
            return Ok(false);
        };
        if !servers.contains_key(key) {
            return Ok(false);
        }
        *servers = std::mem::take(servers)
            .into_iter()
            .filter(|(name, _)| name != key)
            .collect();

        let rendered =
            serialize(&root).map_err(|e| InstallError::parse(&self.path, e.to_string()))?;
        write_atomic(&self.path, rendered.as_bytes())?;
        tracing::info!(path = %self.path.display(), key, "removed server entry");
        Ok(true)
    }

    /// Names of the entries currently under the key path.
    pub fn entries(&self) -> Result<Vec<String>> {
        let Some(existing) = read_optional(&self.path)? else {
            return Ok(Vec::new());
        };
        let mut root = self.parse_root(Some(&existing))?;
        let servers = object_at_path(&mut root, &self.key_path)
            .map_err(|message| InstallError::parse(&self.path, message))?;
        Ok(servers
            .map(|servers| servers.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn parse_root(&self, existing: Option<&str>) -> Result<Map<String, Value>> {
        let content = match existing {
            Some(content) if !is_trivial(content) => content,
            _ => return Ok(Map::new()),
        };

        let value: Value = serde_json::from_str(&to_strict_json(content))
            .map_err(|e| InstallError::parse(&self.path, e.to_string()))?;
        match value {
            Value::Object(map) => Ok(map),
            _ => Err(InstallError::parse(
                &self.path,
                "expected a JSON object at the document root",
            )),
        }
    }
}

fn is_trivial(content: &str) -> bool {
    content.trim().len() < TRIVIAL_DOCUMENT_LEN
}

fn split_key_path(config_key: &str) -> Vec<String> {
    config_key
        .split('.')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// Walk `path`, creating missing objects along the way.
fn object_at_path_mut<'a>(
    root: &'a mut Map<String, Value>,
    path: &[String],
) -> std::result::Result<&'a mut Map<String, Value>, String> {
    let mut current = root;
    for segment in path {
        let next = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        current = match next {
            Value::Object(map) => map,
            _ => return Err(format!("expected '{segment}' to be an object")),
        };
    }
    Ok(current)
}

/// Walk `path` without creating anything.
fn object_at_path<'a>(
    root: &'a mut Map<String, Value>,
    path: &[String],
) -> std::result::Result<Option<&'a mut Map<String, Value>>, String> {
    let mut current = root;
    for segment in path {
        current = match current.get_mut(segment) {
            None => return Ok(None),
            Some(Value::Object(map)) => map,
            Some(_) => return Err(format!("expected '{segment}' to be an object")),
        };
    }
    Ok(Some(current))
}

/// Pretty-print with four-space indentation and a trailing newline.
fn serialize(root: &Map<String, Value>) -> serde_json::Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    root.serialize(&mut serializer)?;
    let mut out = String::from_utf8_lossy(&buf).into_owned();
    out.push('\n');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn boost() -> ServerEntry {
        ServerEntry::new("boost", "php")
            .with_args(["artisan", "boost:mcp"])
            .with_env("SITE_PATH", "/tmp/")
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&std::fs::read_to_string(path).expect("read")).expect("json")
    }

    #[test]
    fn test_split_key_path() {
        assert_eq!(split_key_path("mcpServers"), vec!["mcpServers"]);
        assert_eq!(split_key_path("servers.mcpServers"), vec!["servers", "mcpServers"]);
    }

    #[test]
    fn test_render_from_nothing() {
        let writer = StructuredMergeWriter::new("/unused/mcp.json", "mcpServers");
        let rendered = writer
            .render(None, &ServerEntry::new("k", "cmd"))
            .expect("render");

        assert_eq!(
            rendered,
            "{\n    \"mcpServers\": {\n        \"k\": {\n            \"command\": \"cmd\"\n        }\n    }\n}\n"
        );
    }

    #[test]
    fn test_render_nested_key_path() {
        let writer = StructuredMergeWriter::new("/unused/settings.json", "servers.mcpServers");
        let rendered = writer
            .render(Some(r#"{"theme": "dark"}"#), &ServerEntry::new("k", "cmd"))
            .expect("render");
        let value: Value = serde_json::from_str(&rendered).expect("json");

        assert_eq!(
            value,
            json!({"theme": "dark", "servers": {"mcpServers": {"k": {"command": "cmd"}}}})
        );
    }

    #[test]
    fn test_replace_keeps_position() {
        let writer = StructuredMergeWriter::new("/unused/mcp.json", "mcpServers");
        let existing = r#"{"mcpServers": {"a": {"command": "a"}, "k": {"command": "old"}, "z": {"command": "z"}}}"#;
        let rendered = writer
            .render(Some(existing), &ServerEntry::new("k", "new"))
            .expect("render");

        let a = rendered.find("\"a\"").expect("a");
        let k = rendered.find("\"k\"").expect("k");
        let z = rendered.find("\"z\"").expect("z");
        assert!(a < k && k < z);
        assert!(rendered.contains("\"new\""));
        assert!(!rendered.contains("\"old\""));
    }

    #[test]
    fn test_non_object_key_is_parse_error() {
        let writer = StructuredMergeWriter::new("/unused/mcp.json", "mcpServers");
        let err = writer
            .render(Some(r#"{"mcpServers": []}"#), &boost())
            .expect_err("should fail");
        assert!(matches!(err, InstallError::Parse { .. }));
    }

    #[test]
    fn test_non_object_root_is_parse_error() {
        let writer = StructuredMergeWriter::new("/unused/mcp.json", "mcpServers");
        let err = writer.render(Some("[1, 2, 3]"), &boost()).expect_err("should fail");
        assert!(matches!(err, InstallError::Parse { .. }));
    }

    #[test]
    fn test_install_tolerates_comments_and_trailing_commas() {
        let temp = TempDir::new().expect("create temp dir");
        let path = temp.path().join("mcp.json");
        std::fs::write(
            &path,
            "{\n  // editor settings\n  \"servers\": {\n    \"x\": {\"command\": \"x\"},\n  },\n}\n",
        )
        .expect("seed");

        let writer = StructuredMergeWriter::new(&path, "servers");
        writer.install(&boost()).expect("install");

        let value = read_json(&path);
        assert_eq!(value["servers"]["x"], json!({"command": "x"}));
        assert_eq!(value["servers"]["boost"]["command"], json!("php"));
    }

    #[test]
    fn test_remove_entry() {
        let temp = TempDir::new().expect("create temp dir");
        let path = temp.path().join("mcp.json");
        let writer = StructuredMergeWriter::new(&path, "mcpServers");
        writer.install(&ServerEntry::new("a", "a")).expect("install a");
        writer.install(&ServerEntry::new("b", "b")).expect("install b");

        assert!(writer.remove("a").expect("remove"));
        assert!(!writer.remove("a").expect("remove again"));
        assert_eq!(writer.entries().expect("entries"), vec!["b".to_string()]);
    }

    #[test]
    fn test_remove_from_missing_file() {
        let temp = TempDir::new().expect("create temp dir");
        let writer = StructuredMergeWriter::new(temp.path().join("mcp.json"), "mcpServers");
        assert!(!writer.remove("a").expect("remove"));
        assert!(!temp.path().join("mcp.json").exists());
    }
}
