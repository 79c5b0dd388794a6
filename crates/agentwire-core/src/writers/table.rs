//! Line-oriented writer for TOML agent configs (e.g. `~/.codex/config.toml`).
//!
//! Re-serializing a hand-edited TOML file would drop comments and reorder
//! tables, so this writer never does it. Instead it works on the raw text in
//! two passes:
//!
//! 1. locate the line ranges of `[<config_key>.<key>]` and
//!    `[<config_key>.<key>.env]`, each running from its header to the next
//!    table header (or EOF);
//! 2. splice those ranges out and append a freshly rendered section,
//!    separated from the preceding content by one blank line.
//!
//! Everything outside the owned ranges is kept byte for byte.
//!
//! ```toml
//! model = "o3"
//!
//! [mcp_servers.boost]
//! command = "php"
//! args = ["artisan", "boost:mcp"]
//!
//! [mcp_servers.boost.env]
//! SITE_PATH = "/tmp/"
//! ```

use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::structured::TRIVIAL_DOCUMENT_LEN;
use crate::error::{InstallError, Result};
use crate::fs::{read_optional, write_atomic};
use crate::server::ServerEntry;

static TABLE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\[\s*([^\[\]]+?)\s*\]\s*(?:#.*)?\s*$")
        .expect("table header pattern is valid")
});

static ARRAY_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\[\[\s*([^\[\]]+?)\s*\]\]\s*(?:#.*)?\s*$")
        .expect("array header pattern is valid")
});

#[derive(Debug, Clone)]
pub struct TableSectionWriter {
    path: PathBuf,
    config_key: String,
    base: Map<String, Value>,
}

impl TableSectionWriter {
    pub fn new(path: impl Into<PathBuf>, config_key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            config_key: config_key.into(),
            base: Map::new(),
        }
    }

    /// Top-level scalar keys written ahead of the first section when the file
    /// is created from scratch.
    pub fn with_base(mut self, base: Map<String, Value>) -> Self {
        self.base = base;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn install(&self, entry: &ServerEntry) -> Result<()> {
        let existing = read_optional(&self.path)?;
        let rendered = self.render(existing.as_deref(), entry);

        if existing.as_deref() == Some(rendered.as_str()) {
            tracing::debug!(
                path = %self.path.display(),
                key = %entry.key,
                "section already up to date"
            );
            return Ok(());
        }
        self.ensure_valid(existing.as_deref(), &rendered)?;

        write_atomic(&self.path, rendered.as_bytes())?;
        tracing::info!(path = %self.path.display(), key = %entry.key, "installed server section");
        Ok(())
    }

    /// Compute the document `install` would write for the given current
    /// content (`None` when the file does not exist).
    pub fn render(&self, existing: Option<&str>, entry: &ServerEntry) -> String {
        let content = match existing {
            Some(content) if content.trim().len() >= TRIVIAL_DOCUMENT_LEN => content,
            _ => return self.bootstrap(entry),
        };

        let newline = detect_newline(content);
        let section = render_section(&self.config_key, entry, newline);
        let remaining = self.without_entry(content, &entry.key);
        let remaining = remaining.trim_end();

        if remaining.is_empty() {
            section
        } else {
            format!("{remaining}{newline}{newline}{section}")
        }
    }

    /// Remove the section (and env sub-section) for `key`. Returns whether
    /// anything was removed.
    pub fn remove(&self, key: &str) -> Result<bool> {
        let Some(content) = read_optional(&self.path)? else {
            return Ok(false);
        };

        let remaining = self.without_entry(&content, key);
        if remaining == content {
            return Ok(false);
        }

        let trimmed = remaining.trim_end();
        let updated = if trimmed.is_empty() {
            String::new()
        } else {
            format!("{trimmed}{}", detect_newline(&content))
        };
        self.ensure_valid(Some(&content), &updated)?;
        write_atomic(&self.path, updated.as_bytes())?;
        tracing::info!(path = %self.path.display(), key, "removed server section");
        Ok(true)
    }

    /// Names of the entries currently defined under the config key.
    pub fn entries(&self) -> Result<Vec<String>> {
        let Some(content) = read_optional(&self.path)? else {
            return Ok(Vec::new());
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let table: toml::Table = content
            .parse()
            .map_err(|e: toml::de::Error| InstallError::parse(&self.path, e.to_string()))?;
        let mut current = &table;
        for segment in self.config_key.split('.') {
            match current.get(segment) {
                Some(toml::Value::Table(next)) => current = next,
                Some(_) => {
                    return Err(InstallError::parse(
                        &self.path,
                        format!("expected '{segment}' to be a table"),
                    ));
                }
                None => return Ok(Vec::new()),
            }
        }
        Ok(current.keys().cloned().collect())
    }

    /// Refuse to turn a valid document into an invalid one. A document that
    /// was already invalid is written with a warning, since its foreign
    /// content is left as found.
    fn ensure_valid(&self, before: Option<&str>, after: &str) -> Result<()> {
        let Err(err) = after.parse::<toml::Table>() else {
            return Ok(());
        };

        let was_valid = before.is_none_or(|content| content.parse::<toml::Table>().is_ok());
        if was_valid {
            return Err(InstallError::parse(
                &self.path,
                format!("update would produce invalid TOML: {}", err.message()),
            ));
        }

        tracing::warn!(
            path = %self.path.display(),
            error = %err,
            "document was not valid TOML before the update"
        );
        Ok(())
    }

    fn bootstrap(&self, entry: &ServerEntry) -> String {
        let section = render_section(&self.config_key, entry, "\n");
        let scalars: Vec<String> = self
            .base
            .iter()
            .filter(|(_, value)| !value.is_object())
            .filter_map(|(key, value)| {
                render_value(value).map(|rendered| format!("{} = {rendered}", format_key(key)))
            })
            .collect();

        if scalars.is_empty() {
            section
        } else {
            format!("{}\n\n{section}", scalars.join("\n"))
        }
    }

    /// Pass 1 + 2: locate the owned ranges and splice them out.
    fn without_entry(&self, content: &str, key: &str) -> String {
        let lines: Vec<&str> = content.split_inclusive('\n').collect();

        let mut owned = segments_of(&self.config_key);
        owned.push(key.to_string());
        let mut env = owned.clone();
        env.push("env".to_string());

        let ranges: Vec<Range<usize>> = [owned, env]
            .iter()
            .filter_map(|target| locate_section(&lines, target))
            .collect();
        if ranges.is_empty() {
            return content.to_string();
        }

        splice_out(&lines, &ranges)
    }
}

/// Find the line range of the table whose header names `target`.
///
/// The range starts at the header and stops before the next table header or
/// at EOF. Trailing blank and comment lines are left outside the range, so a
/// comment introducing the following table survives. Lines inside multi-line
/// strings are never taken for headers.
pub fn locate_section(lines: &[&str], target: &[String]) -> Option<Range<usize>> {
    let in_string = multiline_string_lines(lines);

    let start = (0..lines.len()).find(|&idx| {
        !in_string[idx] && table_header(lines[idx]).is_some_and(|segments| segments == target)
    })?;

    let mut end = (start + 1..lines.len())
        .find(|&idx| !in_string[idx] && is_header(lines[idx]))
        .unwrap_or(lines.len());

    while end > start + 1 && !in_string[end - 1] {
        let trimmed = lines[end - 1].trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            end -= 1;
        } else {
            break;
        }
    }

    Some(start..end)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenString {
    None,
    Basic,
    Literal,
}

/// For every line, whether it starts inside a `"""` or `'''` string.
fn multiline_string_lines(lines: &[&str]) -> Vec<bool> {
    let mut open = OpenString::None;
    lines
        .iter()
        .map(|line| {
            let starts_inside = open != OpenString::None;
            open = scan_line(line.as_bytes(), open);
            starts_inside
        })
        .collect()
}

/// Track string delimiters across one line and return the state at its end.
fn scan_line(bytes: &[u8], mut open: OpenString) -> OpenString {
    let mut i = 0;
    while i < bytes.len() {
        let rest = &bytes[i..];
        match open {
            OpenString::Basic => {
                if rest[0] == b'\\' {
                    i += 2;
                } else if rest.starts_with(b"\"\"\"") {
                    open = OpenString::None;
                    i += 3;
                } else {
                    i += 1;
                }
            }
            OpenString::Literal => {
                if rest.starts_with(b"'''") {
                    open = OpenString::None;
                    i += 3;
                } else {
                    i += 1;
                }
            }
            OpenString::None => match rest[0] {
                b'#' => break,
                b'"' if rest.starts_with(b"\"\"\"") => {
                    open = OpenString::Basic;
                    i += 3;
                }
                b'\'' if rest.starts_with(b"'''") => {
                    open = OpenString::Literal;
                    i += 3;
                }
                b'"' => {
                    i += 1;
                    while i < bytes.len() {
                        match bytes[i] {
                            b'\\' => i += 2,
                            b'"' => {
                                i += 1;
                                break;
                            }
                            _ => i += 1,
                        }
                    }
                }
                b'\'' => {
                    i += 1;
                    while i < bytes.len() && bytes[i] != b'\'' {
                        i += 1;
                    }
                    i += 1;
                }
                _ => i += 1,
            },
        }
    }
    open
}

/// Drop the given line ranges and collapse the blank lines left at the seams.
fn splice_out(lines: &[&str], ranges: &[Range<usize>]) -> String {
    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    let mut after_gap = false;

    for (idx, line) in lines.iter().enumerate() {
        if ranges.iter().any(|range| range.contains(&idx)) {
            after_gap = true;
            continue;
        }
        if after_gap && line.trim().is_empty() {
            let previous_blank = out.last().is_none_or(|prev| prev.trim().is_empty());
            if previous_blank {
                continue;
            }
        }
        after_gap = false;
        out.push(line);
    }

    out.concat()
}

fn table_header(line: &str) -> Option<Vec<String>> {
    if ARRAY_HEADER.is_match(line) {
        return None;
    }
    let caps = TABLE_HEADER.captures(line)?;
    parse_dotted_key(caps.get(1)?.as_str())
}

fn is_header(line: &str) -> bool {
    TABLE_HEADER.is_match(line) || ARRAY_HEADER.is_match(line)
}

fn segments_of(config_key: &str) -> Vec<String> {
    parse_dotted_key(config_key).unwrap_or_else(|| vec![config_key.to_string()])
}

/// Split a dotted TOML key into unquoted segments.
fn parse_dotted_key(raw: &str) -> Option<Vec<String>> {
    let mut segments = Vec::new();
    let mut chars = raw.trim().chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let mut segment = String::new();
        match chars.peek() {
            Some('"') => {
                chars.next();
                let mut escaped = false;
                loop {
                    let c = chars.next()?;
                    if escaped {
                        segment.push(match c {
                            'n' => '\n',
                            't' => '\t',
                            'r' => '\r',
                            other => other,
                        });
                        escaped = false;
                    } else if c == '\\' {
                        escaped = true;
                    } else if c == '"' {
                        break;
                    } else {
                        segment.push(c);
                    }
                }
            }
            Some('\'') => {
                chars.next();
                loop {
                    let c = chars.next()?;
                    if c == '\'' {
                        break;
                    }
                    segment.push(c);
                }
            }
            Some(_) => {
                while let Some(&c) = chars.peek() {
                    if c == '.' || c.is_whitespace() {
                        break;
                    }
                    segment.push(c);
                    chars.next();
                }
                if segment.is_empty() {
                    return None;
                }
            }
            None => return None,
        }
        segments.push(segment);

        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        match chars.next() {
            Some('.') => continue,
            None => return Some(segments),
            Some(_) => return None,
        }
    }
}

fn detect_newline(content: &str) -> &'static str {
    if content.contains("\r\n") { "\r\n" } else { "\n" }
}

/// Render the `[<config_key>.<key>]` section and, for a non-empty env map,
/// its `[<config_key>.<key>.env]` sub-section.
pub fn render_section(config_key: &str, entry: &ServerEntry, newline: &str) -> String {
    let header = format!("{config_key}.{}", format_key(&entry.key));
    let mut lines = vec![format!("[{header}]")];
    for (field, value) in &entry.table_fields() {
        if let Some(rendered) = render_value(value) {
            lines.push(format!("{} = {rendered}", format_key(field)));
        }
    }

    if !entry.env.is_empty() {
        lines.push(String::new());
        lines.push(format!("[{header}.env]"));
        for (name, value) in &entry.env {
            lines.push(format!("{} = {}", format_key(name), quote_string(value)));
        }
    }

    let mut out = lines.join(newline);
    out.push_str(newline);
    out
}

/// Serialize a value: quoted strings, bare booleans, lists of quoted strings,
/// inline tables for objects and plain coercion for everything else. Nulls
/// have no TOML representation and are skipped.
pub fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(quote_string(s)),
        Value::Array(items) => {
            let rendered: Vec<String> = items
                .iter()
                .map(|item| match item {
                    Value::String(s) => quote_string(s),
                    other => quote_string(&other.to_string()),
                })
                .collect();
            Some(format!("[{}]", rendered.join(", ")))
        }
        Value::Object(map) => {
            let fields: Vec<String> = map
                .iter()
                .filter_map(|(k, v)| render_value(v).map(|r| format!("{} = {r}", format_key(k))))
                .collect();
            if fields.is_empty() {
                Some("{}".to_string())
            } else {
                Some(format!("{{ {} }}", fields.join(", ")))
            }
        }
    }
}

/// Double-quote a string with backslash escaping.
pub fn quote_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Bare keys are emitted as-is, anything else is quoted.
fn format_key(key: &str) -> String {
    let bare = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if bare { key.to_string() } else { quote_string(key) }
}
