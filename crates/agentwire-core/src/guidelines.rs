//! Managed guidelines block inside an agent's guidelines file.
//!
//! The block is delimited by `<agentwire-guidelines>` tags. Writing replaces
//! an existing block in place or appends one after a blank line; everything
//! outside the tags belongs to the user and is left alone.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::Result;
use crate::fs::{read_optional, write_atomic};

pub const OPEN_TAG: &str = "<agentwire-guidelines>";
pub const CLOSE_TAG: &str = "</agentwire-guidelines>";

const FRONTMATTER: &str = "---\nalwaysApply: true\n---\n";

static BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<agentwire-guidelines>.*?</agentwire-guidelines>")
        .expect("guidelines block pattern is valid")
});

#[derive(Debug, Clone, Copy, Default)]
pub struct GuidelinesWriter {
    frontmatter: bool,
}

impl GuidelinesWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writer that prefixes newly created files with rule front matter.
    pub fn with_frontmatter() -> Self {
        Self { frontmatter: true }
    }

    /// Upsert the block in `path`. The file is only written when it changes.
    pub fn write(&self, path: &Path, content: &str) -> Result<()> {
        let existing = read_optional(path)?;
        let updated = self.render(existing.as_deref(), content);
        if existing.as_deref() == Some(updated.as_str()) {
            tracing::debug!(path = %path.display(), "guidelines already up to date");
            return Ok(());
        }

        write_atomic(path, updated.as_bytes())?;
        tracing::info!(path = %path.display(), "wrote guidelines");
        Ok(())
    }

    pub fn render(&self, existing: Option<&str>, content: &str) -> String {
        let block = format!("{OPEN_TAG}\n{}\n{CLOSE_TAG}", content.trim());

        let existing = existing.unwrap_or_default();
        if BLOCK.is_match(existing) {
            return BLOCK
                .replace(existing, regex::NoExpand(&block))
                .into_owned();
        }

        let body = existing.trim_end();
        if body.is_empty() {
            let prefix = if self.frontmatter { FRONTMATTER } else { "" };
            format!("{prefix}{block}\n")
        } else {
            format!("{body}\n\n{block}\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_file() {
        let rendered = GuidelinesWriter::new().render(None, "Use the tools.\n");
        assert_eq!(
            rendered,
            "<agentwire-guidelines>\nUse the tools.\n</agentwire-guidelines>\n"
        );
    }

    #[test]
    fn test_new_file_with_frontmatter() {
        let rendered = GuidelinesWriter::with_frontmatter().render(None, "rules");
        assert!(rendered.starts_with("---\nalwaysApply: true\n---\n<agentwire-guidelines>"));
    }

    #[test]
    fn test_appends_after_user_content() {
        let rendered = GuidelinesWriter::new().render(Some("# Project notes\n\n\n"), "rules");
        assert_eq!(
            rendered,
            "# Project notes\n\n<agentwire-guidelines>\nrules\n</agentwire-guidelines>\n"
        );
    }

    #[test]
    fn test_replaces_block_in_place() {
        let existing = "# Notes\n\n<agentwire-guidelines>\nold\n</agentwire-guidelines>\n\n## Mine\nkeep\n";
        let rendered = GuidelinesWriter::new().render(Some(existing), "new $1 text");
        assert_eq!(
            rendered,
            "# Notes\n\n<agentwire-guidelines>\nnew $1 text\n</agentwire-guidelines>\n\n## Mine\nkeep\n"
        );
    }

    #[test]
    fn test_write_is_idempotent() {
        let temp = TempDir::new().expect("create temp dir");
        let path = temp.path().join(".cursor/rules/agentwire.mdc");
        let writer = GuidelinesWriter::with_frontmatter();

        writer.write(&path, "rules").expect("first write");
        let first = std::fs::read_to_string(&path).expect("read");
        writer.write(&path, "rules").expect("second write");
        assert_eq!(std::fs::read_to_string(&path).expect("read"), first);
        assert_eq!(first.matches(OPEN_TAG).count(), 1);
    }
}
