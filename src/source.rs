//! Script source intake.
//!
//! A source is an identity plus the trimmed, non-empty lines of one DSL
//! file. Directory walking and extension filtering are the host's job; the
//! runtime only ever sees a flat list of sources.

use std::path::Path;

/// One DSL source, immutable once read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSource {
    name: String,
    lines: Vec<String>,
}

impl ScriptSource {
    /// Reads a source from disk, trimming lines and dropping blanks.
    pub async fn read(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path).await?;
        Ok(Self::from_text(path.display().to_string(), &text))
    }

    /// Builds a source from in-memory text, applying the same trimming.
    pub fn from_text(name: impl Into<String>, text: &str) -> Self {
        let lines = text
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        Self {
            name: name.into(),
            lines,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
