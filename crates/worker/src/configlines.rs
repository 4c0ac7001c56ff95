//! Ordered configuration-fragment lines
//!
//! A config fragment is an ordered sequence of lines, each either
//! `KEY=value` or `# KEY is not set`. Order is preserved on write;
//! duplicate keys are tolerated because `oldconfig` resolves them
//! downstream (last occurrence wins).
//!
//! Lines are stored *including* their trailing newline, and all matching
//! is whole-line equality on that form. The fixup rules depend on this:
//! matching without the newline would let `BR2_PACKAGE_SDL=y` also match
//! `BR2_PACKAGE_SDL_SOUND=y`.

use autobuild_core::{Error, Result};
use std::fs;
use std::path::Path;

/// Format a `SYMBOL=y` line.
pub fn enabled(symbol: &str) -> String {
    format!("{symbol}=y\n")
}

/// Format a `# SYMBOL is not set` line.
pub fn not_set(symbol: &str) -> String {
    format!("# {symbol} is not set\n")
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLines {
    lines: Vec<String>,
}

impl ConfigLines {
    pub fn parse(text: &str) -> Self {
        let mut lines: Vec<String> = text.split_inclusive('\n').map(str::to_string).collect();
        if let Some(last) = lines.last_mut() {
            if !last.ends_with('\n') {
                last.push('\n');
            }
        }
        Self { lines }
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text =
            fs::read_to_string(path).map_err(|e| Error::file_system(path, "read config", e))?;
        Ok(Self::parse(&text))
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, self.as_text()).map_err(|e| Error::file_system(path, "write config", e))
    }

    /// Whole-line membership test; `line` must carry its trailing newline.
    pub fn contains(&self, line: &str) -> bool {
        self.lines.iter().any(|l| l == line)
    }

    /// Append a line, supplying the trailing newline when missing.
    pub fn push(&mut self, line: &str) {
        if line.ends_with('\n') {
            self.lines.push(line.to_string());
        } else {
            self.lines.push(format!("{line}\n"));
        }
    }

    /// Remove every occurrence of a line. Returns whether any was removed.
    pub fn remove(&mut self, line: &str) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l != line);
        self.lines.len() != before
    }

    pub fn as_text(&self) -> String {
        self.lines.concat()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }
}
