//! Per-instance build journal
//!
//! Append-only, human-readable log of cycle-level events. Survives across
//! cycles; the output tree does not.

use autobuild_core::{Error, Result};
use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

pub struct Journal {
    instance: usize,
    file: Mutex<File>,
}

impl Journal {
    pub fn open(path: &Path, instance: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| Error::file_system(path, "open instance log", e))?;
        Ok(Self {
            instance,
            file: Mutex::new(file),
        })
    }

    /// Append a timestamped line; journal writes are best-effort.
    pub fn log(&self, message: &str) {
        let line = format!(
            "[{}] {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            message
        );
        if let Ok(mut file) = self.file.lock() {
            let _ = file.write_all(line.as_bytes());
        }
        tracing::info!(instance = self.instance, "{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn appends_timestamped_lines() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("instance.log");

        let journal = Journal::open(&path, 0).unwrap();
        journal.log("first");
        journal.log("second");

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("first"));
        assert!(lines[1].ends_with("second"));
        assert!(lines[0].starts_with('['));
    }

    #[test]
    fn reopening_appends_rather_than_truncates() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("instance.log");

        Journal::open(&path, 0).unwrap().log("old cycle");
        Journal::open(&path, 0).unwrap().log("new cycle");

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }
}
