//! Config file reader
//!
//! The file is a single-section INI: `[main]` followed by `key = value`
//! lines, where each key is a long flag name stripped of its `--`.
//! Unknown keys are ignored so old config files keep working.

use autobuild_core::{Error, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const MAIN_SECTION: &str = "main";

/// Read the `[main]` section of a config file into a key/value map.
pub fn load(path: &Path) -> Result<HashMap<String, String>> {
    let text =
        fs::read_to_string(path).map_err(|e| Error::file_system(path, "read config file", e))?;
    parse(&text, path)
}

fn parse(text: &str, path: &Path) -> Result<HashMap<String, String>> {
    let mut values = HashMap::new();
    let mut in_main = false;

    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_main = section.trim() == MAIN_SECTION;
            continue;
        }

        if !in_main {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(Error::configuration(format!(
                "malformed line {} in config file '{}': '{}'",
                lineno + 1,
                path.display(),
                raw,
            )));
        };
        values.insert(key.trim().to_string(), value.trim().to_string());
    }

    Ok(values)
}
