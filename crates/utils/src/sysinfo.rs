//! Host capability probe
//!
//! Resolves the external programs the autobuilder depends on, once, at
//! startup. Workers share the probed result so they never race to detect
//! optional tools mid-cycle.

use autobuild_core::{Error, Result};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Programs the daemon cannot run without.
pub const REQUIRED_PROGRAMS: &[&str] = &["make", "git", "gcc", "timeout"];

/// Programs that only gate individual package selections.
pub const OPTIONAL_PROGRAMS: &[&str] = &["bzr", "java", "javac", "jar"];

/// Memoised map of program name to resolved absolute path.
#[derive(Debug)]
pub struct SystemInfo {
    programs: HashMap<&'static str, Option<PathBuf>>,
}

impl SystemInfo {
    /// Probe every required and optional program eagerly.
    pub fn probe() -> Self {
        let mut programs = HashMap::new();
        for &name in REQUIRED_PROGRAMS.iter().chain(OPTIONAL_PROGRAMS) {
            programs.insert(name, resolve_program(name));
        }
        Self { programs }
    }

    /// The resolved path of a probed program, or `None` when absent.
    pub fn has(&self, name: &str) -> Option<&Path> {
        self.programs.get(name).and_then(|p| p.as_deref())
    }

    /// Succeeds iff every required program resolved.
    pub fn check_requirements(&self) -> Result<()> {
        for &name in REQUIRED_PROGRAMS {
            if self.has(name).is_none() {
                return Err(Error::configuration(format!(
                    "missing required program '{name}'"
                )));
            }
        }
        Ok(())
    }

    /// Build a `SystemInfo` from an explicit program map, bypassing the
    /// probe. Intended for tests.
    pub fn with_programs(programs: HashMap<&'static str, Option<PathBuf>>) -> Self {
        Self { programs }
    }
}

fn resolve_program(name: &str) -> Option<PathBuf> {
    let path = find_in_path(name)?;

    // gcj installs java/javac shims that cannot build real Java packages;
    // treat such an implementation as absent.
    if matches!(name, "java" | "javac") && is_gcj(&path) {
        tracing::debug!(program = name, "rejecting gcj implementation");
        return None;
    }

    Some(path)
}

/// Walk `PATH` and return the first executable match.
fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = env::var_os("PATH")?;
    for dir in env::split_paths(&path_var) {
        let candidate = dir.join(name);
        if is_executable(&candidate) {
            return Some(candidate);
        }
    }
    None
}

fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        path.metadata()
            .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        path.is_file()
    }
}

/// `java -version` / `javac -version` mention gcj when the resolved binary
/// is the GNU Compiler for Java.
fn is_gcj(path: &Path) -> bool {
    let output = match Command::new(path).arg("-version").output() {
        Ok(output) => output,
        Err(_) => return false,
    };
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    stdout.contains("gcj") || stderr.contains("gcj")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_required_program_fails_check() {
        let mut programs: HashMap<&'static str, Option<PathBuf>> = HashMap::new();
        for &name in REQUIRED_PROGRAMS {
            programs.insert(name, Some(PathBuf::from("/usr/bin").join(name)));
        }
        programs.insert("make", None);

        let info = SystemInfo::with_programs(programs);
        assert!(info.check_requirements().is_err());
    }

    #[test]
    fn complete_required_set_passes_check() {
        let mut programs: HashMap<&'static str, Option<PathBuf>> = HashMap::new();
        for &name in REQUIRED_PROGRAMS.iter().chain(OPTIONAL_PROGRAMS) {
            programs.insert(name, Some(PathBuf::from("/usr/bin").join(name)));
        }

        let info = SystemInfo::with_programs(programs);
        assert!(info.check_requirements().is_ok());
        assert!(info.has("java").is_some());
    }

    #[test]
    fn optional_programs_may_be_absent() {
        let mut programs: HashMap<&'static str, Option<PathBuf>> = HashMap::new();
        for &name in REQUIRED_PROGRAMS {
            programs.insert(name, Some(PathBuf::from("/usr/bin").join(name)));
        }
        for &name in OPTIONAL_PROGRAMS {
            programs.insert(name, None);
        }

        let info = SystemInfo::with_programs(programs);
        assert!(info.check_requirements().is_ok());
        assert!(info.has("bzr").is_none());
    }

    #[test]
    fn probe_finds_a_shell_utility() {
        // `sh` is not part of the probed set, but the PATH walk itself can
        // be exercised through any program guaranteed to exist.
        assert!(find_in_path("sh").is_some());
    }
}
