//! Result packaging
//!
//! Turns a finished (or failed, or timed-out) build tree into the
//! `results/` directory the coordinator understands, then archives it as
//! a bzip2 tarball. Packaging failures are fatal for the owning worker;
//! everything the coordinator needs would otherwise be silently lost.

use crate::paths::InstancePaths;
use autobuild_core::{constants, BuildResult, Error, FailureReason, Result};
use autobuild_utils::fs::tail_lines;
use bzip2::write::BzEncoder;
use bzip2::Compression;
use memmap2::Mmap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::process::Command;
use walkdir::WalkDir;

/// Files worth keeping from the failing package's build tree.
const DIAGNOSTIC_FILES: &[&str] = &[
    "config.log",
    "CMakeCache.txt",
    "CMakeError.log",
    "CMakeOutput.log",
];

/// Assemble `results/` and archive it. Returns the tarball path.
pub fn package_results(
    paths: &InstancePaths,
    result: &BuildResult,
    submitter: &str,
) -> Result<std::path::PathBuf> {
    let results = paths.results_dir();
    fs::create_dir_all(&results)
        .map_err(|e| Error::packaging(&results, format!("create results dir: {e}")))?;

    copy_required(&result.config, &results.join("config"))?;
    copy_required(&result.defconfig, &results.join("defconfig"))?;
    copy_optional(
        &paths.build_dir().join("build-time.log"),
        &results.join("build-time.log"),
    )?;
    if let Some(manifest) = &result.legal_manifest {
        copy_optional(manifest, &results.join("licenses-manifest.csv"))?;
    }

    write_gitid(&paths.source(), &results.join("gitid"))?;

    let reason = find_failure_reason(&result.logfile);
    write_end_log(
        &result.logfile,
        reason.as_ref(),
        &results.join("build-end.log"),
    )?;
    if let Some(reason) = &reason {
        collect_config_logs(&paths.build_dir(), reason, &results)?;
    }

    fs::write(results.join("status"), result.status.as_str())
        .map_err(|e| Error::packaging(&results, format!("write status: {e}")))?;
    fs::write(results.join("submitter"), submitter)
        .map_err(|e| Error::packaging(&results, format!("write submitter: {e}")))?;

    let tarball = paths.tarball();
    archive_results(&results, &tarball)?;
    Ok(tarball)
}

/// Diagnose the failing package from the last lines of the build log.
///
/// make reports the failing rule as
/// `make: *** .../(build|toolchain)/<pkg-ver>/...`; the directory name
/// splits on its final dash into package and version.
pub fn find_failure_reason(logfile: &Path) -> Option<FailureReason> {
    static FAILURE_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"make: \*\*\* .*/(?:build|toolchain)/([^/]*)/").unwrap());

    let lines = tail_lines(logfile, constants::FAILURE_SCAN_LINES).ok()?;
    for line in &lines {
        if let Some(captures) = FAILURE_RE.captures(line) {
            return Some(FailureReason::from_build_dir(&captures[1]));
        }
    }
    None
}

/// Extract the interesting tail of the build log.
///
/// When the failing package is known, everything from the first
/// `>>> <package> <version>` marker to the end of the log is kept; the
/// log is memory-mapped because it can reach hundreds of MB and the
/// marker search is a single linear scan. Without a reason (or marker),
/// the last 500 lines are kept instead.
pub fn write_end_log(
    logfile: &Path,
    reason: Option<&FailureReason>,
    dest: &Path,
) -> Result<()> {
    if !logfile.is_file() {
        return fs::write(dest, b"")
            .map_err(|e| Error::packaging(dest, format!("write end log: {e}")));
    }

    if let Some(reason) = reason {
        let file = fs::File::open(logfile)
            .map_err(|e| Error::packaging(logfile, format!("open log: {e}")))?;
        let len = file
            .metadata()
            .map_err(|e| Error::packaging(logfile, format!("stat log: {e}")))?
            .len();
        if len > 0 {
            let mmap = unsafe { Mmap::map(&file) }
                .map_err(|e| Error::packaging(logfile, format!("map log: {e}")))?;
            if let Some(offset) = find_subslice(&mmap, reason.marker().as_bytes()) {
                return fs::write(dest, &mmap[offset..])
                    .map_err(|e| Error::packaging(dest, format!("write end log: {e}")));
            }
        }
    }

    let mut tail = tail_lines(logfile, constants::END_LOG_FALLBACK_LINES)?.join("\n");
    if !tail.is_empty() {
        tail.push('\n');
    }
    fs::write(dest, tail).map_err(|e| Error::packaging(dest, format!("write end log: {e}")))
}

/// Mirror the failing package's configure/CMake diagnostics into the
/// results tree, preserving their relative layout.
pub fn collect_config_logs(
    build_root: &Path,
    reason: &FailureReason,
    results: &Path,
) -> Result<()> {
    let package_dir = build_root.join(reason.build_dir());
    if !package_dir.is_dir() {
        return Ok(());
    }

    for entry in WalkDir::new(&package_dir).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !DIAGNOSTIC_FILES.contains(&name.as_ref()) {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(build_root) else {
            continue;
        };
        let dest = results.join(relative);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::packaging(parent, format!("create mirror dir: {e}")))?;
        }
        fs::copy(entry.path(), &dest)
            .map_err(|e| Error::packaging(entry.path(), format!("copy diagnostic: {e}")))?;
    }
    Ok(())
}

/// Record the checkout's HEAD commit. git failures are ignored; the file
/// may legitimately be empty.
fn write_gitid(source: &Path, dest: &Path) -> Result<()> {
    let gitid = Command::new("git")
        .arg("-C")
        .arg(source)
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| output.stdout)
        .unwrap_or_default();
    fs::write(dest, gitid).map_err(|e| Error::packaging(dest, format!("write gitid: {e}")))
}

fn archive_results(results: &Path, tarball: &Path) -> Result<()> {
    let file = fs::File::create(tarball)
        .map_err(|e| Error::packaging(tarball, format!("create tarball: {e}")))?;
    let encoder = BzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder
        .append_dir_all("results", results)
        .map_err(|e| Error::packaging(tarball, format!("archive results: {e}")))?;
    builder
        .into_inner()
        .and_then(|encoder| encoder.finish())
        .map_err(|e| Error::packaging(tarball, format!("finish tarball: {e}")))?;
    Ok(())
}

fn copy_required(from: &Path, to: &Path) -> Result<()> {
    fs::copy(from, to)
        .map(|_| ())
        .map_err(|e| Error::packaging(from, format!("copy into results: {e}")))
}

fn copy_optional(from: &Path, to: &Path) -> Result<()> {
    if from.is_file() {
        copy_required(from, to)?;
    }
    Ok(())
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
