//! Filesystem helpers for build trees and large logs

use autobuild_core::{Error, Result};
use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Remove a directory tree, clearing write-protection when the plain
/// removal fails.
///
/// Build trees routinely contain read-only files and directories (CVS
/// checkouts, ccache objects); `remove_dir_all` alone gives up on those.
pub fn force_remove_dir_all(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }

    if fs::remove_dir_all(path).is_ok() {
        return Ok(());
    }

    make_tree_writable(path)?;
    fs::remove_dir_all(path).map_err(|e| Error::file_system(path, "remove directory tree", e))
}

#[cfg(unix)]
fn make_tree_writable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata =
        fs::symlink_metadata(path).map_err(|e| Error::file_system(path, "stat", e))?;
    if metadata.file_type().is_symlink() {
        return Ok(());
    }

    let mut perms = metadata.permissions();
    perms.set_mode(perms.mode() | 0o700);
    fs::set_permissions(path, perms)
        .map_err(|e| Error::file_system(path, "set permissions", e))?;

    if metadata.is_dir() {
        let entries = fs::read_dir(path).map_err(|e| Error::file_system(path, "read dir", e))?;
        for entry in entries {
            let entry = entry.map_err(|e| Error::file_system(path, "read dir entry", e))?;
            make_tree_writable(&entry.path())?;
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn make_tree_writable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Read the last `n` lines of a file without loading the whole file.
///
/// Build logs can reach hundreds of MB; the read walks backwards in fixed
/// chunks from the end until enough line breaks are seen.
pub fn tail_lines(path: &Path, n: usize) -> Result<Vec<String>> {
    const CHUNK: u64 = 64 * 1024;

    let mut file =
        fs::File::open(path).map_err(|e| Error::file_system(path, "open", e))?;
    let len = file
        .metadata()
        .map_err(|e| Error::file_system(path, "stat", e))?
        .len();

    let mut buf: Vec<u8> = Vec::new();
    let mut pos = len;

    while pos > 0 {
        let start = pos.saturating_sub(CHUNK);
        let mut chunk = vec![0u8; (pos - start) as usize];
        file.seek(SeekFrom::Start(start))
            .map_err(|e| Error::file_system(path, "seek", e))?;
        file.read_exact(&mut chunk)
            .map_err(|e| Error::file_system(path, "read", e))?;
        chunk.extend_from_slice(&buf);
        buf = chunk;
        pos = start;

        // One extra newline: the final line may end with one of its own.
        if buf.iter().filter(|&&b| b == b'\n').count() > n {
            break;
        }
    }

    let text = String::from_utf8_lossy(&buf);
    let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
    if lines.len() > n {
        lines.drain(..lines.len() - n);
    }
    Ok(lines)
}
