//! Per-worker infinite build cycle
//!
//! Each instance owns its directory exclusively and runs strictly
//! sequentially: prepare → configure → build → report, forever.
//! Preparation and configuration failures are transient and abandon only
//! the current cycle; packaging failures end the worker.

use crate::journal::Journal;
use crate::paths::InstancePaths;
use crate::{builder, packager, sampler, submitter, version};
use autobuild_config::Settings;
use autobuild_core::{constants, Error, PidSlots, Result};
use autobuild_utils::fs::force_remove_dir_all;
use autobuild_utils::SystemInfo;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;

pub struct Instance {
    idx: usize,
    work_dir: PathBuf,
    paths: InstancePaths,
    settings: Arc<Settings>,
    sysinfo: Arc<SystemInfo>,
    client: reqwest::Client,
    slots: PidSlots,
}

impl Instance {
    pub fn new(
        idx: usize,
        work_dir: &Path,
        settings: Arc<Settings>,
        sysinfo: Arc<SystemInfo>,
        client: reqwest::Client,
        slots: PidSlots,
    ) -> Self {
        Self {
            idx,
            work_dir: work_dir.to_path_buf(),
            paths: InstancePaths::new(work_dir, idx),
            settings,
            sysinfo,
            client,
            slots,
        }
    }

    /// The infinite build cycle. Only packaging failures return.
    pub async fn run(self) -> Result<()> {
        fs::create_dir_all(self.paths.root())
            .map_err(|e| Error::file_system(self.paths.root(), "create instance dir", e))?;
        let journal = Journal::open(&self.paths.instance_log(), self.idx)?;
        let mut rng = StdRng::from_entropy();

        loop {
            match version::check_version(&self.client, &self.settings.http_url).await {
                Ok(true) => {}
                Ok(false) => {
                    journal.log("coordinator speaks a newer protocol, please upgrade");
                    std::process::exit(1);
                }
                Err(e) => {
                    journal.log(&format!("version check failed: {e}"));
                    continue;
                }
            }

            if let Err(e) = self.prepare_build(&journal, &mut rng).await {
                journal.log(&format!("preparation failed: {e}"));
                continue;
            }

            if let Err(e) = sampler::generate_config(
                &self.client,
                &self.settings,
                &self.sysinfo,
                &self.paths,
                &journal,
                &mut rng,
            )
            .await
            {
                journal.log(&format!("configuration failed: {e}"));
                continue;
            }

            let result = match builder::run_build(
                &self.settings,
                &self.paths,
                &self.slots,
                self.idx,
                &journal,
            )
            .await
            {
                Ok(result) => result,
                Err(e) => {
                    journal.log(&format!("build could not run: {e}"));
                    continue;
                }
            };

            journal.log(&format!("build result: {}", result.status.as_str()));

            let tarball = packager::package_results(&self.paths, &result, &self.settings.submitter)?;
            submitter::submit_results(
                &self.client,
                &self.settings,
                self.idx,
                &self.work_dir,
                &tarball,
                &journal,
            )
            .await?;
        }
    }

    /// Refresh the checkout, perturb the download cache, and recreate the
    /// output tree.
    async fn prepare_build(&self, journal: &Journal, rng: &mut impl Rng) -> Result<()> {
        let dl = self.paths.dl();
        fs::create_dir_all(&dl).map_err(|e| Error::file_system(&dl, "create dl cache", e))?;

        // Deliberately lose a few cache entries each cycle so download
        // and hash problems keep being exercised.
        let evicted = evict_dl_entries(&dl, rng)?;
        if evicted > 0 {
            journal.log(&format!("removed {evicted} file(s) from the dl cache"));
        }

        let source = self.paths.source();
        let source_str = source.to_string_lossy();
        if source.exists() {
            self.run_git(&["-C", source_str.as_ref(), "pull"]).await?;
        } else {
            journal.log("cloning the build framework");
            self.run_git(&["clone", constants::BUILDROOT_GIT_URL, source_str.as_ref()])
                .await?;
        }

        let output = self.paths.output();
        force_remove_dir_all(&output)?;
        fs::create_dir_all(&output)
            .map_err(|e| Error::file_system(&output, "create output dir", e))?;
        Ok(())
    }

    async fn run_git(&self, args: &[&str]) -> Result<()> {
        let output = Command::new("git")
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::command_execution("git", e.to_string(), None))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::command_execution(
                format!("git {}", args.first().unwrap_or(&"")),
                stderr.trim().to_string(),
                output.status.code(),
            ));
        }
        Ok(())
    }
}

/// Remove up to [`constants::DL_CACHE_EVICTIONS`] uniformly random
/// entries from the download cache. Returns how many were removed.
pub fn evict_dl_entries(dl: &Path, rng: &mut impl Rng) -> Result<usize> {
    let entries: Vec<PathBuf> = fs::read_dir(dl)
        .map_err(|e| Error::file_system(dl, "read dl cache", e))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .collect();

    let victims: Vec<&PathBuf> = entries
        .choose_multiple(rng, constants::DL_CACHE_EVICTIONS.min(entries.len()))
        .collect();

    for victim in &victims {
        if victim.is_dir() {
            force_remove_dir_all(victim)?;
        } else {
            fs::remove_file(victim)
                .map_err(|e| Error::file_system(victim.as_path(), "evict cache entry", e))?;
        }
    }
    Ok(victims.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::TempDir;

    fn populate(dl: &Path, count: usize) {
        fs::create_dir_all(dl).unwrap();
        for i in 0..count {
            fs::write(dl.join(format!("pkg-{i}.tar.gz")), b"cached").unwrap();
        }
    }

    fn remaining(dl: &Path) -> usize {
        fs::read_dir(dl).unwrap().count()
    }

    #[test]
    fn eviction_removes_exactly_five_from_a_full_cache() {
        let tmp = TempDir::new().unwrap();
        let dl = tmp.path().join("dl");
        populate(&dl, 12);

        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(evict_dl_entries(&dl, &mut rng).unwrap(), 5);
        assert_eq!(remaining(&dl), 7);
    }

    #[test]
    fn eviction_is_capped_by_the_cache_size() {
        let tmp = TempDir::new().unwrap();
        let dl = tmp.path().join("dl");
        populate(&dl, 3);

        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(evict_dl_entries(&dl, &mut rng).unwrap(), 3);
        assert_eq!(remaining(&dl), 0);
    }

    #[test]
    fn eviction_of_an_empty_cache_is_a_no_op() {
        let tmp = TempDir::new().unwrap();
        let dl = tmp.path().join("dl");
        fs::create_dir_all(&dl).unwrap();

        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(evict_dl_entries(&dl, &mut rng).unwrap(), 0);
    }

    #[test]
    fn eviction_handles_directory_entries() {
        let tmp = TempDir::new().unwrap();
        let dl = tmp.path().join("dl");
        fs::create_dir_all(dl.join("git-checkout")).unwrap();
        fs::write(dl.join("git-checkout").join("object"), b"x").unwrap();

        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(evict_dl_entries(&dl, &mut rng).unwrap(), 1);
        assert_eq!(remaining(&dl), 0);
    }
}
