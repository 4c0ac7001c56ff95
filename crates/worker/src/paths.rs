//! Instance directory layout
//!
//! Every worker owns `instance-<i>/` with a persistent download cache, a
//! build-framework checkout, an ephemeral output tree and its journal.
//! All paths are absolute so they can be handed to `make O=...` verbatim.

use autobuild_core::constants;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct InstancePaths {
    root: PathBuf,
}

impl InstancePaths {
    /// `base` must be absolute; the instance directory is created under it.
    pub fn new(base: &Path, instance: usize) -> Self {
        Self {
            root: base.join(format!("instance-{instance}")),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persistent download cache, perturbed at the start of each cycle.
    pub fn dl(&self) -> PathBuf {
        self.root.join(constants::DL_DIR_NAME)
    }

    /// The build-framework git checkout.
    pub fn source(&self) -> PathBuf {
        self.root.join(constants::SOURCE_DIR_NAME)
    }

    /// Ephemeral output tree, destroyed and recreated every cycle.
    pub fn output(&self) -> PathBuf {
        self.root.join(constants::OUTPUT_DIR_NAME)
    }

    pub fn instance_log(&self) -> PathBuf {
        self.root.join(constants::INSTANCE_LOG_NAME)
    }

    pub fn config(&self) -> PathBuf {
        self.output().join(".config")
    }

    pub fn defconfig(&self) -> PathBuf {
        self.output().join("defconfig")
    }

    pub fn logfile(&self) -> PathBuf {
        self.output().join("logfile")
    }

    pub fn build_dir(&self) -> PathBuf {
        self.output().join("build")
    }

    pub fn legal_manifest(&self) -> PathBuf {
        self.output().join("legal-info").join("manifest.csv")
    }

    pub fn results_dir(&self) -> PathBuf {
        self.output().join("results")
    }

    pub fn tarball(&self) -> PathBuf {
        self.output().join("results.tar.bz2")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_rooted_in_the_instance_directory() {
        let paths = InstancePaths::new(Path::new("/work"), 3);
        assert_eq!(paths.root(), Path::new("/work/instance-3"));
        assert_eq!(paths.dl(), Path::new("/work/instance-3/dl"));
        assert_eq!(paths.source(), Path::new("/work/instance-3/buildroot"));
        assert_eq!(paths.config(), Path::new("/work/instance-3/output/.config"));
        assert_eq!(
            paths.tarball(),
            Path::new("/work/instance-3/output/results.tar.bz2")
        );
    }
}
