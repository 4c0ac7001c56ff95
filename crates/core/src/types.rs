//! Build outcome types

use std::path::PathBuf;

/// Terminal outcome of one build cycle.
///
/// All three are first-class results that get packaged and submitted;
/// none of them is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStatus {
    /// The build and the legal-info pass both succeeded
    Ok,
    /// The build (or the legal-info pass) failed
    Nok,
    /// The build hit the wall-clock bound
    Timeout,
}

impl BuildStatus {
    /// Map a child exit code to a status.
    ///
    /// The external `timeout` wrapper exits with 124 when the bound is
    /// reached; every other non-zero exit is a plain failure.
    pub fn from_exit_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => BuildStatus::Ok,
            Some(crate::constants::TIMEOUT_EXIT_CODE) => BuildStatus::Timeout,
            _ => BuildStatus::Nok,
        }
    }

    /// The literal string written to the `status` marker file.
    pub fn as_str(self) -> &'static str {
        match self {
            BuildStatus::Ok => "OK",
            BuildStatus::Nok => "NOK",
            BuildStatus::Timeout => "TIMEOUT",
        }
    }
}

/// The failing package diagnosed from the tail of a build log.
///
/// Always derived from the log of the cycle being packaged, never stored
/// across cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReason {
    pub package: String,
    pub version: Option<String>,
}

impl FailureReason {
    /// Split a build-tree directory name into (package, version) on its
    /// final `-`. A name without a dash yields a versionless reason.
    pub fn from_build_dir(segment: &str) -> Self {
        match segment.rsplit_once('-') {
            Some((package, version)) => FailureReason {
                package: package.to_string(),
                version: Some(version.to_string()),
            },
            None => FailureReason {
                package: segment.to_string(),
                version: None,
            },
        }
    }

    /// The `>>> <package> <version>` marker the build framework prints
    /// when it starts working on a package.
    pub fn marker(&self) -> String {
        match &self.version {
            Some(version) => format!(">>> {} {}", self.package, version),
            None => format!(">>> {}", self.package),
        }
    }

    /// The `<package>-<version>` build-tree directory name.
    pub fn build_dir(&self) -> String {
        match &self.version {
            Some(version) => format!("{}-{}", self.package, version),
            None => self.package.clone(),
        }
    }
}

/// Outcome of one build, with the artifact paths the packager needs.
#[derive(Debug, Clone)]
pub struct BuildResult {
    pub status: BuildStatus,
    pub config: PathBuf,
    pub defconfig: PathBuf,
    pub logfile: PathBuf,
    pub legal_manifest: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_mapping() {
        assert_eq!(BuildStatus::from_exit_code(Some(0)), BuildStatus::Ok);
        assert_eq!(BuildStatus::from_exit_code(Some(124)), BuildStatus::Timeout);
        assert_eq!(BuildStatus::from_exit_code(Some(2)), BuildStatus::Nok);
        assert_eq!(BuildStatus::from_exit_code(None), BuildStatus::Nok);
    }

    #[test]
    fn status_markers() {
        assert_eq!(BuildStatus::Ok.as_str(), "OK");
        assert_eq!(BuildStatus::Nok.as_str(), "NOK");
        assert_eq!(BuildStatus::Timeout.as_str(), "TIMEOUT");
    }

    #[test]
    fn reason_splits_on_final_dash() {
        let reason = FailureReason::from_build_dir("qt5location-5.6.1-1");
        assert_eq!(reason.package, "qt5location-5.6.1");
        assert_eq!(reason.version.as_deref(), Some("1"));
        assert_eq!(reason.marker(), ">>> qt5location-5.6.1 1");
        assert_eq!(reason.build_dir(), "qt5location-5.6.1-1");
    }

    #[test]
    fn reason_without_dash_has_no_version() {
        let reason = FailureReason::from_build_dir("busybox");
        assert_eq!(reason.package, "busybox");
        assert_eq!(reason.version, None);
        assert_eq!(reason.marker(), ">>> busybox");
    }
}
