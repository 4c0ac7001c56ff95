//! Timed build execution
//!
//! The build runs under the external `timeout` helper (which isolates it
//! in its own process group and exits 124 on expiry) and `nice`. While
//! the child is alive its PID sits in the shared slot array so the
//! shutdown path can signal it directly.

use crate::journal::Journal;
use crate::paths::InstancePaths;
use autobuild_config::Settings;
use autobuild_core::{constants, BuildResult, BuildStatus, Error, PidSlots, Result};
use std::fs::OpenOptions;
use std::process::Stdio;
use tokio::process::Command;

/// Run the build and, on success, the legal-info pass.
pub async fn run_build(
    settings: &Settings,
    paths: &InstancePaths,
    slots: &PidSlots,
    instance: usize,
    journal: &Journal,
) -> Result<BuildResult> {
    journal.log("starting build");

    let exit_code = run_logged(build_command(settings, paths), paths, slots, instance).await?;
    let mut status = BuildStatus::from_exit_code(exit_code);

    match status {
        BuildStatus::Ok => {
            journal.log("build successful, collecting legal-info");
            let exit_code =
                run_logged(legal_info_command(paths), paths, slots, instance).await?;
            if exit_code != Some(0) {
                journal.log("legal-info failed");
                status = BuildStatus::Nok;
            }
        }
        BuildStatus::Timeout => journal.log("build timed out"),
        BuildStatus::Nok => journal.log("build failed"),
    }

    let legal_manifest = Some(paths.legal_manifest()).filter(|p| p.is_file());
    Ok(BuildResult {
        status,
        config: paths.config(),
        defconfig: paths.defconfig(),
        logfile: paths.logfile(),
        legal_manifest,
    })
}

fn build_command(settings: &Settings, paths: &InstancePaths) -> Command {
    let mut cmd = Command::new("timeout");
    cmd.arg(constants::MAX_BUILD_DURATION_SECS.to_string())
        .arg("nice")
        .arg("-n")
        .arg(settings.nice.to_string())
        .arg("make")
        .arg(format!("O={}", paths.output().display()))
        .arg("-C")
        .arg(paths.source())
        .arg(format!("BR2_DL_DIR={}", paths.dl().display()))
        .arg(format!("BR2_JLEVEL={}", settings.njobs))
        .args(&settings.make_opts);
    cmd
}

fn legal_info_command(paths: &InstancePaths) -> Command {
    let mut cmd = Command::new("make");
    cmd.arg(format!("O={}", paths.output().display()))
        .arg("-C")
        .arg(paths.source())
        .arg("legal-info");
    cmd
}

/// Run a command with both output streams appended to the build log,
/// publishing its PID in the shared slot for the duration of the wait.
async fn run_logged(
    mut cmd: Command,
    paths: &InstancePaths,
    slots: &PidSlots,
    instance: usize,
) -> Result<Option<i32>> {
    let logfile = paths.logfile();
    let log = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&logfile)
        .map_err(|e| Error::file_system(&logfile, "open build log", e))?;
    let log_err = log
        .try_clone()
        .map_err(|e| Error::file_system(&logfile, "clone build log handle", e))?;

    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::from(log))
        .stderr(Stdio::from(log_err))
        .spawn()
        .map_err(|e| Error::command_execution("build", e.to_string(), None))?;

    if let Some(pid) = child.id() {
        slots.publish(instance, pid);
    }
    let status = child.wait().await;
    slots.clear(instance);

    let status = status.map_err(|e| Error::command_execution("build", e.to_string(), None))?;
    Ok(status.code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use autobuild_config::Cli;
    use std::path::Path;

    fn settings() -> Settings {
        let cli = Cli {
            njobs: Some(4),
            nice: Some(10),
            make_opts: Some("V=1".to_string()),
            ..Cli::default()
        };
        Settings::resolve(&cli).unwrap()
    }

    fn argv(cmd: &Command) -> Vec<String> {
        let std_cmd = cmd.as_std();
        std::iter::once(std_cmd.get_program())
            .chain(std_cmd.get_args())
            .map(|s| s.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn build_command_line_shape() {
        let paths = InstancePaths::new(Path::new("/work"), 0);
        let args = argv(&build_command(&settings(), &paths));

        assert_eq!(
            args,
            vec![
                "timeout",
                "28800",
                "nice",
                "-n",
                "10",
                "make",
                "O=/work/instance-0/output",
                "-C",
                "/work/instance-0/buildroot",
                "BR2_DL_DIR=/work/instance-0/dl",
                "BR2_JLEVEL=4",
                "V=1",
            ]
        );
    }

    #[test]
    fn legal_info_runs_without_the_timeout_wrapper() {
        let paths = InstancePaths::new(Path::new("/work"), 1);
        let args = argv(&legal_info_command(&paths));
        assert_eq!(args[0], "make");
        assert!(args.contains(&"legal-info".to_string()));
        assert!(!args.contains(&"timeout".to_string()));
    }
}
