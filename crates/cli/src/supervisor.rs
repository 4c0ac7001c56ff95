//! Process-level supervisor
//!
//! Verifies the coordinator protocol, probes host requirements, writes
//! the PID file, spawns one worker per instance and installs the signal
//! handling that tears down the whole build tree.

use autobuild_config::Settings;
use autobuild_core::{Error, PidSlots, Result};
use autobuild_utils::pidfile::write_pid_file;
use autobuild_utils::SystemInfo;
use autobuild_worker::instance::Instance;
use autobuild_worker::{http, version};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::sync::Arc;
use std::thread;
use tokio::task::JoinSet;

pub async fn run(settings: Settings) -> Result<()> {
    let client = http::client()?;

    if !version::check_version(&client, &settings.http_url).await? {
        return Err(Error::configuration(
            "coordinator speaks a newer protocol than this daemon, please upgrade",
        ));
    }

    let sysinfo = SystemInfo::probe();
    sysinfo.check_requirements()?;

    write_pid_file(&settings.pid_file)?;

    let work_dir = std::env::current_dir()
        .map_err(|e| Error::file_system(".", "resolve working directory", e))?;

    let slots = PidSlots::new(settings.ninstances);
    install_signal_handlers(slots.clone())?;

    let settings = Arc::new(settings);
    let sysinfo = Arc::new(sysinfo);

    tracing::info!("starting {} build instance(s)", settings.ninstances);
    let mut workers = JoinSet::new();
    for idx in 0..settings.ninstances {
        let instance = Instance::new(
            idx,
            &work_dir,
            Arc::clone(&settings),
            Arc::clone(&sysinfo),
            client.clone(),
            slots.clone(),
        );
        workers.spawn(async move { (idx, instance.run().await) });
    }

    // A worker only returns on a fatal error, so any completion is
    // escalated as soon as it happens, whichever instance it came from.
    let mut failed = false;
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok((idx, Err(e))) => {
                tracing::error!(instance = idx, "instance terminated: {e}");
                failed = true;
            }
            Ok((_, Ok(()))) => {}
            Err(e) => {
                tracing::error!("instance panicked: {e}");
                failed = true;
            }
        }
    }

    if failed {
        Err(Error::configuration("one or more instances terminated"))
    } else {
        Ok(())
    }
}

/// Tear the whole process tree down on SIGINT/SIGTERM.
///
/// The builds run under the external `timeout` helper, which places its
/// child in its own process group; signalling our own group would miss
/// those grand-children. Every published build PID is therefore signalled
/// directly, then the process group is swept for stragglers.
fn install_signal_handlers(slots: PidSlots) -> Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM])
        .map_err(|e| Error::configuration(format!("cannot install signal handlers: {e}")))?;

    thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            tracing::info!("received signal {signal}, shutting down");

            for pid in slots.live() {
                // A stale PID whose process already exited yields ESRCH,
                // which is fine.
                unsafe {
                    libc::kill(pid, libc::SIGTERM);
                }
            }

            // Sweep the rest of our own process group (git, make's
            // children that escaped the timeout group, ...). Our own
            // SIGTERM disposition is the signal-hook handler, so this
            // does not re-enter.
            unsafe {
                libc::kill(0, libc::SIGTERM);
            }

            std::process::exit(1);
        }
    });

    Ok(())
}
