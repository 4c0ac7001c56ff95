//! Random configuration sampling
//!
//! Draws a toolchain, seeds the configuration with a handful of fixed and
//! stochastic options, then drives the framework's `randpackageconfig`
//! until the fixup filter accepts the result (bounded), finishing with a
//! minimised defconfig.

use crate::configlines::{enabled, not_set, ConfigLines};
use crate::fixups::{fixup_config, FixupContext, Verdict};
use crate::journal::Journal;
use crate::paths::InstancePaths;
use crate::toolchain::{host_arch, ToolchainCatalog, ToolchainConfig};
use autobuild_config::Settings;
use autobuild_core::{constants, Error, Result};
use autobuild_utils::SystemInfo;
use rand::Rng;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Produce `output/.config` and `output/defconfig` for the next build.
///
/// Every failure here is cycle-transient: the caller abandons the cycle
/// and starts a new one.
pub async fn generate_config(
    client: &reqwest::Client,
    settings: &Settings,
    sysinfo: &SystemInfo,
    paths: &InstancePaths,
    journal: &Journal,
    rng: &mut (impl Rng + Send),
) -> Result<()> {
    let catalog = ToolchainCatalog::fetch(client, &settings.tc_cfg_uri).await?;
    let toolchain = catalog.pick(rng)?.clone();
    journal.log(&format!("using toolchain {}", toolchain.url));

    let lines = seed_config(&toolchain, rng);
    lines.write(&paths.config())?;

    run_oldconfig(paths).await?;

    if !toolchain_usable(&toolchain).await {
        return Err(Error::sampling(format!(
            "toolchain {} is not usable on this host",
            toolchain.url
        )));
    }

    let ctx = FixupContext {
        sysinfo,
        toolchain_url: &toolchain.url,
        libc: &toolchain.libc,
    };

    let mut accepted = false;
    for _attempt in 0..constants::RANDCONFIG_MAX_ATTEMPTS {
        let probability = rng.gen_range(
            constants::KCONFIG_PROBABILITY_MIN..=constants::KCONFIG_PROBABILITY_MAX,
        );
        run_make(
            paths,
            &[
                "randpackageconfig".to_string(),
                format!("KCONFIG_PROBABILITY={probability}"),
            ],
        )
        .await?;

        let mut lines = ConfigLines::read(&paths.config())?;
        match fixup_config(&mut lines, &ctx) {
            Verdict::Accepted => {
                lines.write(&paths.config())?;
                accepted = true;
                break;
            }
            Verdict::Rejected(reason) => {
                journal.log(&format!("configuration rejected: {reason}"));
            }
        }
    }
    if !accepted {
        let message = format!(
            "cannot generate random configuration after {} iterations",
            constants::RANDCONFIG_MAX_ATTEMPTS
        );
        journal.log(&message);
        return Err(Error::sampling(message));
    }

    run_oldconfig(paths).await?;
    run_make(paths, &["savedefconfig".to_string()]).await?;

    Ok(())
}

/// Seed the configuration from the toolchain fragment plus the fixed and
/// stochastic global options.
pub fn seed_config(toolchain: &ToolchainConfig, rng: &mut impl Rng) -> ConfigLines {
    let mut lines = toolchain.contents.clone();

    lines.push(&enabled("BR2_PACKAGE_BUSYBOX_SHOW_OTHERS"));
    lines.push(&not_set("BR2_TARGET_ROOTFS_TAR"));
    lines.push(&enabled("BR2_COMPILER_PARANOID_UNSAFE_PATH"));

    if rng.gen_range(0..=20) == 0 {
        lines.push(&enabled("BR2_ENABLE_DEBUG"));
    }
    if rng.gen_range(0..=30) == 0 {
        lines.push(&enabled("BR2_INIT_SYSTEMD"));
    } else if rng.gen_range(0..=20) == 0 {
        lines.push(&enabled("BR2_ROOTFS_DEVICE_CREATION_DYNAMIC_EUDEV"));
    }
    if toolchain.libc != "glibc" && rng.gen_range(0..=20) == 0 {
        lines.push(&enabled("BR2_STATIC_LIBS"));
    }

    lines
}

/// Linaro's ARM-family toolchains are built against a glibc newer than
/// some build hosts carry; reject them when the host C library is older
/// than 2.14.
pub async fn toolchain_usable(toolchain: &ToolchainConfig) -> bool {
    if host_arch() != "x86_64" || !is_linaro_arm_family(toolchain) {
        return true;
    }

    let output = match Command::new("ldd").arg("--version").output().await {
        Ok(output) => output,
        Err(_) => return true,
    };
    let stdout = String::from_utf8_lossy(&output.stdout);
    match stdout.lines().next().and_then(parse_ldd_version) {
        Some(version) => version >= (2, 14),
        None => true,
    }
}

/// The gate only concerns Linaro's ARM/AArch64/ARMEB toolchains; the
/// target architecture is read from the defconfig fragment rather than
/// guessed from the URL.
fn is_linaro_arm_family(toolchain: &ToolchainConfig) -> bool {
    const ARM_TARGETS: &[&str] = &["BR2_arm", "BR2_aarch64", "BR2_armeb"];
    toolchain.url.to_lowercase().contains("linaro")
        && ARM_TARGETS
            .iter()
            .any(|symbol| toolchain.contents.contains(&enabled(symbol)))
}

/// The glibc version is the last whitespace-separated token of
/// `ldd --version`'s first line, e.g. `ldd (GNU libc) 2.31`.
fn parse_ldd_version(first_line: &str) -> Option<(u32, u32)> {
    let token = first_line.split_whitespace().last()?;
    let mut parts = token.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    Some((major, minor))
}

/// Run `oldconfig`, answering every interactive prompt with an empty line
/// so newly introduced symbols take their defaults.
async fn run_oldconfig(paths: &InstancePaths) -> Result<()> {
    let mut child = make_command(paths, &["oldconfig".to_string()])
        .stdin(Stdio::piped())
        .spawn()
        .map_err(|e| Error::command_execution("make oldconfig", e.to_string(), None))?;

    if let Some(mut stdin) = child.stdin.take() {
        // More empty answers than any configuration has prompts.
        let _ = stdin.write_all(&[b'\n'; 1024]).await;
    }

    let status = child
        .wait()
        .await
        .map_err(|e| Error::command_execution("make oldconfig", e.to_string(), None))?;
    if !status.success() {
        return Err(Error::command_execution(
            "make oldconfig",
            "exited with failure".to_string(),
            status.code(),
        ));
    }
    Ok(())
}

/// Run a non-interactive configuration target.
async fn run_make(paths: &InstancePaths, args: &[String]) -> Result<()> {
    let target = format!("make {}", args.join(" "));
    let status = make_command(paths, args)
        .stdin(Stdio::null())
        .status()
        .await
        .map_err(|e| Error::command_execution(target.clone(), e.to_string(), None))?;
    if !status.success() {
        return Err(Error::command_execution(
            target,
            "exited with failure".to_string(),
            status.code(),
        ));
    }
    Ok(())
}

fn make_command(paths: &InstancePaths, args: &[String]) -> Command {
    let mut cmd = Command::new("make");
    cmd.arg(format!("O={}", paths.output().display()))
        .arg("-C")
        .arg(paths.source())
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    cmd
}
