//! Fixup filter for sampled configurations
//!
//! Encodes the currently-known bug set of the build framework and its
//! toolchains, not invariants of the autobuilder: rules come and go as
//! upstream bugs are fixed. Rules are evaluated strictly in order and each
//! one is a self-contained clause, so a new rule is one appended block
//! (or one appended table row).
//!
//! A rule either mutates the configuration (auto-accepting licence flags,
//! dropping or substituting selections) or vetoes it outright.

use crate::configlines::{enabled, not_set, ConfigLines};
use autobuild_utils::SystemInfo;

/// Outcome of the filter over one sampled configuration.
#[derive(Debug, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected(String),
}

/// Everything a rule may consult besides the configuration itself.
pub struct FixupContext<'a> {
    pub sysinfo: &'a SystemInfo,
    pub toolchain_url: &'a str,
    pub libc: &'a str,
}

/// Packages needing an interactive licence approval that the selection
/// pass leaves unset.
const LICENSE_APPROVALS: &[(&str, &str)] = &[
    ("BR2_PACKAGE_QT", "BR2_PACKAGE_QT_LICENSE_APPROVED"),
    ("BR2_PACKAGE_QT5BASE", "BR2_PACKAGE_QT5BASE_LICENSE_APPROVED"),
];

/// Packages that do not build against uClibc.
const UCLIBC_INCOMPATIBLE: &[&str] = &[
    "BR2_PACKAGE_LTP_TESTSUITE",
    "BR2_PACKAGE_XFSPROGS",
    "BR2_PACKAGE_MROUTED",
];

/// Host-tool gates: the selection needs the tool at build time.
const HOST_TOOL_GATES: &[(&str, &str)] = &[
    ("BR2_NEEDS_HOST_JAVA", "java"),
    ("BR2_NEEDS_HOST_JAVAC", "javac"),
    ("BR2_NEEDS_HOST_JAR", "jar"),
];

/// Package × toolchain combinations with known upstream bugs. The URL
/// fragment identifies the toolchain tarball.
const BROKEN_COMBINATIONS: &[(&str, &str)] = &[
    ("BR2_PACKAGE_LTTNG_TOOLS", "armv5-ctng-linux-gnueabi.tar.xz"),
    (
        "BR2_PACKAGE_LTTNG_TOOLS",
        "armv6-ctng-linux-uclibcgnueabi.tar.xz",
    ),
    (
        "BR2_PACKAGE_LTTNG_TOOLS",
        "armv7-ctng-linux-gnueabihf.tar.xz",
    ),
    ("BR2_PACKAGE_SDL", "powerpc-ctng_e500v2-linux-gnuspe.tar.xz"),
    (
        "BR2_PACKAGE_LIBMPEG2",
        "powerpc-ctng_e500v2-linux-gnuspe.tar.xz",
    ),
    ("BR2_PACKAGE_PYTHON3", "mips64el-ctng_n32-linux-gnu.tar.xz"),
    (
        "BR2_PACKAGE_STRONGSWAN",
        "mips64el-ctng_n32-linux-gnu.tar.xz",
    ),
    ("BR2_PACKAGE_EFL", "mipsel-ctng-linux-uclibc.tar.xz"),
    ("BR2_PACKAGE_GLIBMM", "mipsel-ctng-linux-uclibc.tar.xz"),
    ("BR2_PACKAGE_LIBFRIBIDI", "mipsel-ctng-linux-uclibc.tar.xz"),
];

const EMPTY_FEX_FILE: &str = "BR2_TARGET_SUNXI_BOARDS_FEX_FILE=\"\"\n";
const DEFAULT_FEX_FILE: &str = "BR2_TARGET_SUNXI_BOARDS_FEX_FILE=\"a10/hackberry.fex\"\n";

/// Apply the fixup rules to a sampled configuration.
///
/// Mutations are applied in place; the first veto wins. Re-applying the
/// filter to an accepted configuration is an identity.
pub fn fixup_config(lines: &mut ConfigLines, ctx: &FixupContext<'_>) -> Verdict {
    // Licence approvals cannot be answered interactively in a batch build.
    for (package, approval) in LICENSE_APPROVALS {
        if lines.contains(&enabled(package)) && lines.contains(&not_set(approval)) {
            lines.remove(&not_set(approval));
            lines.push(&enabled(approval));
        }
    }

    // uClibc toolchains: drop the selections that cannot build.
    if ctx.libc.starts_with("uclibc") {
        for package in UCLIBC_INCOMPATIBLE {
            lines.remove(&enabled(package));
        }
    }

    for (symbol, tool) in HOST_TOOL_GATES {
        if lines.contains(&enabled(symbol)) && ctx.sysinfo.has(tool).is_none() {
            return Verdict::Rejected(format!("{symbol} set but host has no {tool}"));
        }
    }

    // python-nfc fetches its sources through bzr.
    if lines.contains(&enabled("BR2_PACKAGE_PYTHON_NFC")) && ctx.sysinfo.has("bzr").is_none() {
        return Verdict::Rejected("BR2_PACKAGE_PYTHON_NFC set but host has no bzr".to_string());
    }

    for (symbol, fragment) in BROKEN_COMBINATIONS {
        if lines.contains(&enabled(symbol)) && ctx.toolchain_url.contains(fragment) {
            return Verdict::Rejected(format!("{symbol} is broken with {fragment}"));
        }
    }

    // alsa-lib only breaks on that toolchain when linking statically.
    if lines.contains(&enabled("BR2_PACKAGE_ALSA_LIB"))
        && lines.contains(&enabled("BR2_STATIC_LIBS"))
        && ctx.toolchain_url.contains("i486-ctng-linux-uclibc.tar.xz")
    {
        return Verdict::Rejected(
            "static BR2_PACKAGE_ALSA_LIB is broken with i486-ctng-linux-uclibc".to_string(),
        );
    }

    // libffi has no sh2a or ARMv7-M support.
    if lines.contains(&enabled("BR2_PACKAGE_LIBFFI"))
        && (lines.contains(&enabled("BR2_sh2a")) || lines.contains(&enabled("BR2_ARM_CPU_ARMV7M")))
    {
        return Verdict::Rejected("BR2_PACKAGE_LIBFFI has no sh2a/ARMv7-M support".to_string());
    }

    // The sunxi boards package needs a concrete FEX file path.
    if lines.contains(&enabled("BR2_TARGET_SUNXI_BOARDS")) && lines.contains(EMPTY_FEX_FILE) {
        lines.remove(EMPTY_FEX_FILE);
        lines.push(DEFAULT_FEX_FILE);
    }

    Verdict::Accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn sysinfo_with(present: &[&'static str]) -> SystemInfo {
        let mut programs: HashMap<&'static str, Option<PathBuf>> = HashMap::new();
        for name in ["make", "git", "gcc", "timeout", "bzr", "java", "javac", "jar"] {
            programs.insert(name, None);
        }
        for &name in present {
            programs.insert(name, Some(PathBuf::from("/usr/bin").join(name)));
        }
        SystemInfo::with_programs(programs)
    }

    fn ctx_for<'a>(sysinfo: &'a SystemInfo, url: &'a str, libc: &'a str) -> FixupContext<'a> {
        FixupContext {
            sysinfo,
            toolchain_url: url,
            libc,
        }
    }

    #[test]
    fn clean_configuration_is_accepted_unchanged() {
        let sysinfo = sysinfo_with(&[]);
        let ctx = ctx_for(&sysinfo, "http://example.org/tc.tar.xz", "glibc");
        let mut lines = ConfigLines::parse("BR2_PACKAGE_BUSYBOX=y\n");
        let before = lines.clone();

        assert_eq!(fixup_config(&mut lines, &ctx), Verdict::Accepted);
        assert_eq!(lines, before);
    }

    #[test]
    fn qt_license_gets_auto_approved() {
        let sysinfo = sysinfo_with(&[]);
        let ctx = ctx_for(&sysinfo, "http://example.org/tc.tar.xz", "glibc");
        let mut lines = ConfigLines::parse(
            "BR2_PACKAGE_QT=y\n\
             # BR2_PACKAGE_QT_LICENSE_APPROVED is not set\n",
        );

        assert_eq!(fixup_config(&mut lines, &ctx), Verdict::Accepted);
        assert!(lines.contains("BR2_PACKAGE_QT_LICENSE_APPROVED=y\n"));
        assert!(!lines.contains("# BR2_PACKAGE_QT_LICENSE_APPROVED is not set\n"));
    }

    #[test]
    fn accepted_configurations_are_a_fixpoint() {
        let sysinfo = sysinfo_with(&[]);
        let ctx = ctx_for(&sysinfo, "http://example.org/tc.tar.xz", "uclibc");
        let mut lines = ConfigLines::parse(
            "BR2_PACKAGE_QT5BASE=y\n\
             # BR2_PACKAGE_QT5BASE_LICENSE_APPROVED is not set\n\
             BR2_PACKAGE_LTP_TESTSUITE=y\n\
             BR2_TARGET_SUNXI_BOARDS=y\n\
             BR2_TARGET_SUNXI_BOARDS_FEX_FILE=\"\"\n",
        );

        assert_eq!(fixup_config(&mut lines, &ctx), Verdict::Accepted);
        let after_first = lines.clone();
        assert_eq!(fixup_config(&mut lines, &ctx), Verdict::Accepted);
        assert_eq!(lines, after_first);
    }

    #[test]
    fn uclibc_drops_incompatible_packages() {
        let sysinfo = sysinfo_with(&[]);
        let ctx = ctx_for(&sysinfo, "http://example.org/tc.tar.xz", "uclibc");
        let mut lines = ConfigLines::parse(
            "BR2_PACKAGE_LTP_TESTSUITE=y\n\
             BR2_PACKAGE_XFSPROGS=y\n\
             BR2_PACKAGE_MROUTED=y\n\
             BR2_PACKAGE_BUSYBOX=y\n",
        );

        assert_eq!(fixup_config(&mut lines, &ctx), Verdict::Accepted);
        assert_eq!(lines.as_text(), "BR2_PACKAGE_BUSYBOX=y\n");
    }

    #[test]
    fn glibc_keeps_those_packages() {
        let sysinfo = sysinfo_with(&[]);
        let ctx = ctx_for(&sysinfo, "http://example.org/tc.tar.xz", "glibc");
        let mut lines = ConfigLines::parse("BR2_PACKAGE_LTP_TESTSUITE=y\n");

        assert_eq!(fixup_config(&mut lines, &ctx), Verdict::Accepted);
        assert!(lines.contains("BR2_PACKAGE_LTP_TESTSUITE=y\n"));
    }

    #[test]
    fn java_selections_need_host_java() {
        let sysinfo = sysinfo_with(&[]);
        let ctx = ctx_for(&sysinfo, "http://example.org/tc.tar.xz", "glibc");
        let mut lines = ConfigLines::parse("BR2_NEEDS_HOST_JAVA=y\n");
        assert!(matches!(
            fixup_config(&mut lines, &ctx),
            Verdict::Rejected(_)
        ));

        let sysinfo = sysinfo_with(&["java"]);
        let ctx = ctx_for(&sysinfo, "http://example.org/tc.tar.xz", "glibc");
        let mut lines = ConfigLines::parse("BR2_NEEDS_HOST_JAVA=y\n");
        assert_eq!(fixup_config(&mut lines, &ctx), Verdict::Accepted);
    }

    #[test]
    fn python_nfc_needs_bzr() {
        let sysinfo = sysinfo_with(&[]);
        let ctx = ctx_for(&sysinfo, "http://example.org/tc.tar.xz", "glibc");
        let mut lines = ConfigLines::parse("BR2_PACKAGE_PYTHON_NFC=y\n");
        assert!(matches!(
            fixup_config(&mut lines, &ctx),
            Verdict::Rejected(_)
        ));
    }

    #[test]
    fn every_broken_combination_is_vetoed() {
        let sysinfo = sysinfo_with(&[]);
        for (symbol, fragment) in BROKEN_COMBINATIONS {
            let url = format!("http://toolchains.example.org/{fragment}");
            let ctx = ctx_for(&sysinfo, &url, "glibc");
            let mut lines = ConfigLines::parse(&enabled(symbol));
            assert!(
                matches!(fixup_config(&mut lines, &ctx), Verdict::Rejected(_)),
                "{symbol} with {fragment} must be rejected"
            );
        }
    }

    #[test]
    fn broken_package_on_another_toolchain_is_fine() {
        let sysinfo = sysinfo_with(&[]);
        let ctx = ctx_for(
            &sysinfo,
            "http://toolchains.example.org/x86_64-ctng-linux-gnu.tar.xz",
            "glibc",
        );
        let mut lines = ConfigLines::parse("BR2_PACKAGE_LTTNG_TOOLS=y\n");
        assert_eq!(fixup_config(&mut lines, &ctx), Verdict::Accepted);
    }

    #[test]
    fn alsa_lib_is_only_vetoed_when_static() {
        let sysinfo = sysinfo_with(&[]);
        let url = "http://toolchains.example.org/i486-ctng-linux-uclibc.tar.xz";

        let ctx = ctx_for(&sysinfo, url, "glibc");
        let mut lines = ConfigLines::parse("BR2_PACKAGE_ALSA_LIB=y\n");
        assert_eq!(fixup_config(&mut lines, &ctx), Verdict::Accepted);

        let mut lines = ConfigLines::parse("BR2_PACKAGE_ALSA_LIB=y\nBR2_STATIC_LIBS=y\n");
        assert!(matches!(
            fixup_config(&mut lines, &ctx),
            Verdict::Rejected(_)
        ));
    }

    #[test]
    fn libffi_is_vetoed_on_sh2a_and_armv7m() {
        let sysinfo = sysinfo_with(&[]);
        let ctx = ctx_for(&sysinfo, "http://example.org/tc.tar.xz", "glibc");

        for arch in ["BR2_sh2a", "BR2_ARM_CPU_ARMV7M"] {
            let mut lines =
                ConfigLines::parse(&format!("BR2_PACKAGE_LIBFFI=y\n{}", enabled(arch)));
            assert!(matches!(
                fixup_config(&mut lines, &ctx),
                Verdict::Rejected(_)
            ));
        }

        let mut lines = ConfigLines::parse("BR2_PACKAGE_LIBFFI=y\nBR2_arm=y\n");
        assert_eq!(fixup_config(&mut lines, &ctx), Verdict::Accepted);
    }

    #[test]
    fn empty_fex_file_gets_a_default() {
        let sysinfo = sysinfo_with(&[]);
        let ctx = ctx_for(&sysinfo, "http://example.org/tc.tar.xz", "glibc");
        let mut lines = ConfigLines::parse(
            "BR2_TARGET_SUNXI_BOARDS=y\n\
             BR2_TARGET_SUNXI_BOARDS_FEX_FILE=\"\"\n",
        );

        assert_eq!(fixup_config(&mut lines, &ctx), Verdict::Accepted);
        assert!(lines.contains(DEFAULT_FEX_FILE));
        assert!(!lines.contains(EMPTY_FEX_FILE));
    }
}
