/// Constants shared across the autobuilder crates.
// Protocol version spoken with the coordinator. The daemon refuses to start
// (or keep running) when the remote reports a higher version.
pub const PROTOCOL_VERSION: u32 = 1;

// Wall-clock bound for a single build, enforced by the external `timeout`
// helper. `timeout` exits with 124 when the bound is hit.
pub const MAX_BUILD_DURATION_SECS: u64 = 8 * 60 * 60;
pub const TIMEOUT_EXIT_CODE: i32 = 124;

// Bound on the randpackageconfig loop before the cycle is abandoned.
pub const RANDCONFIG_MAX_ATTEMPTS: u32 = 100;

// KCONFIG_PROBABILITY is drawn uniformly from this inclusive range.
pub const KCONFIG_PROBABILITY_MIN: u32 = 1;
pub const KCONFIG_PROBABILITY_MAX: u32 = 30;

// How many download-cache entries are evicted at the start of each cycle.
pub const DL_CACHE_EVICTIONS: usize = 5;

// Log forensics: how many trailing lines are scanned for the failing
// package, and how many are kept when no package marker is found.
pub const FAILURE_SCAN_LINES: usize = 4;
pub const END_LOG_FALLBACK_LINES: usize = 500;

// Embedded defaults; overridable by config file, then command line.
pub const DEFAULT_NINSTANCES: usize = 1;
pub const DEFAULT_NJOBS: usize = 1;
pub const DEFAULT_NICE: i32 = 0;
pub const DEFAULT_SUBMITTER: &str = "N/A";
pub const DEFAULT_PID_FILE: &str = "/tmp/buildroot-autobuild.pid";
pub const DEFAULT_HTTP_URL: &str = "http://autobuild.buildroot.org/";
pub const DEFAULT_TOOLCHAIN_CSV_URI: &str =
    "http://autobuild.buildroot.org/toolchains/configs/toolchain-configs.csv";

// Coordinator endpoints, joined onto the configured base URL.
pub const VERSION_ENDPOINT: &str = "version";
pub const SUBMIT_ENDPOINT: &str = "submit/";

// Where the build framework is checked out from.
pub const BUILDROOT_GIT_URL: &str = "git://git.buildroot.net/buildroot";

// Instance directory layout.
pub const DL_DIR_NAME: &str = "dl";
pub const SOURCE_DIR_NAME: &str = "buildroot";
pub const OUTPUT_DIR_NAME: &str = "output";
pub const INSTANCE_LOG_NAME: &str = "instance.log";
