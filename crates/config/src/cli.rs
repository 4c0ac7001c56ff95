//! Command-line surface

use clap::Parser;
use std::path::PathBuf;

/// Continuously build random Buildroot configurations and submit the
/// results to the coordinator.
#[derive(Parser, Debug, Default)]
#[command(name = "autobuild-run")]
#[command(about = "Buildroot autobuilder daemon", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Number of parallel build instances
    #[arg(long, value_name = "N")]
    pub ninstances: Option<usize>,

    /// Number of make jobs per build
    #[arg(long, value_name = "N")]
    pub njobs: Option<usize>,

    /// Niceness applied to every build
    #[arg(long, value_name = "N")]
    pub nice: Option<i32>,

    /// Submitter identification string sent with the results
    #[arg(long, value_name = "STRING")]
    pub submitter: Option<String>,

    /// Coordinator base URL
    #[arg(long, value_name = "URL")]
    pub http_url: Option<String>,

    /// HTTP login for result uploads
    #[arg(long, value_name = "STR")]
    pub http_login: Option<String>,

    /// HTTP password for result uploads
    #[arg(long, value_name = "STR")]
    pub http_password: Option<String>,

    /// Extra options appended to every make invocation
    #[arg(long, value_name = "STRING")]
    pub make_opts: Option<String>,

    /// Where to write the daemon PID
    #[arg(long, value_name = "PATH")]
    pub pid_file: Option<PathBuf>,

    /// Config file ([main] section, keys named after the long flags)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// URI of the toolchain configuration CSV
    #[arg(long, value_name = "URI")]
    pub tc_cfg_uri: Option<String>,
}
