//! Merged runtime settings
//!
//! Every option resolves with the same priority: command line, then
//! config file, then embedded default.

use crate::cli::Cli;
use crate::file;
use autobuild_core::{constants, Error, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

/// Fully-resolved daemon settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub ninstances: usize,
    pub njobs: usize,
    pub nice: i32,
    pub submitter: String,
    pub http_url: String,
    pub http_login: Option<String>,
    pub http_password: Option<String>,
    pub make_opts: Vec<String>,
    pub pid_file: PathBuf,
    pub tc_cfg_uri: String,
}

impl Settings {
    /// Resolve settings from the parsed command line, loading the config
    /// file when one was named.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let values = match &cli.config {
            Some(path) => file::load(path)?,
            None => HashMap::new(),
        };

        let make_opts = cli
            .make_opts
            .clone()
            .or_else(|| values.get("make-opts").cloned())
            .map(|opts| opts.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        Ok(Settings {
            ninstances: pick_parsed(
                cli.ninstances,
                &values,
                "ninstances",
                constants::DEFAULT_NINSTANCES,
            )?,
            njobs: pick_parsed(cli.njobs, &values, "njobs", constants::DEFAULT_NJOBS)?,
            nice: pick_parsed(cli.nice, &values, "nice", constants::DEFAULT_NICE)?,
            submitter: pick(
                &cli.submitter,
                &values,
                "submitter",
                constants::DEFAULT_SUBMITTER,
            ),
            http_url: normalize_base_url(pick(
                &cli.http_url,
                &values,
                "http-url",
                constants::DEFAULT_HTTP_URL,
            )),
            http_login: pick_optional(&cli.http_login, &values, "http-login"),
            http_password: pick_optional(&cli.http_password, &values, "http-password"),
            make_opts,
            pid_file: cli
                .pid_file
                .clone()
                .or_else(|| values.get("pid-file").map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(constants::DEFAULT_PID_FILE)),
            tc_cfg_uri: pick(
                &cli.tc_cfg_uri,
                &values,
                "tc-cfg-uri",
                constants::DEFAULT_TOOLCHAIN_CSV_URI,
            ),
        })
    }

    /// Uploading is enabled when both credentials are present and
    /// non-empty.
    pub fn upload_enabled(&self) -> bool {
        matches!(
            (&self.http_login, &self.http_password),
            (Some(login), Some(password)) if !login.is_empty() && !password.is_empty()
        )
    }
}

fn pick(
    cli_value: &Option<String>,
    values: &HashMap<String, String>,
    key: &str,
    default: &str,
) -> String {
    cli_value
        .clone()
        .or_else(|| values.get(key).cloned())
        .unwrap_or_else(|| default.to_string())
}

fn pick_optional(
    cli_value: &Option<String>,
    values: &HashMap<String, String>,
    key: &str,
) -> Option<String> {
    cli_value.clone().or_else(|| values.get(key).cloned())
}

fn pick_parsed<T>(
    cli_value: Option<T>,
    values: &HashMap<String, String>,
    key: &str,
    default: T,
) -> Result<T>
where
    T: FromStr,
{
    if let Some(value) = cli_value {
        return Ok(value);
    }
    match values.get(key) {
        Some(raw) => raw.parse().map_err(|_| {
            Error::configuration(format!("invalid value '{raw}' for config key '{key}'"))
        }),
        None => Ok(default),
    }
}

/// Endpoint paths are joined onto the base URL, so it must end with `/`.
fn normalize_base_url(mut url: String) -> String {
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn defaults_apply_without_flags_or_file() {
        let settings = Settings::resolve(&Cli::default()).unwrap();

        assert_eq!(settings.ninstances, 1);
        assert_eq!(settings.njobs, 1);
        assert_eq!(settings.nice, 0);
        assert_eq!(settings.submitter, "N/A");
        assert_eq!(settings.http_url, "http://autobuild.buildroot.org/");
        assert_eq!(settings.pid_file, PathBuf::from("/tmp/buildroot-autobuild.pid"));
        assert!(settings.make_opts.is_empty());
        assert!(!settings.upload_enabled());
    }

    #[test]
    fn command_line_beats_config_file() {
        let tmp = TempDir::new().unwrap();
        let conf = tmp.path().join("autobuild.conf");
        fs::write(
            &conf,
            "[main]\nninstances = 8\nnice = 19\nhttp-login = filed\n",
        )
        .unwrap();

        let cli = Cli {
            ninstances: Some(2),
            config: Some(conf),
            ..Cli::default()
        };
        let settings = Settings::resolve(&cli).unwrap();

        // flag wins over file, file wins over default
        assert_eq!(settings.ninstances, 2);
        assert_eq!(settings.nice, 19);
        assert_eq!(settings.http_login.as_deref(), Some("filed"));
    }

    #[test]
    fn make_opts_split_on_whitespace() {
        let cli = Cli {
            make_opts: Some("V=1 BR2_CCACHE=y".to_string()),
            ..Cli::default()
        };
        let settings = Settings::resolve(&cli).unwrap();
        assert_eq!(settings.make_opts, vec!["V=1", "BR2_CCACHE=y"]);
    }

    #[test]
    fn upload_requires_both_credentials() {
        let cli = Cli {
            http_login: Some("user".to_string()),
            ..Cli::default()
        };
        assert!(!Settings::resolve(&cli).unwrap().upload_enabled());

        let cli = Cli {
            http_login: Some("user".to_string()),
            http_password: Some("secret".to_string()),
            ..Cli::default()
        };
        assert!(Settings::resolve(&cli).unwrap().upload_enabled());

        let cli = Cli {
            http_login: Some(String::new()),
            http_password: Some("secret".to_string()),
            ..Cli::default()
        };
        assert!(!Settings::resolve(&cli).unwrap().upload_enabled());
    }

    #[test]
    fn base_url_gains_trailing_slash() {
        let cli = Cli {
            http_url: Some("http://coordinator.example.org".to_string()),
            ..Cli::default()
        };
        let settings = Settings::resolve(&cli).unwrap();
        assert_eq!(settings.http_url, "http://coordinator.example.org/");
    }

    #[test]
    fn bad_numeric_value_in_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let conf = tmp.path().join("autobuild.conf");
        fs::write(&conf, "[main]\nninstances = lots\n").unwrap();

        let cli = Cli {
            config: Some(conf),
            ..Cli::default()
        };
        assert!(Settings::resolve(&cli).is_err());
    }
}
