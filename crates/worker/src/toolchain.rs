//! Remote toolchain catalogue
//!
//! The coordinator publishes a CSV of toolchain configurations, one
//! `(url, hostarch, libc)` row each. The catalogue keeps the rows this
//! host can run and fetches every admitted row's defconfig fragment. It
//! is re-fetched for every configuration draw, never cached.

use crate::configlines::ConfigLines;
use crate::http;
use autobuild_core::{Error, Result};
use rand::seq::SliceRandom;
use rand::Rng;

/// One admitted toolchain configuration.
#[derive(Debug, Clone)]
pub struct ToolchainConfig {
    pub url: String,
    pub host_arch: String,
    pub libc: String,
    pub contents: ConfigLines,
}

pub struct ToolchainCatalog {
    entries: Vec<ToolchainConfig>,
}

impl ToolchainCatalog {
    /// Download the CSV, filter for host compatibility, and fetch every
    /// admitted defconfig fragment. Any single fetch failure aborts the
    /// load.
    pub async fn fetch(client: &reqwest::Client, csv_uri: &str) -> Result<Self> {
        let body = http::get_text(client, csv_uri).await?;
        let rows = parse_rows(&body)?;
        let host = host_arch();

        let mut entries = Vec::new();
        for row in rows {
            if !admits(host, &row.host_arch) {
                continue;
            }
            let contents = http::get_text(client, &row.url).await?;
            entries.push(ToolchainConfig {
                url: row.url,
                host_arch: row.host_arch,
                libc: row.libc,
                contents: ConfigLines::parse(&contents),
            });
        }

        Ok(Self { entries })
    }

    /// Draw a uniformly random toolchain.
    pub fn pick(&self, rng: &mut impl Rng) -> Result<&ToolchainConfig> {
        self.entries
            .choose(rng)
            .ok_or_else(|| Error::sampling("no toolchain is usable on this host"))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[doc(hidden)]
    pub fn from_entries(entries: Vec<ToolchainConfig>) -> Self {
        Self { entries }
    }
}

struct CsvRow {
    url: String,
    host_arch: String,
    libc: String,
}

fn parse_rows(body: &str) -> Result<Vec<CsvRow>> {
    let mut rows = Vec::new();
    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != 3 {
            return Err(Error::configuration(format!(
                "malformed toolchain CSV row: '{line}'"
            )));
        }
        rows.push(CsvRow {
            url: fields[0].to_string(),
            host_arch: fields[1].to_string(),
            libc: fields[2].to_string(),
        });
    }
    Ok(rows)
}

/// The architecture of this machine, in catalogue terms.
pub fn host_arch() -> &'static str {
    normalize_arch(std::env::consts::ARCH)
}

/// The catalogue writes 32-bit x86 as `x86` regardless of flavour.
pub fn normalize_arch(raw: &str) -> &str {
    match raw {
        "i386" | "i486" | "i586" | "i686" | "x86" => "x86",
        other => other,
    }
}

/// Admission rule for one catalogue row on a given host.
pub fn admits(host: &str, row_arch: &str) -> bool {
    row_arch == "any" || row_arch == host || (host == "x86_64" && row_arch == "x86")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn arch_normalisation_folds_x86_flavours() {
        assert_eq!(normalize_arch("i686"), "x86");
        assert_eq!(normalize_arch("i386"), "x86");
        assert_eq!(normalize_arch("x86"), "x86");
        assert_eq!(normalize_arch("x86_64"), "x86_64");
        assert_eq!(normalize_arch("aarch64"), "aarch64");
    }

    #[test]
    fn admission_rule() {
        assert!(admits("x86_64", "any"));
        assert!(admits("x86_64", "x86_64"));
        assert!(admits("x86_64", "x86"));
        assert!(admits("x86", "x86"));
        assert!(!admits("x86", "x86_64"));
        assert!(!admits("aarch64", "x86"));
        assert!(admits("aarch64", "any"));
    }

    #[test]
    fn parses_three_column_rows() {
        let rows = parse_rows(
            "http://example.org/a.config,any,glibc\n\
             http://example.org/b.config , x86_64 , uclibc \n\
             \n",
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].url, "http://example.org/a.config");
        assert_eq!(rows[1].host_arch, "x86_64");
        assert_eq!(rows[1].libc, "uclibc");
    }

    #[test]
    fn rejects_malformed_rows() {
        assert!(parse_rows("http://example.org/a.config,any\n").is_err());
        assert!(parse_rows("one,two,three,four\n").is_err());
    }

    #[test]
    fn pick_is_uniform_over_entries() {
        let entries = (0..4)
            .map(|i| ToolchainConfig {
                url: format!("http://example.org/{i}.config"),
                host_arch: "any".to_string(),
                libc: "glibc".to_string(),
                contents: ConfigLines::default(),
            })
            .collect();
        let catalog = ToolchainCatalog::from_entries(entries);

        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..100 {
            seen.insert(catalog.pick(&mut rng).unwrap().url.clone());
        }
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn pick_from_empty_catalogue_is_an_error() {
        let catalog = ToolchainCatalog::from_entries(Vec::new());
        let mut rng = StdRng::seed_from_u64(0);
        assert!(catalog.pick(&mut rng).is_err());
    }
}
