//! Result submission
//!
//! With coordinator credentials the tarball is uploaded as a multipart
//! POST; a failed upload is logged and dropped, never retried. Without
//! credentials the tarball is kept in the working directory under a
//! content-addressed name.

use crate::http;
use crate::journal::Journal;
use autobuild_config::Settings;
use autobuild_core::{constants, Error, Result};
use reqwest::header::EXPECT;
use reqwest::multipart::{Form, Part};
use sha1::{Digest, Sha1};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upload timeout; tarballs of large builds take a while on slow links.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(3600);

/// Hand the finished tarball off: upload when credentials are configured,
/// keep it locally otherwise. Upload failures never fail the cycle.
pub async fn submit_results(
    client: &reqwest::Client,
    settings: &Settings,
    instance: usize,
    work_dir: &Path,
    tarball: &Path,
    journal: &Journal,
) -> Result<()> {
    if settings.upload_enabled() {
        upload(client, settings, tarball, journal).await;
        Ok(())
    } else {
        let kept = keep_local(work_dir, instance, tarball)?;
        journal.log(&format!("results saved as {}", kept.display()));
        Ok(())
    }
}

async fn upload(
    client: &reqwest::Client,
    settings: &Settings,
    tarball: &Path,
    journal: &Journal,
) {
    let result = try_upload(client, settings, tarball).await;
    match result {
        Ok(()) => journal.log("results uploaded to the coordinator"),
        Err(e) => journal.log(&format!("upload failed: {e}")),
    }
}

async fn try_upload(
    client: &reqwest::Client,
    settings: &Settings,
    tarball: &Path,
) -> Result<()> {
    let url = http::join(&settings.http_url, constants::SUBMIT_ENDPOINT)?;
    let bytes = tokio::fs::read(tarball)
        .await
        .map_err(|e| Error::file_system(tarball, "read tarball", e))?;

    let form = Form::new()
        .part(
            "uploadedfile",
            Part::bytes(bytes).file_name("results.tar.bz2"),
        )
        .text("uploadsubmit", "1");

    // Some coordinator frontends mishandle 100-continue; force the
    // Expect header empty.
    let response = client
        .post(&url)
        .basic_auth(
            settings.http_login.as_deref().unwrap_or_default(),
            settings.http_password.as_deref(),
        )
        .header(EXPECT, "")
        .multipart(form)
        .timeout(UPLOAD_TIMEOUT)
        .send()
        .await
        .map_err(|e| Error::network(&url, e.to_string()))?;

    if !response.status().is_success() {
        return Err(Error::network(
            &url,
            format!("unexpected status {}", response.status()),
        ));
    }
    Ok(())
}

/// Rename the tarball into the working directory as
/// `instance-<i>-<sha1-of-bytes>.tar.bz2`.
fn keep_local(work_dir: &Path, instance: usize, tarball: &Path) -> Result<PathBuf> {
    let bytes =
        std::fs::read(tarball).map_err(|e| Error::file_system(tarball, "read tarball", e))?;
    let dest = work_dir.join(format!("instance-{instance}-{}.tar.bz2", sha1_hex(&bytes)));
    std::fs::rename(tarball, &dest)
        .map_err(|e| Error::file_system(&dest, "rename tarball", e))?;
    Ok(dest)
}

/// Lowercase hex SHA-1 digest.
pub fn sha1_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
