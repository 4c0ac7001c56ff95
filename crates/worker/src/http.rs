//! Shared HTTP plumbing for coordinator and toolchain traffic

use autobuild_core::{Error, Result};
use std::time::Duration;
use url::Url;

/// How long a metadata fetch (version, CSV, defconfig) may take. Uploads
/// set their own bound.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the process-wide HTTP client.
pub fn client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("autobuild-run/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::network("http client", e.to_string()))
}

/// GET a URL and return its body as text, failing on non-2xx status.
pub async fn get_text(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .timeout(FETCH_TIMEOUT)
        .send()
        .await
        .map_err(|e| Error::network(url, e.to_string()))?;

    if !response.status().is_success() {
        return Err(Error::network(
            url,
            format!("unexpected status {}", response.status()),
        ));
    }

    response
        .text()
        .await
        .map_err(|e| Error::network(url, e.to_string()))
}

/// Join an endpoint path onto the coordinator base URL.
pub fn join(base: &str, path: &str) -> Result<String> {
    let url = Url::parse(base)
        .and_then(|u| u.join(path))
        .map_err(|e| Error::network(base, format!("invalid URL: {e}")))?;
    Ok(url.to_string())
}
