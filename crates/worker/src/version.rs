//! Coordinator protocol version gate

use crate::http;
use autobuild_core::{constants, Error, Result};

/// Check the coordinator's protocol version against our own.
///
/// Returns `Ok(true)` when we may proceed and `Ok(false)` when the remote
/// speaks a newer protocol than this daemon understands.
pub async fn check_version(client: &reqwest::Client, base_url: &str) -> Result<bool> {
    let url = http::join(base_url, constants::VERSION_ENDPOINT)?;
    let body = http::get_text(client, &url).await?;
    let remote = parse_remote_version(&body)
        .ok_or_else(|| Error::network(&url, format!("unparseable version response: {body:?}")))?;
    Ok(remote <= constants::PROTOCOL_VERSION)
}

/// The version endpoint answers with an integer on its first line.
fn parse_remote_version(body: &str) -> Option<u32> {
    body.lines().next()?.trim().parse().ok()
}
