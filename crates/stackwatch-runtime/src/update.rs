//! Release check against the published version file.

use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Where the published version string lives.
const VERSION_URL: &str = "https://raw.githubusercontent.com/stackwatch/stackwatch/main/version";
/// Where to send people when an update exists.
pub const DOWNLOAD_URL: &str = "https://github.com/stackwatch/stackwatch/releases";

pub const DEFAULT_UPDATE_TIMEOUT_SECS: u64 = 10;

/// Compare dotted decimal versions, like "1.0.3". The shorter side is
/// zero-padded and the first differing component decides. Unparseable
/// input reads as up to date.
fn is_outdated(local: &str, remote: &str) -> bool {
    let parse = |s: &str| -> Option<Vec<u64>> {
        s.trim()
            .split('.')
            .map(|part| part.parse::<u64>().ok())
            .collect()
    };
    let (Some(mut local), Some(mut remote)) = (parse(local), parse(remote)) else {
        return false;
    };

    let len = local.len().max(remote.len());
    local.resize(len, 0);
    remote.resize(len, 0);

    for (l, r) in local.iter().zip(remote.iter()) {
        if r > l {
            return true;
        }
        if r < l {
            return false;
        }
    }
    false
}

async fn fetch_remote_version(timeout_secs: u64) -> Option<String> {
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            warn!("release check client: {e}");
            return None;
        }
    };

    let response = match client.get(VERSION_URL).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!("release check request failed: {e}");
            return None;
        }
    };
    if !response.status().is_success() {
        warn!(status = %response.status(), "release check got a non-success status");
        return None;
    }

    match response.text().await {
        Ok(text) => Some(text),
        Err(e) => {
            warn!("release check body: {e}");
            None
        }
    }
}

/// Check for a newer release in the background; the answer comes back
/// through the receiver. Every failure path resolves to `false`.
pub fn spawn_update_check(timeout_secs: u64) -> oneshot::Receiver<bool> {
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let local = env!("CARGO_PKG_VERSION");
        let outdated = match fetch_remote_version(timeout_secs).await {
            Some(remote) => {
                let outdated = is_outdated(local, &remote);
                debug!(local, remote = remote.trim(), outdated, "release check finished");
                outdated
            }
            None => false,
        };
        if tx.send(outdated).is_err() {
            debug!("release check receiver dropped");
        }
    });
    rx
}
