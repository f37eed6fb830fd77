//! HTTP utilities for downloading runtime payloads.

use crate::bundler::error::{Error, Result};
use bytes::Bytes;
use std::time::Duration;

/// Downloads `url` and returns the body.
///
/// Connection failures and non-2xx statuses are [`Error::Network`]; running
/// past `timeout` is [`Error::Timeout`].
pub async fn download(url: &str, timeout: Duration) -> Result<Bytes> {
    log::info!("Downloading {}", url);

    let fetch = async {
        let response = reqwest::get(url).await.map_err(|e| Error::Network {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network {
                url: url.to_string(),
                reason: format!("server answered {status}"),
            });
        }

        response.bytes().await.map_err(|e| Error::Network {
            url: url.to_string(),
            reason: format!("failed to read response: {e}"),
        })
    };

    let bytes = tokio::time::timeout(timeout, fetch)
        .await
        .map_err(|_elapsed| Error::Timeout {
            operation: format!("download {url}"),
            timeout,
        })??;

    log::debug!("Downloaded {} bytes from {}", bytes.len(), url);
    Ok(bytes)
}
