//! Input resolution: turn a user-supplied path or URL into raw image bytes.
//!
//! The normaliser works on an in-memory buffer, so nothing here needs to
//! outlive the call. URL inputs are read fully into memory; local files are
//! read with `tokio::fs`.
//! No decoding happens here; an unreadable image is reported by the
//! normaliser as [`BuildPlanError::Decode`].

use crate::error::BuildPlanError;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Raw image bytes plus a description of where they came from.
#[derive(Debug, Clone)]
pub struct RawImage {
    pub bytes: Vec<u8>,
    pub source: String,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to raw image bytes.
///
/// If the input is a URL, download it; otherwise read the local file.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<RawImage, BuildPlanError> {
    let bytes = if is_url(input) {
        download_url(input, timeout_secs).await?
    } else {
        read_local(input).await?
    };
    Ok(RawImage {
        bytes,
        source: input.to_string(),
    })
}

async fn read_local(path_str: &str) -> Result<Vec<u8>, BuildPlanError> {
    let path = PathBuf::from(path_str);

    let meta = match tokio::fs::metadata(&path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(BuildPlanError::InputNotFound { path });
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(BuildPlanError::PermissionDenied { path });
        }
        Err(e) => {
            return Err(BuildPlanError::InputReadFailed {
                path,
                reason: e.to_string(),
            });
        }
    };
    if meta.is_dir() {
        return Err(BuildPlanError::InputReadFailed {
            path,
            reason: "is a directory".to_string(),
        });
    }

    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            debug!("Read {} bytes from {}", bytes.len(), path.display());
            Ok(bytes)
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(BuildPlanError::PermissionDenied { path })
        }
        Err(e) => Err(BuildPlanError::InputReadFailed {
            path,
            reason: e.to_string(),
        }),
    }
}

/// `0` disables the download timeout, like `api_timeout_secs`.
fn download_timeout(timeout_secs: u64) -> Option<Duration> {
    (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs))
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<Vec<u8>, BuildPlanError> {
    info!("Downloading image from: {}", url);

    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = download_timeout(timeout_secs) {
        builder = builder.timeout(timeout);
    }
    let client = builder
        .build()
        .map_err(|e| BuildPlanError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| BuildPlanError::DownloadFailed {
            url: url.to_string(),
            reason: if e.is_timeout() {
                format!("timed out after {timeout_secs}s")
            } else {
                e.to_string()
            },
        })?;

    if !response.status().is_success() {
        return Err(BuildPlanError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| BuildPlanError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    debug!("Downloaded {} bytes", bytes.len());
    Ok(bytes.to_vec())
}
