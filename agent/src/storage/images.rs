//! Firmware image staging.
//!
//! The image is expected next to the agent; when absent it is fetched from
//! the configured object-store URL, optionally verified against a SHA-256
//! digest, and cached for subsequent runs.

use std::path::{Path, PathBuf};

use reqwest::StatusCode;
use tracing::info;

use crate::errors::UpgradeError;
use crate::utils::sha256_hash;

/// Ensure `image_name` exists under `image_dir`, fetching it from
/// `source_url` when missing. Returns the local path.
pub async fn ensure_local_image(
    client: &reqwest::Client,
    image_dir: &Path,
    image_name: &str,
    source_url: Option<&str>,
    expected_sha256: Option<&str>,
) -> Result<PathBuf, UpgradeError> {
    let local_path = image_dir.join(image_name);
    if tokio::fs::try_exists(&local_path).await? {
        info!(path = %local_path.display(), "image present locally");
        return Ok(local_path);
    }

    let base = source_url.ok_or_else(|| {
        UpgradeError::ImageFetch(format!(
            "{} not found locally and no image source URL configured",
            image_name
        ))
    })?;

    let url = format!("{}/{}", base.trim_end_matches('/'), image_name);
    info!(%url, "fetching firmware image");

    let response = client.get(&url).send().await?;
    match response.status() {
        StatusCode::NOT_FOUND => {
            return Err(UpgradeError::ImageFetch(format!(
                "{} not found at {}",
                image_name, base
            )));
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            return Err(UpgradeError::ImageFetch(format!(
                "invalid credentials for {}",
                base
            )));
        }
        status if !status.is_success() => {
            return Err(UpgradeError::ImageFetch(format!("{}: {}", url, status)));
        }
        _ => {}
    }

    let bytes = response.bytes().await?;

    if let Some(expected) = expected_sha256 {
        let actual = sha256_hash(&bytes);
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(UpgradeError::ImageFetch(format!(
                "digest mismatch for {}: expected {}, got {}",
                image_name, expected, actual
            )));
        }
    }

    tokio::fs::create_dir_all(image_dir).await?;
    tokio::fs::write(&local_path, &bytes).await?;
    info!(path = %local_path.display(), size = bytes.len(), "image downloaded");

    Ok(local_path)
}
