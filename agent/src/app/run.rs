//! Main application run: stage the image, build the orchestrator, walk the
//! worklist.

use std::sync::Arc;

use tracing::{info, warn};

use crate::app::options::{AppOptions, IMAGE_FETCH_TIMEOUT};
use crate::errors::UpgradeError;
use crate::storage::images;
use crate::transport::eapi::EapiConnector;
use crate::transport::{Credentials, DeviceTarget};
use crate::upgrade::orchestrator::{Orchestrator, RunReport};
use crate::vcs;
use crate::worklist::Worklist;

/// Run the whole worklist and return the per-device report. The caller maps
/// the report onto a process exit code.
pub async fn run(
    worklist: &Worklist,
    credentials: Credentials,
    options: AppOptions,
) -> Result<RunReport, UpgradeError> {
    let client = reqwest::Client::builder()
        .timeout(IMAGE_FETCH_TIMEOUT)
        .build()
        .map_err(|e| UpgradeError::Transport(e.to_string()))?;

    let image_path = images::ensure_local_image(
        &client,
        &options.image_dir,
        &worklist.image,
        worklist.image_source_url.as_deref(),
        worklist.image_sha256.as_deref(),
    )
    .await?;
    info!(path = %image_path.display(), "firmware image staged");

    // The devices pull the image from the same store the agent does.
    let mut eapi = options.eapi.clone();
    if eapi.image_source_url.is_none() {
        eapi.image_source_url = worklist.image_source_url.clone();
    }

    let connector = Arc::new(EapiConnector::new(eapi));
    let probe = Arc::new(options.probe.clone());
    let orchestrator = Orchestrator::new(connector, probe, options.orchestrator.clone());

    let targets: Vec<DeviceTarget> = worklist
        .devices
        .iter()
        .map(|address| DeviceTarget {
            address: address.clone(),
            credentials: credentials.clone(),
            image_path: image_path.clone(),
        })
        .collect();

    info!(devices = targets.len(), image = %worklist.image, "starting worklist run");
    let report = orchestrator.run(&targets).await;

    if options.push_backups {
        let message = format!("config backups for firmware upgrade to {}", worklist.image);
        if let Err(e) = vcs::commit_and_push(&options.orchestrator.backup_dir, &message).await {
            warn!("backups not pushed: {}", e);
        }
    }

    Ok(report)
}
