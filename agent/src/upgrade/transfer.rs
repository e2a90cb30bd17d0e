//! Firmware transfer manager

use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use crate::errors::UpgradeError;
use crate::transport::Transport;

/// Transfer retry options
#[derive(Debug, Clone, Copy)]
pub struct TransferOptions {
    /// Attempt budget
    pub max_attempts: u32,

    /// Delay between attempts
    pub retry_delay: Duration,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(5),
        }
    }
}

/// Idempotent upload of the firmware image to device storage.
///
/// After each attempt two independent facts are inspected: the file exists
/// on the device, and this attempt moved the bytes. Transferred means done;
/// exists-without-transfer means a pre-existing image and is also done;
/// neither means the attempt failed and the budget shrinks. A transport
/// error during an attempt consumes budget the same way, since the outcome
/// facts could not be established.
pub async fn transfer<S, F>(
    transport: &dyn Transport,
    image_name: &str,
    file_system: &str,
    options: &TransferOptions,
    sleep_fn: S,
) -> Result<(), UpgradeError>
where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    for attempt in 1..=options.max_attempts {
        info!(image_name, attempt, "copying image to device");

        match transport.transfer_file(image_name, file_system, false).await {
            Ok(outcome) if outcome.transferred => {
                info!(image_name, "image copied to device");
                return Ok(());
            }
            Ok(outcome) if outcome.exists => {
                info!(image_name, "image already present on device");
                return Ok(());
            }
            Ok(_) => {
                warn!(image_name, attempt, "image absent after attempt");
            }
            Err(e) => {
                warn!(image_name, attempt, "transfer attempt failed: {}", e);
            }
        }

        if attempt < options.max_attempts {
            sleep_fn(options.retry_delay).await;
        }
    }

    Err(UpgradeError::TransferFailed {
        attempts: options.max_attempts,
    })
}
