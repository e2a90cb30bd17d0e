//! Boot configuration updater

use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use crate::errors::UpgradeError;
use crate::transport::Transport;

/// Boot configuration retry options
#[derive(Debug, Clone, Copy)]
pub struct BootConfigOptions {
    /// Attempt budget for entering configuration mode
    pub max_attempts: u32,

    /// Delay between attempts
    pub retry_delay: Duration,
}

impl Default for BootConfigOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(5),
        }
    }
}

/// Point the boot variable at the new image and confirm the device took it.
///
/// Each attempt enters configuration mode, sets the boot variable, re-reads
/// the boot configuration and requires the new path verbatim before exiting
/// configuration mode. Never entering configuration mode is a session-level
/// problem (`ConfigModeUnavailable`) and is not retried at a higher level; a
/// readback that never shows the new path exhausts the same budget as
/// `BootConfigRejected`.
pub async fn set_boot_image<S, F>(
    transport: &dyn Transport,
    image_file_name: &str,
    file_system: &str,
    options: &BootConfigOptions,
    sleep_fn: S,
) -> Result<(), UpgradeError>
where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    let boot_path = format!("{}:/{}", file_system, image_file_name);
    let mut entered_config_mode = false;

    for attempt in 1..=options.max_attempts {
        if transport.run_command("configure terminal").await.is_err() {
            warn!(attempt, "unable to enter configuration mode");
            if attempt < options.max_attempts {
                sleep_fn(options.retry_delay).await;
            }
            continue;
        }
        entered_config_mode = true;

        info!(%boot_path, "setting boot variable");
        transport
            .run_command(&format!("boot system {}", boot_path))
            .await?;

        let boot_config = transport.run_command("show boot-config").await?;
        if boot_config.contains(&boot_path) {
            transport.run_command("end").await?;
            info!("boot configuration saved");
            return Ok(());
        }

        warn!(attempt, "boot variable not present in readback");
        transport.run_command("end").await?;
        if attempt < options.max_attempts {
            sleep_fn(options.retry_delay).await;
        }
    }

    if entered_config_mode {
        Err(UpgradeError::BootConfigRejected {
            attempts: options.max_attempts,
        })
    } else {
        Err(UpgradeError::ConfigModeUnavailable {
            attempts: options.max_attempts,
        })
    }
}
