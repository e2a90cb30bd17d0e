//! Reload and reachability monitoring

use std::future::Future;
use std::time::Duration;

use tracing::{debug, info};

use crate::errors::UpgradeError;
use crate::transport::probe::{wait_reachable, ProbeOptions};
use crate::transport::{Probe, Transport};

/// Reboot monitoring options
#[derive(Debug, Clone, Copy)]
pub struct RebootOptions {
    /// Sleep before the first probe so the device has actually gone down;
    /// probing too early reads a false-positive "still up"
    pub settle_before_poll: Duration,

    /// Long-budget probing while the device boots
    pub probe: ProbeOptions,
}

impl Default for RebootOptions {
    fn default() -> Self {
        Self {
            settle_before_poll: Duration::from_secs(15),
            probe: ProbeOptions::post_reload(),
        }
    }
}

/// Persist the running configuration, then reload.
///
/// The reload is issued in its non-interactive form so a confirmation prompt
/// can never hang the run. The session usually drops mid-request when the
/// device goes down, so an error from the reload command itself is expected
/// and ignored; the preceding write must succeed explicitly.
pub async fn save_and_reload(transport: &dyn Transport) -> Result<(), UpgradeError> {
    transport.run_command("write memory").await?;
    info!("configuration saved");

    match transport.run_command("reload now").await {
        Ok(_) => {}
        Err(e) => debug!("reload closed the session: {}", e),
    }
    info!("reload issued");
    Ok(())
}

/// Wait for the device to come back after a reload.
pub async fn wait_for_reboot<S, F>(
    probe: &dyn Probe,
    address: &str,
    options: &RebootOptions,
    sleep_fn: S,
) -> Result<(), UpgradeError>
where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    sleep_fn(options.settle_before_poll).await;

    match wait_reachable(probe, address, &options.probe, sleep_fn).await {
        Ok(()) => {
            info!(address, "device answering again");
            Ok(())
        }
        Err(UpgradeError::DeviceUnreachable(budget)) => Err(UpgradeError::RebootTimeout(budget)),
        Err(e) => Err(e),
    }
}
