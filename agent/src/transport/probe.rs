//! Reachability probing using pure async TCP connects.
//!
//! No external ping binary is required; a TCP connect to the management port
//! within the timeout counts as reachable.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tracing::debug;

use crate::errors::UpgradeError;
use crate::transport::Probe;

/// TCP connect probe against a fixed port.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    /// Port probed on the target (management SSH port by default)
    pub port: u16,

    /// Per-probe connect timeout
    pub timeout: Duration,
}

impl Default for TcpProbe {
    fn default() -> Self {
        Self {
            port: 22,
            timeout: Duration::from_secs(2),
        }
    }
}

#[async_trait]
impl Probe for TcpProbe {
    async fn is_reachable(&self, address: &str) -> bool {
        // Resolution failures read as unreachable, same as a refused connect.
        matches!(
            tokio::time::timeout(self.timeout, TcpStream::connect((address, self.port))).await,
            Ok(Ok(_))
        )
    }
}

/// Bounded-polling options for [`wait_reachable`].
#[derive(Debug, Clone, Copy)]
pub struct ProbeOptions {
    /// Total budget before giving up
    pub max_wait: Duration,

    /// Delay between probes
    pub poll_interval: Duration,
}

impl ProbeOptions {
    /// Pre-flight gate: a few quick probes before touching the device.
    pub fn preflight() -> Self {
        Self {
            max_wait: Duration::from_secs(45),
            poll_interval: Duration::from_secs(15),
        }
    }

    /// Post-reload convergence wait: devices take minutes to reboot.
    pub fn post_reload() -> Self {
        Self {
            max_wait: Duration::from_secs(300),
            poll_interval: Duration::from_secs(15),
        }
    }
}

/// Poll `probe` at a fixed interval until `address` answers or the budget
/// elapses.
///
/// Returns on the first positive probe; `DeviceUnreachable` carries the
/// exhausted budget. The sleep is injected so retry pacing is testable.
pub async fn wait_reachable<S, F>(
    probe: &dyn Probe,
    address: &str,
    options: &ProbeOptions,
    sleep_fn: S,
) -> Result<(), UpgradeError>
where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    let mut waited = Duration::ZERO;

    loop {
        if probe.is_reachable(address).await {
            return Ok(());
        }

        if waited >= options.max_wait {
            return Err(UpgradeError::DeviceUnreachable(options.max_wait));
        }

        debug!(address, ?waited, "no answer yet, probing again");
        sleep_fn(options.poll_interval).await;
        waited += options.poll_interval;
    }
}
