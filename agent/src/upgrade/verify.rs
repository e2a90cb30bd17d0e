//! Post-upgrade verification

use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use crate::errors::UpgradeError;
use crate::telemetry::snapshot::StateSnapshot;
use crate::transport::Transport;

/// Verification retry options. The generous budget exists because the
/// underlying conditions (route convergence, redundancy re-election) resolve
/// on their own given wall-clock time after a reload.
#[derive(Debug, Clone, Copy)]
pub struct VerifyOptions {
    /// Attempt budget
    pub max_attempts: u32,

    /// Delay between attempts
    pub retry_delay: Duration,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            retry_delay: Duration::from_secs(30),
        }
    }
}

/// Per-metric outcome of the final verification iteration.
#[derive(Debug)]
pub struct VerificationResult {
    /// Attempts consumed, including the passing one
    pub attempts: u32,

    /// Route count did not regress
    pub route_count_ok: bool,

    /// Interface status unchanged between snapshots
    pub interfaces_ok: bool,

    /// Redundancy group status unchanged between snapshots
    pub redundancy_ok: bool,

    /// First failing check of the final iteration, if verification failed
    pub failure: Option<UpgradeError>,
}

impl VerificationResult {
    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }
}

/// Compare post-upgrade state against the pre-upgrade snapshot with bounded
/// retries.
///
/// Every iteration re-captures the ENTIRE post snapshot and re-checks all
/// three gates, including ones that already passed; skipping re-checks would
/// change the observable retry semantics. The checks run in order: route
/// count regression, interface status, redundancy group status. The loop
/// stops as soon as all three pass within the same iteration.
pub async fn verify_metrics<S, F>(
    transport: &dyn Transport,
    pre: &StateSnapshot,
    options: &VerifyOptions,
    sleep_fn: S,
) -> Result<VerificationResult, UpgradeError>
where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    let mut last = None;

    for attempt in 1..=options.max_attempts {
        let post = StateSnapshot::capture(transport).await?;

        let route_count_ok = post.total_routes >= pre.total_routes;
        let interfaces_ok = pre.result("interfaces_status") == post.result("interfaces_status");
        let redundancy_ok = pre.result("redundancy_summary") == post.result("redundancy_summary");

        let failure = if !route_count_ok {
            Some(UpgradeError::RouteRegression {
                pre: pre.total_routes,
                post: post.total_routes,
            })
        } else if !interfaces_ok {
            Some(UpgradeError::InterfaceStateMismatch)
        } else if !redundancy_ok {
            Some(UpgradeError::RedundancyStateMismatch)
        } else {
            None
        };

        match &failure {
            None => {
                info!(attempt, "all post-upgrade checks passed");
                return Ok(VerificationResult {
                    attempts: attempt,
                    route_count_ok,
                    interfaces_ok,
                    redundancy_ok,
                    failure: None,
                });
            }
            Some(reason) => {
                warn!(attempt, "post-upgrade check failed: {}", reason);
            }
        }

        last = Some(VerificationResult {
            attempts: attempt,
            route_count_ok,
            interfaces_ok,
            redundancy_ok,
            failure,
        });

        if attempt < options.max_attempts {
            sleep_fn(options.retry_delay).await;
        }
    }

    last.ok_or_else(|| UpgradeError::Config("verification attempt budget must be at least 1".into()))
}
