//! Upgrade orchestrator: drives the per-device state machine across the
//! worklist.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info};

use crate::errors::UpgradeError;
use crate::storage::backup;
use crate::telemetry::snapshot::StateSnapshot;
use crate::transport::probe::{wait_reachable, ProbeOptions};
use crate::transport::{Connector, DeviceTarget, Probe};
use crate::upgrade::bootconfig::{self, BootConfigOptions};
use crate::upgrade::fsm::{UpgradeEvent, UpgradeFsm, UpgradeState};
use crate::upgrade::reload::{self, RebootOptions};
use crate::upgrade::transfer::{self, TransferOptions};
use crate::upgrade::verify::{self, VerifyOptions};

/// Orchestrator configuration. Everything that was a tunable constant lives
/// here and is passed in at construction.
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Pre-flight reachability gate
    pub preflight: ProbeOptions,

    /// Post-reload reboot monitoring
    pub reboot: RebootOptions,

    /// Delay between the device answering probes again and reconnecting
    pub post_reload_settle: Duration,

    /// Image transfer retry policy
    pub transfer: TransferOptions,

    /// Boot configuration retry policy
    pub boot_config: BootConfigOptions,

    /// Post-upgrade verification retry policy
    pub verify: VerifyOptions,

    /// Device file system holding firmware images
    pub file_system: String,

    /// Directory receiving running-config backups
    pub backup_dir: PathBuf,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            preflight: ProbeOptions::preflight(),
            reboot: RebootOptions::default(),
            post_reload_settle: Duration::from_secs(60),
            transfer: TransferOptions::default(),
            boot_config: BootConfigOptions::default(),
            verify: VerifyOptions::default(),
            file_system: "flash".to_string(),
            backup_dir: PathBuf::from("backups"),
        }
    }
}

/// Terminal outcome for one device.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum DeviceOutcome {
    /// Image installed and verified
    Upgraded { verify_attempts: u32 },

    /// Device was already running the target version
    SkippedAlreadyUpgraded,

    /// A gate failed; `last_state` is how far the device got
    Failed {
        last_state: UpgradeState,
        error: String,
    },
}

/// Result of one device run.
#[derive(Debug, Serialize)]
pub struct DeviceReport {
    pub address: String,
    #[serde(flatten)]
    pub outcome: DeviceOutcome,
}

impl DeviceReport {
    pub fn is_ok(&self) -> bool {
        !matches!(self.outcome, DeviceOutcome::Failed { .. })
    }
}

/// Aggregate of a whole worklist run.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub devices: Vec<DeviceReport>,
}

impl RunReport {
    /// True when every device upgraded or was already on the target version.
    pub fn all_ok(&self) -> bool {
        self.devices.iter().all(DeviceReport::is_ok)
    }
}

/// Sequences the upgrade of every device in the worklist, one at a time.
/// One device's failure never aborts the run.
pub struct Orchestrator {
    connector: Arc<dyn Connector>,
    probe: Arc<dyn Probe>,
    options: OrchestratorOptions,
}

impl Orchestrator {
    pub fn new(
        connector: Arc<dyn Connector>,
        probe: Arc<dyn Probe>,
        options: OrchestratorOptions,
    ) -> Self {
        Self {
            connector,
            probe,
            options,
        }
    }

    /// Upgrade every device in order. No step for device N+1 begins until
    /// device N reaches a terminal state.
    pub async fn run(&self, targets: &[DeviceTarget]) -> RunReport {
        let mut devices = Vec::with_capacity(targets.len());
        for target in targets {
            devices.push(self.upgrade_device(target).await);
        }
        RunReport { devices }
    }

    /// Run one device to a terminal state.
    pub async fn upgrade_device(&self, target: &DeviceTarget) -> DeviceReport {
        info!(address = %target.address, "starting device upgrade");
        let mut fsm = UpgradeFsm::new();

        match self.run_device(target, &mut fsm).await {
            Ok(outcome) => {
                info!(address = %target.address, ?outcome, "device run complete");
                DeviceReport {
                    address: target.address.clone(),
                    outcome,
                }
            }
            Err(e) => {
                let last_state = fsm.state().clone();
                let _ = fsm.process(UpgradeEvent::Fail(e.to_string()));
                error!(address = %target.address, ?last_state, "device upgrade failed: {}", e);
                DeviceReport {
                    address: target.address.clone(),
                    outcome: DeviceOutcome::Failed {
                        last_state,
                        error: e.to_string(),
                    },
                }
            }
        }
    }

    async fn run_device(
        &self,
        target: &DeviceTarget,
        fsm: &mut UpgradeFsm,
    ) -> Result<DeviceOutcome, UpgradeError> {
        // Pre-flight gate: a device that does not answer is abandoned before
        // anything touches it.
        wait_reachable(
            self.probe.as_ref(),
            &target.address,
            &self.options.preflight,
            tokio::time::sleep,
        )
        .await?;
        fsm.process(UpgradeEvent::ProbeSucceeded)?;

        let session = self.connector.connect(target).await?;
        fsm.process(UpgradeEvent::SessionOpened)?;

        let pre = StateSnapshot::capture(session.as_ref()).await?;
        fsm.process(UpgradeEvent::PreSnapshotTaken)?;
        info!(
            model = %pre.model_name,
            version = %pre.running_version,
            routes = pre.total_routes,
            free_kb = pre.free_memory_kb,
            "pre-upgrade state captured"
        );

        let image_name = target.image_file_name()?;
        if image_name.contains(&pre.running_version) {
            info!(version = %pre.running_version, "device already running target version");
            fsm.process(UpgradeEvent::AlreadyOnTarget)?;
            return Ok(DeviceOutcome::SkippedAlreadyUpgraded);
        }

        let image_size = tokio::fs::metadata(&target.image_path).await?.len();
        pre.check_flash_memory(image_size)?;
        fsm.process(UpgradeEvent::FlashChecked)?;

        let running_config = session.run_command("show running-config").await?;
        backup::write_backup(&self.options.backup_dir, &target.address, &running_config).await?;
        fsm.process(UpgradeEvent::BackupWritten)?;

        transfer::transfer(
            session.as_ref(),
            image_name,
            &self.options.file_system,
            &self.options.transfer,
            tokio::time::sleep,
        )
        .await?;
        fsm.process(UpgradeEvent::ImageTransferred)?;

        bootconfig::set_boot_image(
            session.as_ref(),
            image_name,
            &self.options.file_system,
            &self.options.boot_config,
            tokio::time::sleep,
        )
        .await?;
        fsm.process(UpgradeEvent::BootImageSet)?;

        reload::save_and_reload(session.as_ref()).await?;
        fsm.process(UpgradeEvent::ReloadIssued)?;
        drop(session);

        reload::wait_for_reboot(
            self.probe.as_ref(),
            &target.address,
            &self.options.reboot,
            tokio::time::sleep,
        )
        .await?;
        fsm.process(UpgradeEvent::DeviceReturned)?;

        info!(
            delay = ?self.options.post_reload_settle,
            "device back, settling before reconnect"
        );
        tokio::time::sleep(self.options.post_reload_settle).await;

        let session = self.connector.connect(target).await?;

        let post = StateSnapshot::capture(session.as_ref()).await?;
        fsm.process(UpgradeEvent::PostSnapshotTaken)?;

        if !image_name.contains(&post.running_version) {
            return Err(UpgradeError::VersionMismatch {
                running: post.running_version,
                image: image_name.to_string(),
            });
        }
        fsm.process(UpgradeEvent::VersionConfirmed)?;

        let result = verify::verify_metrics(
            session.as_ref(),
            &pre,
            &self.options.verify,
            tokio::time::sleep,
        )
        .await?;

        match result.failure {
            None => {
                fsm.process(UpgradeEvent::MetricsConfirmed)?;
                Ok(DeviceOutcome::Upgraded {
                    verify_attempts: result.attempts,
                })
            }
            Some(err) => Err(err),
        }
    }
}
