//! Finite state machine for one device upgrade

use serde::{Deserialize, Serialize};

use crate::errors::UpgradeError;

/// Per-device upgrade state, strictly ordered. Every transition is gated by
/// a check that must pass or the device lands in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeState {
    /// Initial state, nothing attempted
    Idle,

    /// Pre-flight probe answered
    Reachable,

    /// Authenticated, privilege-elevated session is up
    SessionEstablished,

    /// Pre-upgrade snapshot captured
    PreStateCaptured,

    /// Device already runs the target version; terminal short-circuit
    SkippedAlreadyUpgraded,

    /// Image fits in device storage
    FlashOk,

    /// Running configuration backed up
    ConfigBackedUp,

    /// Firmware image present on the device
    Transferred,

    /// Boot variable points at the new image
    BootConfigured,

    /// Reload issued
    Reloaded,

    /// Device answers probes again after reload
    PostReloadReachable,

    /// Post-upgrade snapshot captured
    PostStateCaptured,

    /// Running version matches the target image
    VersionVerified,

    /// All metric checks passed; terminal
    Succeeded,

    /// Terminal failure
    Failed,
}

impl UpgradeState {
    /// No further events are accepted in these states.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UpgradeState::SkippedAlreadyUpgraded | UpgradeState::Succeeded | UpgradeState::Failed
        )
    }
}

/// Gate outcome driving a state transition.
#[derive(Debug, Clone)]
pub enum UpgradeEvent {
    ProbeSucceeded,
    SessionOpened,
    PreSnapshotTaken,
    AlreadyOnTarget,
    FlashChecked,
    BackupWritten,
    ImageTransferred,
    BootImageSet,
    ReloadIssued,
    DeviceReturned,
    PostSnapshotTaken,
    VersionConfirmed,
    MetricsConfirmed,
    Fail(String),
}

/// Upgrade FSM for one device
#[derive(Debug, Clone)]
pub struct UpgradeFsm {
    state: UpgradeState,
    error: Option<String>,
}

impl UpgradeFsm {
    /// Create a new FSM in idle state
    pub fn new() -> Self {
        Self {
            state: UpgradeState::Idle,
            error: None,
        }
    }

    /// Get current state
    pub fn state(&self) -> &UpgradeState {
        &self.state
    }

    /// Get the failure that moved the device to `Failed`, if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: UpgradeEvent) -> Result<(), UpgradeError> {
        // Any gate failure on a live run is accepted and terminal.
        if let UpgradeEvent::Fail(reason) = &event {
            if self.state.is_terminal() {
                return Err(self.invalid(&event));
            }
            self.error = Some(reason.clone());
            self.state = UpgradeState::Failed;
            return Ok(());
        }

        let new_state = match (&self.state, &event) {
            (UpgradeState::Idle, UpgradeEvent::ProbeSucceeded) => UpgradeState::Reachable,
            (UpgradeState::Reachable, UpgradeEvent::SessionOpened) => {
                UpgradeState::SessionEstablished
            }
            (UpgradeState::SessionEstablished, UpgradeEvent::PreSnapshotTaken) => {
                UpgradeState::PreStateCaptured
            }
            (UpgradeState::PreStateCaptured, UpgradeEvent::AlreadyOnTarget) => {
                UpgradeState::SkippedAlreadyUpgraded
            }
            (UpgradeState::PreStateCaptured, UpgradeEvent::FlashChecked) => UpgradeState::FlashOk,
            (UpgradeState::FlashOk, UpgradeEvent::BackupWritten) => UpgradeState::ConfigBackedUp,
            (UpgradeState::ConfigBackedUp, UpgradeEvent::ImageTransferred) => {
                UpgradeState::Transferred
            }
            (UpgradeState::Transferred, UpgradeEvent::BootImageSet) => UpgradeState::BootConfigured,
            (UpgradeState::BootConfigured, UpgradeEvent::ReloadIssued) => UpgradeState::Reloaded,
            (UpgradeState::Reloaded, UpgradeEvent::DeviceReturned) => {
                UpgradeState::PostReloadReachable
            }
            (UpgradeState::PostReloadReachable, UpgradeEvent::PostSnapshotTaken) => {
                UpgradeState::PostStateCaptured
            }
            (UpgradeState::PostStateCaptured, UpgradeEvent::VersionConfirmed) => {
                UpgradeState::VersionVerified
            }
            (UpgradeState::VersionVerified, UpgradeEvent::MetricsConfirmed) => {
                UpgradeState::Succeeded
            }
            (_, event) => return Err(self.invalid(event)),
        };

        self.state = new_state;
        Ok(())
    }

    fn invalid(&self, event: &UpgradeEvent) -> UpgradeError {
        UpgradeError::InvalidTransition(format!("{:?} -> {:?}", self.state, event))
    }
}

impl Default for UpgradeFsm {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_upgrade_path() {
        let mut fsm = UpgradeFsm::new();
        assert_eq!(fsm.state(), &UpgradeState::Idle);

        for event in [
            UpgradeEvent::ProbeSucceeded,
            UpgradeEvent::SessionOpened,
            UpgradeEvent::PreSnapshotTaken,
            UpgradeEvent::FlashChecked,
            UpgradeEvent::BackupWritten,
            UpgradeEvent::ImageTransferred,
            UpgradeEvent::BootImageSet,
            UpgradeEvent::ReloadIssued,
            UpgradeEvent::DeviceReturned,
            UpgradeEvent::PostSnapshotTaken,
            UpgradeEvent::VersionConfirmed,
            UpgradeEvent::MetricsConfirmed,
        ] {
            fsm.process(event).unwrap();
        }

        assert_eq!(fsm.state(), &UpgradeState::Succeeded);
        assert!(fsm.state().is_terminal());
        assert!(fsm.error().is_none());
    }

    #[test]
    fn test_skip_short_circuit_is_terminal() {
        let mut fsm = UpgradeFsm::new();
        fsm.process(UpgradeEvent::ProbeSucceeded).unwrap();
        fsm.process(UpgradeEvent::SessionOpened).unwrap();
        fsm.process(UpgradeEvent::PreSnapshotTaken).unwrap();
        fsm.process(UpgradeEvent::AlreadyOnTarget).unwrap();

        assert_eq!(fsm.state(), &UpgradeState::SkippedAlreadyUpgraded);
        assert!(fsm.state().is_terminal());
        assert!(fsm.process(UpgradeEvent::FlashChecked).is_err());
    }

    #[test]
    fn test_out_of_order_transition_is_rejected() {
        let mut fsm = UpgradeFsm::new();
        fsm.process(UpgradeEvent::ProbeSucceeded).unwrap();
        fsm.process(UpgradeEvent::SessionOpened).unwrap();
        fsm.process(UpgradeEvent::PreSnapshotTaken).unwrap();

        // transfer before the flash check must not be possible
        assert!(fsm.process(UpgradeEvent::ImageTransferred).is_err());
        assert_eq!(fsm.state(), &UpgradeState::PreStateCaptured);
    }

    #[test]
    fn test_gate_failure_is_terminal_with_reason() {
        let mut fsm = UpgradeFsm::new();
        fsm.process(UpgradeEvent::ProbeSucceeded).unwrap();
        fsm.process(UpgradeEvent::Fail("authentication failed".into()))
            .unwrap();

        assert_eq!(fsm.state(), &UpgradeState::Failed);
        assert_eq!(fsm.error(), Some("authentication failed"));
        assert!(fsm.process(UpgradeEvent::SessionOpened).is_err());
        assert!(fsm.process(UpgradeEvent::Fail("again".into())).is_err());
    }
}
