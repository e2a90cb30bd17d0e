//! Command transport: sessions, targets and the trait seams the
//! orchestrator drives.

pub mod eapi;
pub mod probe;

use std::path::PathBuf;

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::Value;

use crate::errors::UpgradeError;

/// Login material for one device. The password never appears in logs or
/// serialized output.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

/// One device in the worklist, fixed for the duration of its run.
#[derive(Debug, Clone)]
pub struct DeviceTarget {
    /// Management address (IP or resolvable name)
    pub address: String,

    /// Login material
    pub credentials: Credentials,

    /// Local path of the firmware image to install
    pub image_path: PathBuf,
}

impl DeviceTarget {
    /// File name component of the image path.
    pub fn image_file_name(&self) -> Result<&str, UpgradeError> {
        self.image_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                UpgradeError::Config(format!("invalid image path: {}", self.image_path.display()))
            })
    }
}

/// Outcome facts of one transfer attempt, inspected independently by the
/// transfer manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOutcome {
    /// The file is present on the device file system
    pub exists: bool,

    /// This attempt moved the bytes
    pub transferred: bool,
}

/// An authenticated, privilege-elevated session with one device.
///
/// Errors surface as values; callers decide retry policy. Implementations
/// must not panic past this boundary.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute a command and return its raw text output.
    async fn run_command(&self, command: &str) -> Result<String, UpgradeError>;

    /// Execute a command and return its parsed structured output.
    async fn run_command_structured(&self, command: &str) -> Result<Value, UpgradeError>;

    /// Place `image_name` onto the device `file_system` and report what is
    /// true afterwards.
    async fn transfer_file(
        &self,
        image_name: &str,
        file_system: &str,
        overwrite: bool,
    ) -> Result<TransferOutcome, UpgradeError>;
}

/// Session factory. Connect failures are classified and fatal for the
/// device: `AuthenticationFailed`, `SessionTimeout` or `Transport`.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, target: &DeviceTarget) -> Result<Box<dyn Transport>, UpgradeError>;
}

/// Single reachability check against an address.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn is_reachable(&self, address: &str) -> bool;
}
