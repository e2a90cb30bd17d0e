//! Error types for the fleetup agent

use std::time::Duration;

use thiserror::Error;

/// Main error type for the fleetup agent
#[derive(Error, Debug)]
pub enum UpgradeError {
    #[error("device unreachable: no response within {0:?}")]
    DeviceUnreachable(Duration),

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("session timeout: {0}")]
    SessionTimeout(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("insufficient storage: free {free_kb} kB, image {image_kb} kB")]
    InsufficientStorage { free_kb: u64, image_kb: u64 },

    #[error("image transfer failed after {attempts} attempts")]
    TransferFailed { attempts: u32 },

    #[error("unable to enter configuration mode after {attempts} attempts")]
    ConfigModeUnavailable { attempts: u32 },

    #[error("boot configuration not applied after {attempts} attempts")]
    BootConfigRejected { attempts: u32 },

    #[error("device did not return within {0:?} after reload")]
    RebootTimeout(Duration),

    #[error("running version {running:?} does not match target image {image:?}")]
    VersionMismatch { running: String, image: String },

    #[error("route count regressed: pre {pre}, post {post}")]
    RouteRegression { pre: u64, post: u64 },

    #[error("interface status changed across upgrade")]
    InterfaceStateMismatch,

    #[error("redundancy group status changed across upgrade")]
    RedundancyStateMismatch,

    #[error("snapshot incomplete: {0}")]
    SnapshotIncomplete(String),

    #[error("invalid state transition: {0}")]
    InvalidTransition(String),

    #[error("image fetch failed: {0}")]
    ImageFetch(String),

    #[error("version control error: {0}")]
    Vcs(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
