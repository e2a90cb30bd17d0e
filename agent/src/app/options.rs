//! Application configuration options

use std::path::PathBuf;
use std::time::Duration;

use crate::transport::eapi::EapiOptions;
use crate::transport::probe::TcpProbe;
use crate::upgrade::orchestrator::OrchestratorOptions;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Orchestrator timing and retry policy
    pub orchestrator: OrchestratorOptions,

    /// Management-API session options
    pub eapi: EapiOptions,

    /// Reachability probe configuration
    pub probe: TcpProbe,

    /// Directory holding (or receiving) firmware images
    pub image_dir: PathBuf,

    /// Push the backup directory to its version-control remote after the run
    pub push_backups: bool,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            orchestrator: OrchestratorOptions::default(),
            eapi: EapiOptions::default(),
            probe: TcpProbe::default(),
            image_dir: PathBuf::from("."),
            push_backups: false,
        }
    }
}

/// Timeout applied to the image download
pub const IMAGE_FETCH_TIMEOUT: Duration = Duration::from_secs(600);
