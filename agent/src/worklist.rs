//! Worklist document: which devices to upgrade and with what image.

use std::path::Path;

use serde::Deserialize;

use crate::errors::UpgradeError;

/// Parsed worklist file.
#[derive(Debug, Clone, Deserialize)]
pub struct Worklist {
    /// Management addresses of the devices to upgrade, in run order
    pub devices: Vec<String>,

    /// Target firmware image file name
    pub image: String,

    /// Object-store base URL the image is fetched from when absent locally
    #[serde(default)]
    pub image_source_url: Option<String>,

    /// Expected SHA-256 digest of the image
    #[serde(default)]
    pub image_sha256: Option<String>,
}

impl Worklist {
    /// Load and validate a worklist from a YAML file.
    pub async fn load(path: &Path) -> Result<Self, UpgradeError> {
        let raw = tokio::fs::read_to_string(path).await?;
        let worklist: Worklist = serde_yaml::from_str(&raw)?;
        worklist.validate()?;
        Ok(worklist)
    }

    fn validate(&self) -> Result<(), UpgradeError> {
        if self.devices.is_empty() {
            return Err(UpgradeError::Config("worklist names no devices".into()));
        }
        if self.image.trim().is_empty() {
            return Err(UpgradeError::Config("worklist names no image".into()));
        }
        Ok(())
    }
}
