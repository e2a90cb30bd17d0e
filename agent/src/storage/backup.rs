//! Running-configuration backups.
//!
//! One plain-text file per device per run, written before the upgrade
//! touches the device. Secret-bearing lines are masked first so the backups
//! can live in a shared repository.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::info;

use crate::errors::UpgradeError;

/// Configuration directives whose trailing material is a secret. Order
/// matters: the first match in a line wins.
const SECRET_DIRECTIVES: &[&str] = &[
    "password",
    "secret",
    "wpa-psk ascii",
    "key-string",
    "snmp-server community",
    "authentication text",
    "authentication-key",
    "key",
];

/// Mask everything after a secret-bearing directive on each line.
pub fn redact_secrets(config: &str) -> String {
    let mut out = String::with_capacity(config.len());
    for line in config.lines() {
        match SECRET_DIRECTIVES
            .iter()
            .find_map(|d| line.find(d).map(|pos| pos + d.len()))
        {
            Some(end) => {
                out.push_str(&line[..end]);
                out.push_str(" ***********");
            }
            None => out.push_str(line),
        }
        out.push('\n');
    }
    out
}

/// Backup file name for one device on one date.
pub fn backup_file_name(address: &str, date: NaiveDate) -> String {
    format!("{}_{}_running_config.txt", address, date.format("%m-%d-%Y"))
}

/// Write the redacted running configuration into `backup_dir` and return the
/// file path.
pub async fn write_backup(
    backup_dir: &Path,
    address: &str,
    running_config: &str,
) -> Result<PathBuf, UpgradeError> {
    tokio::fs::create_dir_all(backup_dir).await?;

    let file_name = backup_file_name(address, chrono::Local::now().date_naive());
    let path = backup_dir.join(file_name);
    tokio::fs::write(&path, redact_secrets(running_config)).await?;

    info!(path = %path.display(), "running configuration backed up");
    Ok(path)
}
