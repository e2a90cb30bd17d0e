//! Version-control push of captured configuration backups

use std::path::Path;

use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::UpgradeError;

/// Commit everything under `repo_dir` and push to the default remote.
///
/// A commit with nothing new to record is not an error; a push failure is,
/// and callers downgrade it to a warning so the local backups survive an
/// unreachable remote.
pub async fn commit_and_push(repo_dir: &Path, message: &str) -> Result<(), UpgradeError> {
    let add = Command::new("git")
        .current_dir(repo_dir)
        .args(["add", "-A"])
        .status()
        .await
        .map_err(|e| UpgradeError::Vcs(format!("failed to run git add: {}", e)))?;
    if !add.success() {
        return Err(UpgradeError::Vcs("git add failed".to_string()));
    }

    let commit = Command::new("git")
        .current_dir(repo_dir)
        .args(["commit", "-m", message])
        .status()
        .await
        .map_err(|e| UpgradeError::Vcs(format!("failed to run git commit: {}", e)))?;
    if !commit.success() {
        debug!("nothing to commit");
        return Ok(());
    }

    let push = Command::new("git")
        .current_dir(repo_dir)
        .args(["push"])
        .status()
        .await
        .map_err(|e| UpgradeError::Vcs(format!("failed to run git push: {}", e)))?;
    if !push.success() {
        return Err(UpgradeError::Vcs(
            "git push failed, backups remain local".to_string(),
        ));
    }

    info!("backups committed and pushed");
    Ok(())
}
