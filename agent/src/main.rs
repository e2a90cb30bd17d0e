//! fleetup - Entry Point
//!
//! Fleet firmware upgrade agent for network switches. Reads a worklist of
//! devices, upgrades them one at a time and exits non-zero if any device
//! fails.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use fleetup::app::options::AppOptions;
use fleetup::app::run::run;
use fleetup::logs::{init_logging, LogOptions};
use fleetup::transport::Credentials;
use fleetup::utils::version_info;
use fleetup::worklist::Worklist;

use secrecy::SecretString;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(version) => println!("{}", version),
            Err(e) => eprintln!("{e}"),
        }
        return ExitCode::SUCCESS;
    }

    // Initialize logging
    let log_options = LogOptions {
        log_level: cli_args
            .get("log-level")
            .and_then(|l| l.parse().ok())
            .unwrap_or_default(),
        ..Default::default()
    };
    if let Err(e) = init_logging(log_options) {
        println!("Failed to initialize logging: {e}");
    }

    match setup_and_run(&cli_args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn setup_and_run(cli_args: &HashMap<String, String>) -> anyhow::Result<bool> {
    let worklist_path = cli_args
        .get("worklist")
        .map(PathBuf::from)
        .context("missing required argument: --worklist=<file.yaml>")?;

    let worklist = Worklist::load(&worklist_path)
        .await
        .with_context(|| format!("unable to load worklist {}", worklist_path.display()))?;

    let credentials = credentials_from(cli_args)?;

    let mut options = AppOptions::default();
    if let Some(dir) = cli_args.get("backup-dir") {
        options.orchestrator.backup_dir = PathBuf::from(dir);
    }
    if let Some(dir) = cli_args.get("image-dir") {
        options.image_dir = PathBuf::from(dir);
    }
    options.push_backups = cli_args.contains_key("push-backups");

    let report = run(&worklist, credentials, options).await?;

    for device in &report.devices {
        info!(address = %device.address, outcome = ?device.outcome, "device result");
    }

    Ok(report.all_ok())
}

/// Credentials come from flags or, preferably, the environment so the
/// password stays out of shell history and process listings.
fn credentials_from(cli_args: &HashMap<String, String>) -> anyhow::Result<Credentials> {
    let username = cli_args
        .get("username")
        .cloned()
        .or_else(|| env::var("FLEETUP_USERNAME").ok())
        .context("no username: pass --username= or set FLEETUP_USERNAME")?;

    let password = cli_args
        .get("password")
        .cloned()
        .or_else(|| env::var("FLEETUP_PASSWORD").ok())
        .context("no password: pass --password= or set FLEETUP_PASSWORD")?;

    Ok(Credentials {
        username,
        password: SecretString::from(password),
    })
}
