//! HTTP command-API transport.
//!
//! Talks the JSON-RPC `runCmds` dialect switches expose on their management
//! interface. Every batch is prefixed with `enable` so the session runs at
//! privileged level, and image transfer is a device-side `copy` from a
//! staging URL followed by a directory listing to establish the outcome
//! facts.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::errors::UpgradeError;
use crate::transport::{Connector, DeviceTarget, TransferOutcome, Transport};

/// Command-API connection options.
#[derive(Debug, Clone)]
pub struct EapiOptions {
    /// Management API port
    pub port: u16,

    /// Use HTTPS for the management session
    pub use_tls: bool,

    /// Switch management endpoints ship self-signed certificates; allow them
    pub accept_invalid_certs: bool,

    /// Per-request timeout for ordinary commands
    pub request_timeout: Duration,

    /// Timeout for the device-side image copy
    pub transfer_timeout: Duration,

    /// Base URL the device pulls the firmware image from
    pub image_source_url: Option<String>,
}

impl Default for EapiOptions {
    fn default() -> Self {
        Self {
            port: 443,
            use_tls: true,
            accept_invalid_certs: true,
            request_timeout: Duration::from_secs(30),
            transfer_timeout: Duration::from_secs(600),
            image_source_url: None,
        }
    }
}

/// Session factory for [`EapiTransport`].
#[derive(Debug, Clone)]
pub struct EapiConnector {
    options: EapiOptions,
}

impl EapiConnector {
    pub fn new(options: EapiOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Connector for EapiConnector {
    async fn connect(&self, target: &DeviceTarget) -> Result<Box<dyn Transport>, UpgradeError> {
        let client = Client::builder()
            .timeout(self.options.request_timeout)
            .danger_accept_invalid_certs(self.options.accept_invalid_certs)
            .build()
            .map_err(|e| UpgradeError::Transport(e.to_string()))?;

        let scheme = if self.options.use_tls { "https" } else { "http" };
        let endpoint = format!("{}://{}:{}/command-api", scheme, target.address, self.options.port);

        let transport = EapiTransport {
            client,
            endpoint,
            username: target.credentials.username.clone(),
            password: target.credentials.password.clone(),
            options: self.options.clone(),
        };

        // Validate credentials and privilege elevation before handing the
        // session out.
        transport.run_command("show privilege").await?;
        debug!(address = %target.address, "session established");

        Ok(Box::new(transport))
    }
}

/// One authenticated command-API session.
pub struct EapiTransport {
    client: Client,
    endpoint: String,
    username: String,
    password: SecretString,
    options: EapiOptions,
}

impl EapiTransport {
    async fn run_cmds(
        &self,
        cmds: &[&str],
        format: &str,
        timeout: Duration,
    ) -> Result<Vec<Value>, UpgradeError> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": "runCmds",
            "params": {"version": 1, "cmds": cmds, "format": format},
            "id": "fleetup",
        });

        debug!("POST {} {:?}", self.endpoint, cmds);
        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.username, Some(self.password.expose_secret()))
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(UpgradeError::AuthenticationFailed(format!(
                "{} rejected credentials ({})",
                self.endpoint, status
            )));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(UpgradeError::Transport(format!("{}: {}", status, text)));
        }

        let payload: Value = response.json().await.map_err(classify_request_error)?;
        if let Some(error) = payload.get("error") {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("command rejected");
            return Err(UpgradeError::Transport(message.to_string()));
        }

        match payload.get("result") {
            Some(Value::Array(results)) => Ok(results.clone()),
            _ => Err(UpgradeError::Transport("malformed runCmds response".into())),
        }
    }

    async fn file_exists(&self, file_system: &str, image_name: &str) -> Result<bool, UpgradeError> {
        let listing = self.run_command(&format!("dir {}:", file_system)).await?;
        Ok(listing.contains(image_name))
    }
}

#[async_trait]
impl Transport for EapiTransport {
    async fn run_command(&self, command: &str) -> Result<String, UpgradeError> {
        let results = self
            .run_cmds(&["enable", command], "text", self.options.request_timeout)
            .await?;
        let output = results
            .last()
            .and_then(|r| r.get("output"))
            .and_then(|o| o.as_str())
            .ok_or_else(|| UpgradeError::Transport("missing text output".into()))?;
        Ok(output.to_string())
    }

    async fn run_command_structured(&self, command: &str) -> Result<Value, UpgradeError> {
        let mut results = self
            .run_cmds(&["enable", command], "json", self.options.request_timeout)
            .await?;
        results
            .pop()
            .ok_or_else(|| UpgradeError::Transport("missing structured output".into()))
    }

    async fn transfer_file(
        &self,
        image_name: &str,
        file_system: &str,
        overwrite: bool,
    ) -> Result<TransferOutcome, UpgradeError> {
        if !overwrite && self.file_exists(file_system, image_name).await? {
            return Ok(TransferOutcome {
                exists: true,
                transferred: false,
            });
        }

        let source = self.options.image_source_url.as_deref().ok_or_else(|| {
            UpgradeError::Config("no image source URL configured for transfer".into())
        })?;

        let copy = format!(
            "copy {}/{} {}:{}",
            source.trim_end_matches('/'),
            image_name,
            file_system,
            image_name
        );

        let copied = match self
            .run_cmds(&["enable", &copy], "text", self.options.transfer_timeout)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                warn!("image copy attempt failed: {}", e);
                false
            }
        };

        let exists = self.file_exists(file_system, image_name).await?;
        Ok(TransferOutcome {
            exists,
            transferred: copied && exists,
        })
    }
}

/// Classify a request failure into the session error taxonomy.
fn classify_request_error(err: reqwest::Error) -> UpgradeError {
    if err.is_timeout() {
        UpgradeError::SessionTimeout(err.to_string())
    } else {
        UpgradeError::Transport(err.to_string())
    }
}
