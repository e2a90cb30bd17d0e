//! Device state snapshots: a fixed diagnostic battery and the aggregate
//! metrics derived from it.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::errors::UpgradeError;
use crate::telemetry::extract::{first_string, sum_values};
use crate::transport::Transport;

/// Expected output shape of a diagnostic command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputShape {
    /// Parsed structured output
    Structured,

    /// Raw text output
    Text,
}

/// A named diagnostic command. The catalog is immutable; results live in the
/// snapshot that captured them.
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub name: &'static str,
    pub command: &'static str,
    pub shape: OutputShape,
}

/// The snapshot battery. Every capture runs all seven.
pub const SNAPSHOT_BATTERY: [CommandSpec; 7] = [
    CommandSpec {
        name: "version_summary",
        command: "show version",
        shape: OutputShape::Structured,
    },
    CommandSpec {
        name: "environment_power",
        command: "show environment power",
        shape: OutputShape::Structured,
    },
    CommandSpec {
        name: "environment_cooling",
        command: "show environment cooling",
        shape: OutputShape::Structured,
    },
    CommandSpec {
        name: "route_summary",
        command: "show ip route summary",
        shape: OutputShape::Structured,
    },
    CommandSpec {
        name: "redundancy_summary",
        command: "show mlag interfaces",
        shape: OutputShape::Structured,
    },
    CommandSpec {
        name: "spanning_tree_status",
        command: "show spanning-tree",
        shape: OutputShape::Text,
    },
    CommandSpec {
        name: "interfaces_status",
        command: "show interfaces status connected",
        shape: OutputShape::Structured,
    },
];

/// Captured output of one battery command, immutable once stored.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandResult {
    pub value: Value,
    pub ok: bool,
}

/// Operational state of one device at one instant.
///
/// Construction either captures the whole battery and derives every metric,
/// or fails; a partially populated snapshot is never observable.
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    results: HashMap<&'static str, CommandResult>,

    /// Sum of every `memFree` counter, in kilobytes
    pub free_memory_kb: u64,

    /// Hardware model
    pub model_name: String,

    /// Firmware version currently running
    pub running_version: String,

    /// Sum of every `totalRoutes` counter across VRFs
    pub total_routes: u64,
}

impl StateSnapshot {
    /// Run the full battery through `transport` and derive the aggregate
    /// metrics. Fails fast on the first transport error.
    pub async fn capture(transport: &dyn Transport) -> Result<Self, UpgradeError> {
        let mut results = HashMap::with_capacity(SNAPSHOT_BATTERY.len());

        for spec in &SNAPSHOT_BATTERY {
            let value = match spec.shape {
                OutputShape::Structured => transport.run_command_structured(spec.command).await?,
                OutputShape::Text => Value::String(transport.run_command(spec.command).await?),
            };
            debug!(name = spec.name, "captured diagnostic output");
            results.insert(spec.name, CommandResult { value, ok: true });
        }

        let version_summary = &results["version_summary"].value;
        let route_summary = &results["route_summary"].value;

        let free_memory_kb = sum_values(version_summary, "memFree");
        let model_name = first_string(version_summary, "modelName")
            .ok_or_else(|| UpgradeError::SnapshotIncomplete("modelName not found".into()))?;
        let running_version = first_string(version_summary, "version")
            .ok_or_else(|| UpgradeError::SnapshotIncomplete("version not found".into()))?;
        let total_routes = sum_values(route_summary, "totalRoutes");

        Ok(Self {
            results,
            free_memory_kb,
            model_name,
            running_version,
            total_routes,
        })
    }

    /// Captured result for a battery command name.
    pub fn result(&self, name: &str) -> Option<&CommandResult> {
        self.results.get(name)
    }

    /// Verify the firmware image fits in the device file system.
    ///
    /// The device reports `memFree` in kilobytes; the image size arrives in
    /// bytes and is converted before the comparison. Must run before any
    /// transfer is attempted.
    pub fn check_flash_memory(&self, image_size_bytes: u64) -> Result<(), UpgradeError> {
        let image_kb = image_size_bytes / 1000;
        if self.free_memory_kb <= image_kb {
            return Err(UpgradeError::InsufficientStorage {
                free_kb: self.free_memory_kb,
                image_kb,
            });
        }
        Ok(())
    }
}
