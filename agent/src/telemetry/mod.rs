//! Structured telemetry: extraction and aggregation of device state

pub mod extract;
pub mod snapshot;
