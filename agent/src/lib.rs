//! fleetup - fleet firmware upgrade agent for network switches
//!
//! Walks a worklist of devices and, for each one, probes reachability,
//! snapshots operational state, stages the firmware image, rewrites the boot
//! configuration, reloads the device and verifies it came back healthy.

pub mod app;
pub mod errors;
pub mod logs;
pub mod storage;
pub mod telemetry;
pub mod transport;
pub mod upgrade;
pub mod utils;
pub mod vcs;
pub mod worklist;
