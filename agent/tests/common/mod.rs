//! Shared test doubles: scripted transport, connector and probe.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::{json, Value};

use fleetup::errors::UpgradeError;
use fleetup::transport::{
    Connector, Credentials, DeviceTarget, Probe, TransferOutcome, Transport,
};

/// Scripted response queue: entries answer calls in push order, and once the
/// queue drains the last-seen entry answers every later call.
struct Scripted<T: Clone> {
    queue: VecDeque<T>,
    last: Option<T>,
}

impl<T: Clone> Default for Scripted<T> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            last: None,
        }
    }
}

impl<T: Clone> Scripted<T> {
    fn push(&mut self, entry: T) {
        self.queue.push_back(entry);
    }

    fn pop(&mut self) -> Option<T> {
        match self.queue.pop_front() {
            Some(entry) => {
                self.last = Some(entry.clone());
                Some(entry)
            }
            None => self.last.clone(),
        }
    }
}

#[derive(Default)]
struct Inner {
    structured: HashMap<String, Scripted<Result<Value, String>>>,
    text: HashMap<String, Scripted<Result<String, String>>>,
    transfers: Scripted<Result<TransferOutcome, String>>,
    transfer_calls: u32,
    issued: Vec<String>,
}

/// Scripted in-memory [`Transport`]. Cheap to clone; clones share state, so
/// a reconnect continues consuming the same queues.
#[derive(Clone, Default)]
pub struct MockTransport(Arc<Mutex<Inner>>);

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stub_structured(&self, command: &str, value: Value) {
        let mut inner = self.0.lock().unwrap();
        inner
            .structured
            .entry(command.to_string())
            .or_default()
            .push(Ok(value));
    }

    pub fn stub_structured_error(&self, command: &str, message: &str) {
        let mut inner = self.0.lock().unwrap();
        inner
            .structured
            .entry(command.to_string())
            .or_default()
            .push(Err(message.to_string()));
    }

    pub fn stub_text(&self, command: &str, output: &str) {
        let mut inner = self.0.lock().unwrap();
        inner
            .text
            .entry(command.to_string())
            .or_default()
            .push(Ok(output.to_string()));
    }

    pub fn stub_text_error(&self, command: &str, message: &str) {
        let mut inner = self.0.lock().unwrap();
        inner
            .text
            .entry(command.to_string())
            .or_default()
            .push(Err(message.to_string()));
    }

    pub fn stub_transfer(&self, outcome: TransferOutcome) {
        self.0.lock().unwrap().transfers.push(Ok(outcome));
    }

    pub fn stub_transfer_error(&self, message: &str) {
        self.0
            .lock()
            .unwrap()
            .transfers
            .push(Err(message.to_string()));
    }

    /// Stub the whole diagnostic battery in one call. Values pushed more
    /// than once script successive captures.
    pub fn stub_battery(&self, version: Value, routes: Value, interfaces: Value, redundancy: Value) {
        self.stub_structured("show version", version);
        self.stub_structured("show environment power", json!({"powerSupplies": {}}));
        self.stub_structured("show environment cooling", json!({"fanTraySlots": {}}));
        self.stub_structured("show ip route summary", routes);
        self.stub_structured("show mlag interfaces", redundancy);
        self.stub_text("show spanning-tree", "MST0\n  root bridge\n");
        self.stub_structured("show interfaces status connected", interfaces);
    }

    pub fn transfer_calls(&self) -> u32 {
        self.0.lock().unwrap().transfer_calls
    }

    pub fn issued(&self) -> Vec<String> {
        self.0.lock().unwrap().issued.clone()
    }

    pub fn issued_command(&self, command: &str) -> bool {
        self.0.lock().unwrap().issued.iter().any(|c| c == command)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn run_command(&self, command: &str) -> Result<String, UpgradeError> {
        let mut inner = self.0.lock().unwrap();
        inner.issued.push(command.to_string());
        match inner.text.get_mut(command).and_then(Scripted::pop) {
            Some(Ok(output)) => Ok(output),
            Some(Err(message)) => Err(UpgradeError::Transport(message)),
            // Unscripted plain commands succeed with empty output
            None => Ok(String::new()),
        }
    }

    async fn run_command_structured(&self, command: &str) -> Result<Value, UpgradeError> {
        let mut inner = self.0.lock().unwrap();
        inner.issued.push(command.to_string());
        match inner.structured.get_mut(command).and_then(Scripted::pop) {
            Some(Ok(value)) => Ok(value),
            Some(Err(message)) => Err(UpgradeError::Transport(message)),
            None => Err(UpgradeError::Transport(format!("no stub for {command}"))),
        }
    }

    async fn transfer_file(
        &self,
        image_name: &str,
        _file_system: &str,
        _overwrite: bool,
    ) -> Result<TransferOutcome, UpgradeError> {
        let mut inner = self.0.lock().unwrap();
        inner.transfer_calls += 1;
        inner.issued.push(format!("<transfer {image_name}>"));
        match inner.transfers.pop() {
            Some(Ok(outcome)) => Ok(outcome),
            Some(Err(message)) => Err(UpgradeError::Transport(message)),
            None => Ok(TransferOutcome {
                exists: false,
                transferred: false,
            }),
        }
    }
}

/// Connector handing out clones of one shared [`MockTransport`].
pub struct MockConnector {
    transport: MockTransport,
    connect_errors: Mutex<VecDeque<String>>,
    connects: Mutex<u32>,
}

impl MockConnector {
    pub fn new(transport: MockTransport) -> Self {
        Self {
            transport,
            connect_errors: Mutex::new(VecDeque::new()),
            connects: Mutex::new(0),
        }
    }

    /// Fail the next connect attempt with an authentication error.
    pub fn fail_next_connect(&self, message: &str) {
        self.connect_errors
            .lock()
            .unwrap()
            .push_back(message.to_string());
    }

    pub fn connects(&self) -> u32 {
        *self.connects.lock().unwrap()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, _target: &DeviceTarget) -> Result<Box<dyn Transport>, UpgradeError> {
        *self.connects.lock().unwrap() += 1;
        if let Some(message) = self.connect_errors.lock().unwrap().pop_front() {
            return Err(UpgradeError::AuthenticationFailed(message));
        }
        Ok(Box::new(self.transport.clone()))
    }
}

/// Scripted reachability: per-address answer sequences with repeat-last
/// semantics, defaulting to reachable.
#[derive(Default)]
pub struct MockProbe {
    sequences: Mutex<HashMap<String, Scripted<bool>>>,
}

impl MockProbe {
    pub fn always_up() -> Self {
        Self::default()
    }

    pub fn script(&self, address: &str, answers: &[bool]) {
        let mut scripted = Scripted::default();
        for answer in answers {
            scripted.push(*answer);
        }
        self.sequences
            .lock()
            .unwrap()
            .insert(address.to_string(), scripted);
    }
}

#[async_trait]
impl Probe for MockProbe {
    async fn is_reachable(&self, address: &str) -> bool {
        let mut sequences = self.sequences.lock().unwrap();
        sequences
            .get_mut(address)
            .and_then(Scripted::pop)
            .unwrap_or(true)
    }
}

/// Structured version summary with the fields the snapshot derives from.
pub fn version_summary(version: &str, mem_free_kb: u64) -> Value {
    json!({
        "modelName": "DCS-7050SX-64",
        "internalVersion": format!("{version}-2GB"),
        "version": version,
        "memTotal": 8_002_848u64,
        "memFree": mem_free_kb,
    })
}

/// Structured route summary carrying a per-VRF total.
pub fn route_summary(total_routes: u64) -> Value {
    json!({"vrfs": {"default": {"totalRoutes": total_routes, "maskLen": {"24": 12}}}})
}

pub fn interfaces_status(state: &str) -> Value {
    json!({"interfaceStatuses": {
        "Ethernet1": {"linkStatus": state, "bandwidth": 10_000_000_000u64},
        "Ethernet2": {"linkStatus": state, "bandwidth": 10_000_000_000u64},
    }})
}

pub fn redundancy_summary(state: &str) -> Value {
    json!({"interfaces": {"Port-Channel10": {"status": state, "localInterfaceStatus": state}}})
}

/// Write a throwaway firmware image of `size` bytes and return its path.
pub fn write_temp_image(name: &str, size: usize) -> PathBuf {
    // Keep the image's own file name intact (callers stub boot paths against
    // it) while still namespacing the scratch files under a test directory.
    let dir = std::env::temp_dir().join("fleetup-test-images");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, vec![0u8; size]).unwrap();
    path
}

pub fn target(address: &str, image_path: PathBuf) -> DeviceTarget {
    DeviceTarget {
        address: address.to_string(),
        credentials: Credentials {
            username: "admin".to_string(),
            password: SecretString::from("hunter2".to_string()),
        },
        image_path,
    }
}
