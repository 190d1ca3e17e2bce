//! Scriptable audio backend
//!
//! Records every bind and every device call. Device signals are never raised
//! automatically: tests fire ready/error/completion by bind index.

use async_trait::async_trait;
use bana_player::device::{AudioBackend, AudioDevice, DeviceSignalSender};
use bana_player::{Error, Result};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Device call, tagged with the source the device was bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCall {
    Start(String),
    Pause(String),
    Seek(String, u64),
    Release(String),
}

struct BindRecord {
    source_ref: String,
    signals: DeviceSignalSender,
}

struct MockState {
    binds: Mutex<Vec<BindRecord>>,
    calls: Mutex<Vec<DeviceCall>>,
    failing_sources: Mutex<HashSet<String>>,
    position_ms: AtomicU64,
    duration_ms: AtomicU64,
    fail_polls: AtomicBool,
    fail_seeks: AtomicBool,
}

#[derive(Clone)]
pub struct MockBackend {
    state: Arc<MockState>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            state: Arc::new(MockState {
                binds: Mutex::new(Vec::new()),
                calls: Mutex::new(Vec::new()),
                failing_sources: Mutex::new(HashSet::new()),
                position_ms: AtomicU64::new(0),
                duration_ms: AtomicU64::new(180_000),
                fail_polls: AtomicBool::new(false),
                fail_seeks: AtomicBool::new(false),
            }),
        }
    }

    /// Binding `source_ref` returns a device acquisition error
    pub fn fail_source(&self, source_ref: &str) {
        self.state
            .failing_sources
            .lock()
            .unwrap()
            .insert(source_ref.to_string());
    }

    pub fn bind_count(&self) -> usize {
        self.state.binds.lock().unwrap().len()
    }

    pub fn bound_sources(&self) -> Vec<String> {
        self.state
            .binds
            .lock()
            .unwrap()
            .iter()
            .map(|b| b.source_ref.clone())
            .collect()
    }

    fn signals(&self, bind_index: usize) -> DeviceSignalSender {
        self.state.binds.lock().unwrap()[bind_index].signals.clone()
    }

    pub fn ready(&self, bind_index: usize) {
        self.signals(bind_index).ready();
    }

    pub fn error(&self, bind_index: usize, message: &str) {
        self.signals(bind_index).error(message);
    }

    pub fn complete(&self, bind_index: usize) {
        self.signals(bind_index).completed();
    }

    pub fn calls(&self) -> Vec<DeviceCall> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, matches: impl Fn(&DeviceCall) -> bool) -> usize {
        self.state.calls.lock().unwrap().iter().filter(|c| matches(c)).count()
    }

    pub fn set_position(&self, position_ms: u64) {
        self.state.position_ms.store(position_ms, Ordering::SeqCst);
    }

    pub fn set_duration(&self, duration_ms: u64) {
        self.state.duration_ms.store(duration_ms, Ordering::SeqCst);
    }

    pub fn set_fail_polls(&self, fail: bool) {
        self.state.fail_polls.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_seeks(&self, fail: bool) {
        self.state.fail_seeks.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl AudioBackend for MockBackend {
    async fn bind(
        &self,
        source_ref: &str,
        signals: DeviceSignalSender,
    ) -> Result<Box<dyn AudioDevice>> {
        self.state.binds.lock().unwrap().push(BindRecord {
            source_ref: source_ref.to_string(),
            signals,
        });

        if self.state.failing_sources.lock().unwrap().contains(source_ref) {
            return Err(Error::DeviceAcquisition(format!("cannot open {}", source_ref)));
        }

        Ok(Box::new(MockDevice {
            source_ref: source_ref.to_string(),
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockDevice {
    source_ref: String,
    state: Arc<MockState>,
}

impl MockDevice {
    fn record(&self, call: DeviceCall) {
        self.state.calls.lock().unwrap().push(call);
    }
}

impl AudioDevice for MockDevice {
    fn start(&mut self) -> Result<()> {
        self.record(DeviceCall::Start(self.source_ref.clone()));
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.record(DeviceCall::Pause(self.source_ref.clone()));
        Ok(())
    }

    fn seek(&mut self, position_ms: u64) -> Result<()> {
        if self.state.fail_seeks.load(Ordering::SeqCst) {
            return Err(Error::DeviceRuntime("seek rejected".to_string()));
        }
        self.record(DeviceCall::Seek(self.source_ref.clone(), position_ms));
        self.state.position_ms.store(position_ms, Ordering::SeqCst);
        Ok(())
    }

    fn position(&self) -> Result<u64> {
        if self.state.fail_polls.load(Ordering::SeqCst) {
            return Err(Error::DeviceRuntime("position unavailable".to_string()));
        }
        Ok(self.state.position_ms.load(Ordering::SeqCst))
    }

    fn duration(&self) -> Result<u64> {
        Ok(self.state.duration_ms.load(Ordering::SeqCst))
    }

    fn release(self: Box<Self>) -> Result<()> {
        self.record(DeviceCall::Release(self.source_ref.clone()));
        Ok(())
    }
}
