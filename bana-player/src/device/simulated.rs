//! Simulated audio backend
//!
//! Advances a virtual playhead on the tokio clock instead of producing
//! sound. Used by the demo binary, and handy for exercising the controller
//! with paused tokio time.

use super::{AudioBackend, AudioDevice, DeviceSignalSender};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

/// Backend producing [`SimulatedDevice`]s
#[derive(Debug, Clone)]
pub struct SimulatedBackend {
    duration_ms: u64,
    prepare_delay: Duration,
}

impl SimulatedBackend {
    /// Every bound source reports `duration_ms`
    pub fn new(duration_ms: u64) -> Self {
        Self {
            duration_ms,
            prepare_delay: Duration::from_millis(50),
        }
    }

    /// Simulated preparation latency before the ready signal
    pub fn with_prepare_delay(mut self, delay: Duration) -> Self {
        self.prepare_delay = delay;
        self
    }
}

#[async_trait]
impl AudioBackend for SimulatedBackend {
    async fn bind(
        &self,
        source_ref: &str,
        signals: DeviceSignalSender,
    ) -> Result<Box<dyn AudioDevice>> {
        if source_ref.trim().is_empty() {
            return Err(Error::DeviceAcquisition("empty source reference".to_string()));
        }

        tokio::time::sleep(self.prepare_delay).await;

        let duration_ms = self.duration_ms;
        debug!(source_ref, duration_ms, "Simulated device bound");

        let device = SimulatedDevice {
            duration_ms,
            base_position_ms: 0,
            started_at: None,
            completion: None,
            signals,
        };
        device.signals.ready();
        Ok(Box::new(device))
    }
}

/// Virtual device: a playhead plus a completion timer
#[derive(Debug)]
pub struct SimulatedDevice {
    duration_ms: u64,
    /// Playhead at the last start/pause/seek
    base_position_ms: u64,
    /// Set while running
    started_at: Option<Instant>,
    completion: Option<JoinHandle<()>>,
    signals: DeviceSignalSender,
}

impl SimulatedDevice {
    fn current_position(&self) -> u64 {
        let elapsed = self
            .started_at
            .map(|at| at.elapsed().as_millis() as u64)
            .unwrap_or(0);
        (self.base_position_ms + elapsed).min(self.duration_ms)
    }

    fn cancel_completion(&mut self) {
        if let Some(handle) = self.completion.take() {
            handle.abort();
        }
    }

    fn schedule_completion(&mut self) -> Result<()> {
        self.cancel_completion();
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::DeviceRuntime(format!("no runtime for playhead timer: {}", e)))?;

        let remaining = Duration::from_millis(self.duration_ms.saturating_sub(self.base_position_ms));
        let signals = self.signals.clone();
        self.completion = Some(runtime.spawn(async move {
            tokio::time::sleep(remaining).await;
            signals.completed();
        }));
        Ok(())
    }
}

impl AudioDevice for SimulatedDevice {
    fn start(&mut self) -> Result<()> {
        if self.started_at.is_some() {
            return Ok(());
        }
        self.started_at = Some(Instant::now());
        self.schedule_completion()
    }

    fn pause(&mut self) -> Result<()> {
        self.base_position_ms = self.current_position();
        self.started_at = None;
        self.cancel_completion();
        Ok(())
    }

    fn seek(&mut self, position_ms: u64) -> Result<()> {
        self.base_position_ms = position_ms.min(self.duration_ms);
        if self.started_at.is_some() {
            self.started_at = Some(Instant::now());
            self.schedule_completion()?;
        }
        Ok(())
    }

    fn position(&self) -> Result<u64> {
        Ok(self.current_position())
    }

    fn duration(&self) -> Result<u64> {
        Ok(self.duration_ms)
    }

    fn release(mut self: Box<Self>) -> Result<()> {
        self.cancel_completion();
        Ok(())
    }
}

impl Drop for SimulatedDevice {
    fn drop(&mut self) {
        self.cancel_completion();
    }
}
