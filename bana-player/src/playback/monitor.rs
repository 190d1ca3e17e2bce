//! Progress broadcaster
//!
//! While a track is playing, a ticker task posts [`Command::Tick`] to the
//! controller mailbox every `progress_interval`. The controller answers each
//! tick by polling the device through [`poll_progress`], so the device is
//! never touched outside the controller task.
//!
//! Each broadcaster run carries an epoch. Ticks already queued when a run is
//! stopped carry an old epoch and are ignored by the controller.

use crate::device::AudioDevice;
use crate::error::Result;
use crate::playback::engine::Command;
use bana_common::events::ProgressSnapshot;
use std::time::Duration;
use tokio::sync::mpsc::WeakUnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, trace};

/// Handle to one running ticker task
#[derive(Debug)]
pub(crate) struct ProgressBroadcaster {
    epoch: u64,
    task: JoinHandle<()>,
}

impl ProgressBroadcaster {
    /// Start ticking; first tick arrives one `period` from now
    pub(crate) fn spawn(
        epoch: u64,
        period: Duration,
        mailbox: WeakUnboundedSender<Command>,
    ) -> Self {
        let task = tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval() completes its first tick immediately
            interval.tick().await;

            debug!(epoch, period_ms = period.as_millis() as u64, "Progress broadcaster started");

            loop {
                interval.tick().await;

                let Some(tx) = mailbox.upgrade() else {
                    break;
                };
                if tx.send(Command::Tick { epoch }).is_err() {
                    break;
                }
                trace!(epoch, "Progress tick posted");
            }

            debug!(epoch, "Progress broadcaster exited");
        });

        Self { epoch, task }
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    pub(crate) fn stop(self) {
        self.task.abort();
    }
}

impl Drop for ProgressBroadcaster {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Read position and duration from the device
///
/// A device that has not reported a duration yet (0) keeps the last cached
/// value. Position is clamped to a known duration.
pub(crate) fn poll_progress(
    device: &dyn AudioDevice,
    cached_duration_ms: u64,
) -> Result<ProgressSnapshot> {
    let position_ms = device.position()?;
    let duration_ms = match device.duration()? {
        0 => cached_duration_ms,
        reported => reported,
    };
    Ok(ProgressSnapshot::new(position_ms, duration_ms))
}
