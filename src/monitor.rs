//! Progress inferred from the destination side.
//!
//! The copy primitive is silent until it returns, so the monitor looks at what
//! has landed: how many tracked destinations exist and how many bytes are
//! under them. A file that exists but is still being written can make a poll
//! run ahead or behind; the next poll corrects it.

use std::time::Instant;

use tracing::{debug, warn};

use crate::error::Result;
use crate::events::{EventHub, ProgressSnapshot, SessionEvent};
use crate::probe::PathProbe;
use crate::stop::{Schedule, StopSignal};

/// `floor(done * 100 / total)`, capped at 100. An empty transfer is complete.
pub fn percent(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (done as u128 * 100) / total as u128;
    pct.min(100) as u8
}

pub struct ProgressMonitor<'a> {
    probe: &'a dyn PathProbe,
    destinations: &'a [String],
    total_bytes: u64,
    started_at: Instant,
}

impl<'a> ProgressMonitor<'a> {
    pub fn new(
        probe: &'a dyn PathProbe,
        destinations: &'a [String],
        total_bytes: u64,
        started_at: Instant,
    ) -> Self {
        Self {
            probe,
            destinations,
            total_bytes,
            started_at,
        }
    }

    /// One poll of the destinations.
    pub fn sample(&self) -> Result<ProgressSnapshot> {
        let existing = self.probe.count_existing(self.destinations)?;
        let bytes_done = self.probe.total_size(self.destinations)?;
        let percent = percent(bytes_done, self.total_bytes);

        // The newest destination is the one in flight.
        let completed = existing.saturating_sub(1);

        let elapsed = self.started_at.elapsed();
        let secs = elapsed.as_secs_f64();
        let throughput = if secs > 0.0 {
            bytes_done as f64 / secs
        } else {
            0.0
        };

        Ok(ProgressSnapshot {
            completed,
            total_files: self.destinations.len(),
            bytes_done,
            total_bytes: self.total_bytes,
            percent,
            elapsed,
            throughput,
        })
    }

    /// Publish a snapshot every tick until the transfer is at 100% or
    /// `finished` fires. After `finished`, one last snapshot is taken so
    /// subscribers see the final state. Returns that last snapshot.
    pub fn run(
        &self,
        schedule: Schedule,
        finished: &StopSignal,
        hub: &EventHub,
    ) -> Option<ProgressSnapshot> {
        let mut last = None;
        loop {
            let final_pass = finished.is_stopped();
            match self.sample() {
                Ok(snapshot) => {
                    let full = snapshot.percent >= 100;
                    hub.publish(SessionEvent::Progress(snapshot.clone()));
                    last = Some(snapshot);
                    if full {
                        debug!("destinations complete");
                        break;
                    }
                }
                // The executor hits the same link and reports the failure.
                Err(e) => warn!(error = %e, "progress poll failed"),
            }
            if final_pass {
                break;
            }
            // A false tick means `finished` fired: loop once more for the final pass.
            schedule.tick(finished);
        }
        last
    }
}
