//! Session events and the fan-out channel that carries them.
//!
//! The core never draws anything. It publishes [`SessionEvent`]s, and each
//! front end subscribes for its own receiver.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::format::{human_rate, human_size};
use crate::plan::Direction;

/// One observation of destination state.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    /// Destinations that exist, not counting the one still being written.
    pub completed: usize,
    pub total_files: usize,
    pub bytes_done: u64,
    pub total_bytes: u64,
    pub percent: u8,
    pub elapsed: Duration,
    /// Bytes per second since the session started.
    pub throughput: f64,
}

impl ProgressSnapshot {
    /// Seconds left at the current throughput. `None` until bytes move.
    pub fn remaining_secs(&self) -> Option<u64> {
        if self.throughput <= 0.0 {
            return None;
        }
        let left = self.total_bytes.saturating_sub(self.bytes_done);
        Some((left as f64 / self.throughput).round() as u64)
    }

    /// `3/10 Files  |  12s / 18s  |  4MB/s  |  48.2MB/120MB`
    pub fn summary(&self) -> String {
        let remaining = match self.remaining_secs() {
            Some(secs) => format!("{}s", secs),
            None => "?".to_string(),
        };
        format!(
            "{}/{} File{}  |  {}s / {}  |  {}  |  {}/{}",
            self.completed,
            self.total_files,
            if self.total_files == 1 { "" } else { "s" },
            self.elapsed.as_secs_f64().round() as u64,
            remaining,
            human_rate(self.throughput),
            human_size(self.bytes_done),
            human_size(self.total_bytes),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Started {
        direction: Direction,
        items: usize,
        total_bytes: u64,
    },
    Progress(ProgressSnapshot),
    Finished {
        copied: usize,
        elapsed: Duration,
    },
    Error(String),
}

/// Publish/subscribe hub. Clones share subscribers; receivers that hung up
/// are dropped on the next publish.
#[derive(Debug, Clone, Default)]
pub struct EventHub {
    subscribers: Arc<Mutex<Vec<mpsc::Sender<SessionEvent>>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> mpsc::Receiver<SessionEvent> {
        let (tx, rx) = mpsc::channel();
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }
        rx
    }

    pub fn publish(&self, event: SessionEvent) {
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }
}
