//! Cooperative cancellation and poll pacing.
//!
//! Every polling loop in the crate (handshake, progress monitor, device
//! discovery) sleeps through a [`Schedule`], which waits on a [`StopSignal`]
//! instead of a bare `thread::sleep` so a stop request wakes it at once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// A cloneable stop flag. Clones share state, so tripping any clone wakes all
/// waiters.
#[derive(Debug, Default, Clone)]
pub struct StopSignal {
    inner: Arc<Shared>,
}

#[derive(Debug, Default)]
struct Shared {
    stopped: AtomicBool,
    lock: Mutex<()>,
    cvar: Condvar,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.inner.stopped.store(true, Ordering::Release);
        if let Ok(_guard) = self.inner.lock.lock() {
            self.inner.cvar.notify_all();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
    }

    /// Block for up to `timeout`. Returns `true` if the signal was tripped
    /// (before or during the wait).
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let Ok(mut guard) = self.inner.lock.lock() else {
            return self.is_stopped();
        };
        while !self.is_stopped() {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            guard = match self.inner.cvar.wait_timeout(guard, deadline - now) {
                Ok((g, _)) => g,
                Err(_) => return self.is_stopped(),
            };
        }
        true
    }
}

/// Smallest interval any poll loop may run at.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Fixed-interval pacing for a poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    interval: Duration,
}

impl Schedule {
    /// Intervals under [`MIN_POLL_INTERVAL`] are raised to it.
    pub fn every(interval: Duration) -> Self {
        Self {
            interval: interval.max(MIN_POLL_INTERVAL),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sleep one tick. Returns `false` when `stop` fired and the loop should end.
    pub fn tick(&self, stop: &StopSignal) -> bool {
        !stop.wait_timeout(self.interval)
    }
}
