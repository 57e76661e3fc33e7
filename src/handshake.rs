//! Marker-file handshake with the companion app.
//!
//! The device cannot notify us, so the companion leaves a manifest in a
//! marker file and we poll for it:
//!
//! 1. read the request marker until it succeeds (AwaitingRequest),
//! 2. write the "received" marker once and take the busy flag (Acknowledged),
//! 3. hand the manifest to a pull session (AwaitingCompletionSignal),
//! 4. after every item arrived, write the "done" marker (Done),
//! 5. release the busy flag (Idle).
//!
//! The busy flag is the only thing stopping a marker that is still present,
//! or a quick repeat request, from being accepted twice while a session is
//! running or finalising.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::manifest::Manifest;
use crate::remote::{RemoteCommand, RemoteShell};
use crate::stop::{Schedule, StopSignal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandshakePhase {
    #[default]
    Idle,
    AwaitingRequest,
    Acknowledged,
    AwaitingCompletionSignal,
    Done,
}

/// Where the companion app and we leave notes for each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Markers {
    /// Package to `run-as`; marker paths are then relative to its data dir.
    /// An empty string turns `run-as` off.
    pub run_as: Option<String>,
    pub request: String,
    pub received: String,
    pub done: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            run_as: Some("rl.launch".to_string()),
            request: "./files/launch.txt".to_string(),
            received: "./files/key_a".to_string(),
            done: "./files/key_b".to_string(),
        }
    }
}

impl Markers {
    fn wrap(&self, inner: RemoteCommand) -> RemoteCommand {
        match &self.run_as {
            Some(package) if !package.is_empty() => RemoteCommand::run_as(package, inner),
            _ => inner,
        }
    }

    pub fn read_request(&self) -> RemoteCommand {
        self.wrap(RemoteCommand::cat(&self.request))
    }

    pub fn write_received(&self) -> RemoteCommand {
        self.wrap(RemoteCommand::touch(&self.received))
    }

    pub fn write_done(&self) -> RemoteCommand {
        self.wrap(RemoteCommand::touch(&self.done))
    }
}

#[derive(Debug, Default)]
struct Shared {
    busy: AtomicBool,
    phase: Mutex<HandshakePhase>,
}

impl Shared {
    fn set_phase(&self, phase: HandshakePhase) {
        if let Ok(mut p) = self.phase.lock() {
            *p = phase;
        }
    }

    fn phase(&self) -> HandshakePhase {
        self.phase.lock().map(|p| *p).unwrap_or_default()
    }
}

pub struct HandshakeCoordinator<S> {
    shell: S,
    markers: Markers,
    shared: Arc<Shared>,
}

impl<S: RemoteShell + Clone> HandshakeCoordinator<S> {
    pub fn new(shell: S, markers: Markers) -> Self {
        Self {
            shell,
            markers,
            shared: Arc::default(),
        }
    }

    pub fn phase(&self) -> HandshakePhase {
        self.shared.phase()
    }

    /// True while an accepted request has not been released.
    pub fn is_busy(&self) -> bool {
        self.shared.busy.load(Ordering::Acquire)
    }

    /// One read of the request marker.
    ///
    /// Returns a request only if the marker was readable and no other request
    /// is in flight. The "received" marker is written exactly once per
    /// accepted request.
    pub fn poll_once(&self) -> Result<Option<PullRequest<S>>> {
        if self.phase() == HandshakePhase::Idle {
            self.shared.set_phase(HandshakePhase::AwaitingRequest);
        }

        let read = self.shell.run(&self.markers.read_request())?;
        if !read.succeeded {
            return Ok(None);
        }
        if self
            .shared
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("request marker present but a session is still active");
            return Ok(None);
        }

        // From here on, dropping the ticket releases the busy flag.
        let ticket = Ticket {
            shell: self.shell.clone(),
            markers: self.markers.clone(),
            shared: Arc::clone(&self.shared),
        };
        self.shared.set_phase(HandshakePhase::Acknowledged);
        let ack = self.markers.write_received();
        self.shell.run(&ack)?.require(&ack)?;
        info!("pull request acknowledged");

        let manifest = Manifest::parse(&read.output)?;
        self.shared.set_phase(HandshakePhase::AwaitingCompletionSignal);
        Ok(Some(PullRequest { manifest, ticket }))
    }

    /// Poll until `stop` fires, handing each accepted request to `on_request`.
    ///
    /// Transport errors are logged and polling carries on; only a stop ends
    /// the loop.
    pub fn run<F>(&self, schedule: Schedule, stop: &StopSignal, mut on_request: F)
    where
        F: FnMut(PullRequest<S>),
    {
        info!(interval = ?schedule.interval(), "waiting for pull requests");
        loop {
            if stop.is_stopped() {
                break;
            }
            match self.poll_once() {
                Ok(Some(request)) => on_request(request),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "handshake poll failed"),
            }
            if !schedule.tick(stop) {
                break;
            }
        }
        if !self.is_busy() {
            self.shared.set_phase(HandshakePhase::Idle);
        }
        debug!("handshake loop stopped");
    }
}

/// An accepted pull request. Holds the busy flag until completed or dropped.
pub struct PullRequest<S> {
    pub manifest: Manifest,
    ticket: Ticket<S>,
}

impl<S: RemoteShell> PullRequest<S> {
    /// Tell the companion every item arrived, then release the busy flag.
    pub fn complete(self) -> Result<()> {
        self.ticket.complete()
    }

    /// Give up on this request without signalling completion.
    pub fn abandon(self) {
        warn!("pull request abandoned, completion marker not written");
    }
}

struct Ticket<S> {
    shell: S,
    markers: Markers,
    shared: Arc<Shared>,
}

impl<S: RemoteShell> Ticket<S> {
    fn complete(self) -> Result<()> {
        let cmd = self.markers.write_done();
        self.shell.run(&cmd)?.require(&cmd)?;
        self.shared.set_phase(HandshakePhase::Done);
        info!("pull completion signalled");
        Ok(())
    }
}

impl<S> Drop for Ticket<S> {
    fn drop(&mut self) {
        self.shared.busy.store(false, Ordering::Release);
        self.shared.set_phase(HandshakePhase::Idle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_markers_use_the_companion_package() {
        let m = Markers::default();
        assert_eq!(
            m.read_request().as_str(),
            "run-as 'rl.launch' cat './files/launch.txt'"
        );
        assert_eq!(m.write_done().as_str(), "run-as 'rl.launch' touch './files/key_b'");
    }

    #[test]
    fn markers_without_run_as_are_plain() {
        let m = Markers {
            run_as: None,
            request: "/tmp/req".into(),
            received: "/tmp/ack".into(),
            done: "/tmp/done".into(),
        };
        assert_eq!(m.write_received().as_str(), "touch '/tmp/ack'");
    }
}
