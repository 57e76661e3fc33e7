//! One transfer from request to teardown.
//!
//! The executor and the progress monitor run side by side on the same planned
//! snapshot. When the executor returns, the monitor takes a final sample and
//! stops, then the session is finalised: staged pushes are moved into place,
//! and pulls are cleaned up and acknowledged to the companion app.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::Result;
use crate::events::{EventHub, ProgressSnapshot, SessionEvent};
use crate::executor::TransferExecutor;
use crate::handshake::PullRequest;
use crate::monitor::ProgressMonitor;
use crate::plan::{plan_pull, plan_push, remote_join, Direction, PushOptions, TransferSession};
use crate::probe::{LocalProbe, PathProbe, RemoteProbe};
use crate::remote::{CopyPrimitive, RemoteCommand, RemoteShell};
use crate::stop::{Schedule, StopSignal};

/// Prefix Android gives files sitting in its trash.
const TRASHED_PREFIX: &str = ".trashed";

#[derive(Debug, Clone)]
pub struct SessionReport {
    pub direction: Direction,
    pub copied: usize,
    pub total_bytes: u64,
    pub elapsed: Duration,
    /// Last progress snapshot the monitor published.
    pub last_progress: Option<ProgressSnapshot>,
}

pub struct SessionRunner<'a, L: ?Sized> {
    link: &'a L,
    hub: &'a EventHub,
    schedule: Schedule,
    purge_trashed: bool,
}

impl<'a, L> SessionRunner<'a, L>
where
    L: RemoteShell + CopyPrimitive + ?Sized,
{
    pub fn new(link: &'a L, hub: &'a EventHub, schedule: Schedule) -> Self {
        Self {
            link,
            hub,
            schedule,
            purge_trashed: false,
        }
    }

    /// Delete `.trashed*` files from pulled destinations before acknowledging.
    pub fn purge_trashed(mut self, enabled: bool) -> Self {
        self.purge_trashed = enabled;
        self
    }

    /// Plan and run a push of local `sources` into `remote_root`.
    pub fn push(
        &self,
        sources: &[PathBuf],
        remote_root: &str,
        options: &PushOptions,
    ) -> Result<SessionReport> {
        let session = match plan_push(self.link, sources, remote_root, options) {
            Ok(s) => s,
            Err(e) => {
                self.hub.publish(SessionEvent::Error(e.to_string()));
                return Err(e);
            }
        };
        self.execute(&session)
    }

    /// Plan and run the pull the companion asked for, then signal completion.
    ///
    /// On failure the request is dropped without a completion marker, which
    /// frees the coordinator for the next request.
    pub fn pull<S: RemoteShell>(
        &self,
        request: PullRequest<S>,
        local_root: &Path,
    ) -> Result<SessionReport> {
        let session = match plan_pull(&request.manifest, local_root) {
            Ok(s) => s,
            Err(e) => {
                self.hub.publish(SessionEvent::Error(e.to_string()));
                return Err(e);
            }
        };
        let report = self.execute(&session)?;
        if self.purge_trashed {
            purge_trashed(session.tracked_destinations());
        }
        request.complete()?;
        Ok(report)
    }

    /// Run a planned session to the end.
    pub fn execute(&self, session: &TransferSession) -> Result<SessionReport> {
        info!(
            direction = ?session.direction(),
            items = session.items().len(),
            total_bytes = session.total_bytes(),
            "session started"
        );
        self.hub.publish(SessionEvent::Started {
            direction: session.direction(),
            items: session.items().len(),
            total_bytes: session.total_bytes(),
        });

        let probe: Box<dyn PathProbe + '_> = match session.direction() {
            Direction::Pull => Box::new(LocalProbe),
            Direction::Push => Box::new(RemoteProbe::new(self.link)),
        };
        let finished = StopSignal::new();

        let (outcome, last_progress) = thread::scope(|scope| {
            let monitor = scope.spawn(|| {
                ProgressMonitor::new(
                    probe.as_ref(),
                    session.tracked_destinations(),
                    session.total_bytes(),
                    session.started_at(),
                )
                .run(self.schedule, &finished, self.hub)
            });
            let outcome = TransferExecutor::new(self.link, self.link).run(session);
            finished.stop();
            (outcome, monitor.join().ok().flatten())
        });

        let outcome = outcome.and_then(|copied| {
            if let Some(staging) = session.staging() {
                consolidate(self.link, staging)?;
            }
            Ok(copied)
        });

        let elapsed = session.started_at().elapsed();
        match outcome {
            Ok(copied) => {
                info!(copied, elapsed = ?elapsed, "session finished");
                self.hub.publish(SessionEvent::Finished { copied, elapsed });
                Ok(SessionReport {
                    direction: session.direction(),
                    copied,
                    total_bytes: session.total_bytes(),
                    elapsed,
                    last_progress,
                })
            }
            Err(e) => {
                warn!(error = %e, "session failed");
                self.hub.publish(SessionEvent::Error(e.to_string()));
                Err(e)
            }
        }
    }
}

/// Move staged entries into their final root and drop the staging directory,
/// in one command.
fn consolidate<S>(shell: &S, staging: &crate::plan::Staging) -> Result<()>
where
    S: RemoteShell + ?Sized,
{
    let cmd = staging
        .names
        .iter()
        .map(|name| {
            RemoteCommand::rename(
                &remote_join(&staging.dir, name),
                &remote_join(&staging.root, name),
            )
        })
        .fold(RemoteCommand::new("true"), RemoteCommand::and)
        .and(RemoteCommand::new("rmdir").path(&staging.dir));
    shell.run(&cmd)?.require(&cmd)?;
    info!(entries = staging.names.len(), root = %staging.root, "staged push moved into place");
    Ok(())
}

/// Remove `.trashed*` files under each destination. Returns how many went.
pub fn purge_trashed(destinations: &[String]) -> usize {
    let mut removed = 0;
    for dest in destinations {
        // Only inside pulled directories; a pulled file is never itself purged.
        for entry in WalkDir::new(dest).min_depth(1).into_iter().filter_map(|e| e.ok()) {
            let is_trashed = entry.file_type().is_file()
                && entry
                    .file_name()
                    .to_string_lossy()
                    .starts_with(TRASHED_PREFIX);
            if !is_trashed {
                continue;
            }
            match fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => warn!(
                    path = %entry.path().display(),
                    error = %e,
                    "could not remove trashed file"
                ),
            }
        }
    }
    if removed > 0 {
        info!(removed, "removed trashed files");
    }
    removed
}
