//! Push and pull files to a device when all you have is a shell on it.
//!
//! There is no protocol between the two ends beyond running commands and
//! reading their exit status and output. Pull requests from the device arrive
//! as marker files ([`handshake`]), copies are planned up front into
//! collision-free destinations ([`plan`]), and progress is measured by
//! watching the destination fill up ([`monitor`]).

pub mod config;
pub mod error;
pub mod events;
pub mod executor;
pub mod format;
pub mod handshake;
pub mod manifest;
pub mod monitor;
pub mod plan;
pub mod probe;
pub mod remote;
pub mod remote_fs;
pub mod resolve;
pub mod session;
pub mod stop;

pub use config::Config;
pub use error::{Result, TransferError};
pub use events::{EventHub, ProgressSnapshot, SessionEvent};
pub use handshake::{HandshakeCoordinator, HandshakePhase, Markers, PullRequest};
pub use manifest::Manifest;
pub use plan::{plan_pull, plan_push, Direction, PushOptions, TransferItem, TransferSession};
pub use remote::{CommandResult, CopyPrimitive, Link, RemoteCommand, RemoteShell};
pub use session::{SessionReport, SessionRunner};
pub use stop::{Schedule, StopSignal};
