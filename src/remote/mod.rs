//! The link to the device: a command channel plus a copy primitive.
//!
//! Neither side reports progress or pushes events; everything above this
//! module learns about the device by running commands and reading their exit
//! status and output.

mod adb;
mod command;
mod local;
mod ssh;

use std::path::Path;
use std::process::{Command, Output};
use std::sync::Arc;

use tracing::debug;

use crate::error::{Result, TransferError};

pub use adb::{list_devices, parse_devices, wait_for_device, AdbLink};
pub use command::{shell_quote, RemoteCommand};
pub use local::LocalLink;
pub use ssh::SshLink;

/// Outcome of one remote command. Only the exit status decides `succeeded`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub succeeded: bool,
    pub output: String,
}

impl CommandResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            output: output.into(),
        }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            output: output.into(),
        }
    }

    /// Turn a non-zero exit into [`TransferError::RemoteCommand`], for steps that
    /// cannot continue without the command.
    pub fn require(self, command: &RemoteCommand) -> Result<String> {
        if self.succeeded {
            Ok(self.output)
        } else {
            Err(TransferError::RemoteCommand {
                command: command.to_string(),
                output: self.output,
            })
        }
    }
}

/// Runs one command string on the device. Blocking, no retry, no timeout.
///
/// `Err` means the command could not be run at all; a command that ran and
/// failed is `Ok` with `succeeded == false`.
pub trait RemoteShell: Send + Sync {
    fn execute(&self, command: &str) -> Result<CommandResult>;

    fn run(&self, command: &RemoteCommand) -> Result<CommandResult> {
        let result = self.execute(command.as_str())?;
        debug!(command = %command, succeeded = result.succeeded, "remote command");
        Ok(result)
    }
}

impl<T: RemoteShell + ?Sized> RemoteShell for Arc<T> {
    fn execute(&self, command: &str) -> Result<CommandResult> {
        (**self).execute(command)
    }
}

impl<T: RemoteShell + ?Sized> RemoteShell for &T {
    fn execute(&self, command: &str) -> Result<CommandResult> {
        (**self).execute(command)
    }
}

/// Whole-file copy between this machine and the device. Reports nothing until
/// it returns.
pub trait CopyPrimitive: Send + Sync {
    fn push(&self, local: &Path, remote: &str) -> Result<()>;
    fn pull(&self, remote: &str, local: &Path) -> Result<()>;
}

impl<T: CopyPrimitive + ?Sized> CopyPrimitive for Arc<T> {
    fn push(&self, local: &Path, remote: &str) -> Result<()> {
        (**self).push(local, remote)
    }

    fn pull(&self, remote: &str, local: &Path) -> Result<()> {
        (**self).pull(remote, local)
    }
}

// ── Link selection ─────────────────────────────────────────────────────

/// The concrete link chosen by configuration.
#[derive(Debug, Clone)]
pub enum Link {
    Adb(AdbLink),
    Ssh(SshLink),
    Local(LocalLink),
}

impl Link {
    pub fn describe(&self) -> String {
        match self {
            Link::Adb(l) => format!("adb:{}", l.serial()),
            Link::Ssh(l) => format!("ssh:{}", l.host()),
            Link::Local(_) => "local".to_string(),
        }
    }
}

impl RemoteShell for Link {
    fn execute(&self, command: &str) -> Result<CommandResult> {
        match self {
            Link::Adb(l) => l.execute(command),
            Link::Ssh(l) => l.execute(command),
            Link::Local(l) => l.execute(command),
        }
    }
}

impl CopyPrimitive for Link {
    fn push(&self, local: &Path, remote: &str) -> Result<()> {
        match self {
            Link::Adb(l) => l.push(local, remote),
            Link::Ssh(l) => l.push(local, remote),
            Link::Local(l) => l.push(local, remote),
        }
    }

    fn pull(&self, remote: &str, local: &Path) -> Result<()> {
        match self {
            Link::Adb(l) => l.pull(remote, local),
            Link::Ssh(l) => l.pull(remote, local),
            Link::Local(l) => l.pull(remote, local),
        }
    }
}

// ── Process helpers shared by the links ────────────────────────────────

/// Spawn and wait. Failing to spawn is a transport failure.
fn capture(cmd: &mut Command) -> Result<Output> {
    cmd.output().map_err(|e| {
        TransferError::Transport(format!(
            "could not run {}: {}",
            cmd.get_program().to_string_lossy(),
            e
        ))
    })
}

fn to_result(output: &Output) -> CommandResult {
    let stdout = String::from_utf8_lossy(&output.stdout);
    CommandResult {
        succeeded: output.status.success(),
        output: stdout.trim_end().to_string(),
    }
}

/// Map a finished copy process to the item's outcome.
fn copy_outcome(output: &Output, source: &str, destination: &str) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let reason = match stderr.trim() {
        "" => format!("exit code {}", output.status.code().unwrap_or(-1)),
        msg => msg.to_string(),
    };
    Err(TransferError::ItemCopy {
        source_path: source.to_string(),
        destination: destination.to_string(),
        reason,
    })
}
