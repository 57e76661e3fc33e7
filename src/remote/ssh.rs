use std::path::Path;
use std::process::Command;

use super::{capture, copy_outcome, to_result, CommandResult, CopyPrimitive, RemoteShell};
use crate::error::{Result, TransferError};

/// ssh exits with 255 when the connection itself failed.
const SSH_CONNECTION_FAILED: i32 = 255;

/// A host reached over ssh, with file copies over scp.
///
/// All calls share one TCP connection through an ssh control socket, so the
/// per-poll cost of the progress monitor stays at one round trip.
#[derive(Debug, Clone)]
pub struct SshLink {
    host: String,
    ssh: String,
    scp: String,
}

impl SshLink {
    pub fn new(host: impl Into<String>) -> Self {
        Self::with_programs(host, "ssh", "scp")
    }

    pub fn with_programs(
        host: impl Into<String>,
        ssh: impl Into<String>,
        scp: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            ssh: ssh.into(),
            scp: scp.into(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn control_args() -> [&'static str; 6] {
        [
            "-o", "ControlMaster=auto",
            "-o", "ControlPath=/tmp/rocketlink_ssh_%h_%p_%r",
            "-o", "ControlPersist=60",
        ]
    }

    /// Quick connectivity check.
    pub fn check(&self) -> Result<()> {
        let result = self.execute("echo ok")?;
        if result.succeeded {
            Ok(())
        } else {
            Err(TransferError::Transport(format!(
                "ssh connection to '{}' failed",
                self.host
            )))
        }
    }

    fn scp(&self, recursive: bool) -> Command {
        let mut cmd = Command::new(&self.scp);
        cmd.args(Self::control_args()).arg("-q");
        if recursive {
            cmd.arg("-r");
        }
        cmd
    }
}

impl RemoteShell for SshLink {
    fn execute(&self, command: &str) -> Result<CommandResult> {
        let output = capture(
            Command::new(&self.ssh)
                .args(Self::control_args())
                .arg(&self.host)
                .arg(command),
        )?;
        if output.status.code() == Some(SSH_CONNECTION_FAILED) {
            let msg = String::from_utf8_lossy(&output.stderr);
            return Err(TransferError::Transport(format!(
                "ssh connection to '{}' failed: {}",
                self.host,
                msg.trim()
            )));
        }
        Ok(to_result(&output))
    }
}

impl CopyPrimitive for SshLink {
    fn push(&self, local: &Path, remote: &str) -> Result<()> {
        let output = capture(
            self.scp(local.is_dir())
                .arg(local)
                .arg(format!("{}:{}", self.host, remote)),
        )?;
        copy_outcome(&output, &local.to_string_lossy(), remote)
    }

    fn pull(&self, remote: &str, local: &Path) -> Result<()> {
        // The item may be a directory; -r is harmless for plain files.
        let output = capture(
            self.scp(true)
                .arg(format!("{}:{}", self.host, remote))
                .arg(local),
        )?;
        copy_outcome(&output, remote, &local.to_string_lossy())
    }
}
