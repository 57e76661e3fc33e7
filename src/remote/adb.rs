use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

use super::{capture, copy_outcome, to_result, CommandResult, CopyPrimitive, RemoteShell};
use crate::error::Result;
use crate::stop::{Schedule, StopSignal};

/// A device reached through the `adb` binary.
#[derive(Debug, Clone)]
pub struct AdbLink {
    program: String,
    serial: String,
}

impl AdbLink {
    pub fn new(program: impl Into<String>, serial: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            serial: serial.into(),
        }
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    fn adb(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(["-s", &self.serial]);
        cmd
    }
}

impl RemoteShell for AdbLink {
    fn execute(&self, command: &str) -> Result<CommandResult> {
        let output = capture(self.adb().arg("shell").arg(command))?;
        Ok(to_result(&output))
    }
}

impl CopyPrimitive for AdbLink {
    fn push(&self, local: &Path, remote: &str) -> Result<()> {
        let output = capture(self.adb().arg("push").arg(local).arg(remote))?;
        copy_outcome(&output, &local.to_string_lossy(), remote)
    }

    fn pull(&self, remote: &str, local: &Path) -> Result<()> {
        let output = capture(self.adb().arg("pull").arg(remote).arg(local))?;
        copy_outcome(&output, remote, &local.to_string_lossy())
    }
}

// ── Device discovery ───────────────────────────────────────────────────

/// Serials of attached, authorised devices in `adb devices` output.
pub fn parse_devices(output: &str) -> Vec<String> {
    output
        .lines()
        .skip_while(|l| !l.starts_with("List of devices"))
        .skip(1)
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            match (cols.next(), cols.next()) {
                (Some(serial), Some("device")) => Some(serial.to_string()),
                _ => None,
            }
        })
        .collect()
}

pub fn list_devices(program: &str) -> Result<Vec<String>> {
    let output = capture(Command::new(program).arg("devices"))?;
    Ok(parse_devices(&String::from_utf8_lossy(&output.stdout)))
}

/// Poll `adb devices` until one shows up. `Ok(None)` if stopped first.
pub fn wait_for_device(
    program: &str,
    schedule: Schedule,
    stop: &StopSignal,
) -> Result<Option<String>> {
    info!("waiting for a device");
    loop {
        if stop.is_stopped() {
            return Ok(None);
        }
        let devices = list_devices(program)?;
        if let Some(first) = devices.into_iter().next() {
            info!(serial = %first, "device attached");
            return Ok(Some(first));
        }
        debug!("no device yet");
        if !schedule.tick(stop) {
            return Ok(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_only_ready_devices() {
        let out = "* daemon started successfully\n\
                   List of devices attached\n\
                   R58M12ABCDE\tdevice\n\
                   emulator-5554\toffline\n\
                   0123456789\tunauthorized\n\
                   192.168.1.7:5555\tdevice\n\n";
        assert_eq!(parse_devices(out), vec!["R58M12ABCDE", "192.168.1.7:5555"]);
    }

    #[test]
    fn empty_list() {
        assert!(parse_devices("List of devices attached\n\n").is_empty());
        assert!(parse_devices("").is_empty());
    }
}
