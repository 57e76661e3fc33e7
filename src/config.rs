//! Configuration file schema and defaults.
//!
//! Precedence: defaults < `rocketlink.toml` (or `--config`) < command line.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TransferError};
use crate::handshake::Markers;
use crate::remote::{wait_for_device, AdbLink, Link, LocalLink, SshLink};
use crate::stop::{Schedule, StopSignal, MIN_POLL_INTERVAL};

pub const DEFAULT_CONFIG_FILE: &str = "rocketlink.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Adb,
    Ssh,
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    pub transport: Transport,
    /// adb serial; the first attached device when unset.
    pub serial: Option<String>,
    /// ssh destination, e.g. `user@phone`.
    pub host: Option<String>,
    pub adb: String,
    pub ssh: String,
    pub scp: String,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            transport: Transport::Adb,
            serial: None,
            host: None,
            adb: "adb".to_string(),
            ssh: "ssh".to_string(),
            scp: "scp".to_string(),
        }
    }
}

impl DeviceSettings {
    /// Open the configured link. Waits for an adb device if no serial is set;
    /// `Ok(None)` if `stop` fired while waiting.
    pub fn connect(&self, schedule: Schedule, stop: &StopSignal) -> Result<Option<Link>> {
        match self.transport {
            Transport::Adb => {
                let serial = match &self.serial {
                    Some(s) => s.clone(),
                    None => match wait_for_device(&self.adb, schedule, stop)? {
                        Some(s) => s,
                        None => return Ok(None),
                    },
                };
                Ok(Some(Link::Adb(AdbLink::new(&self.adb, serial))))
            }
            Transport::Ssh => {
                let host = self.host.as_deref().ok_or_else(|| {
                    TransferError::Config("ssh transport needs device.host".into())
                })?;
                let link = SshLink::with_programs(host, &self.ssh, &self.scp);
                link.check()?;
                Ok(Some(Link::Ssh(link)))
            }
            Transport::Local => Ok(Some(Link::Local(LocalLink::new()))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushSettings {
    pub remote_root: String,
    pub staging: bool,
}

impl Default for PushSettings {
    fn default() -> Self {
        Self {
            remote_root: "/sdcard/Download".to_string(),
            staging: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PullSettings {
    pub local_root: PathBuf,
    pub purge_trashed: bool,
}

impl Default for PullSettings {
    fn default() -> Self {
        Self {
            local_root: PathBuf::from("."),
            purge_trashed: true,
        }
    }
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Progress monitor interval.
    pub poll_interval_ms: u64,
    /// Request-marker polling interval.
    pub handshake_interval_ms: u64,
    pub device: DeviceSettings,
    pub handshake: Markers,
    pub push: PushSettings,
    pub pull: PullSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            handshake_interval_ms: 250,
            device: DeviceSettings::default(),
            handshake: Markers::default(),
            push: PushSettings::default(),
            pull: PullSettings::default(),
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(text).map_err(|e| TransferError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| TransferError::io(path, e))?;
        debug!(path = %path.display(), "loading config");
        Self::from_toml(&text)
    }

    /// An explicit path must exist; otherwise use `rocketlink.toml` in the
    /// working directory if present, else defaults.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let floor = MIN_POLL_INTERVAL.as_millis() as u64;
        if self.poll_interval_ms < floor || self.handshake_interval_ms < floor {
            return Err(TransferError::Config(format!(
                "poll intervals must be at least {}ms",
                floor
            )));
        }
        if !self.push.remote_root.starts_with('/') {
            return Err(TransferError::Config(format!(
                "push.remote_root must be absolute, got {:?}",
                self.push.remote_root
            )));
        }
        if self.device.transport == Transport::Ssh && self.device.host.is_none() {
            return Err(TransferError::Config("ssh transport needs device.host".into()));
        }
        Ok(())
    }

    pub fn poll_schedule(&self) -> Schedule {
        Schedule::every(Duration::from_millis(self.poll_interval_ms))
    }

    pub fn handshake_schedule(&self) -> Schedule {
        Schedule::every(Duration::from_millis(self.handshake_interval_ms))
    }
}
