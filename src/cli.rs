//! Command-line arguments.
//!
//! Flags given here override the configuration file.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rocketlink::config::Transport;
use rocketlink::Config;

/// Rocketlink - move files to and from a device over adb or ssh.
#[derive(Parser, Debug)]
#[command(author, version, about)]
#[command(propagate_version = true)]
pub struct Args {
    /// Configuration file. Defaults to ./rocketlink.toml when present.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Link to use.
    #[arg(long, global = true, value_enum)]
    pub transport: Option<Transport>,

    /// adb device serial.
    #[arg(short, long, global = true)]
    pub serial: Option<String>,

    /// ssh destination (user@host).
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Progress poll interval in milliseconds.
    #[arg(long, global = true)]
    pub interval: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Wait for the companion app to request pulls, until Ctrl+C.
    Listen {
        /// Local directory pulled files land in.
        #[arg(long)]
        into: Option<PathBuf>,
    },
    /// Copy local files and directories to the device.
    Push {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Remote directory to push into.
        #[arg(long)]
        to: Option<String>,
        /// Stage in a hidden directory and move into place at the end.
        #[arg(long)]
        staging: bool,
    },
    /// List a remote directory.
    Ls { path: String },
    /// Total size of a remote path.
    Size { path: String },
    /// List attached adb devices.
    Devices,
}

impl Args {
    /// Overlay command-line values on a loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(transport) = self.transport {
            config.device.transport = transport;
        }
        if self.serial.is_some() {
            config.device.serial = self.serial.clone();
        }
        if self.host.is_some() {
            config.device.host = self.host.clone();
        }
        if let Some(ms) = self.interval {
            config.poll_interval_ms = ms;
        }
        match &self.command {
            Command::Listen { into: Some(dir) } => config.pull.local_root = dir.clone(),
            Command::Push { to, staging, .. } => {
                if let Some(root) = to {
                    config.push.remote_root = root.clone();
                }
                if *staging {
                    config.push.staging = true;
                }
            }
            _ => {}
        }
    }

    /// Log filter for the verbosity level.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn,rocketlink=info",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_file_values() {
        let args = Args::parse_from([
            "rocketlink",
            "--transport",
            "local",
            "push",
            "a.txt",
            "--to",
            "/tmp/out",
            "--staging",
        ]);
        let mut config = Config::default();
        args.apply(&mut config);
        assert_eq!(config.device.transport, Transport::Local);
        assert_eq!(config.push.remote_root, "/tmp/out");
        assert!(config.push.staging);
    }

    #[test]
    fn verbosity_maps_to_filters() {
        let args = Args::parse_from(["rocketlink", "-vv", "devices"]);
        assert_eq!(args.log_filter(), "debug");
    }

    #[test]
    fn unknown_transport_is_rejected() {
        assert!(Args::try_parse_from(["rocketlink", "--transport", "fax", "devices"]).is_err());
    }
}
