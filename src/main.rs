mod cli;

use std::io::Write;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cli::{Args, Command};
use rocketlink::remote::list_devices;
use rocketlink::remote_fs::RemoteFs;
use rocketlink::{
    Config, EventHub, HandshakeCoordinator, Link, PushOptions, SessionEvent, SessionRunner,
    StopSignal,
};

fn main() -> Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config =
        Config::load_or_default(args.config.as_deref()).context("loading configuration")?;
    args.apply(&mut config);
    config.validate()?;

    let stop = StopSignal::new();
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.stop()).context("installing Ctrl+C handler")?;
    }

    if let Command::Devices = args.command {
        for serial in list_devices(&config.device.adb)? {
            println!("{}", serial);
        }
        return Ok(());
    }

    let Some(link) = config.device.connect(config.handshake_schedule(), &stop)? else {
        return Ok(());
    };
    info!(link = %link.describe(), "connected");

    match args.command {
        Command::Listen { .. } => listen(&config, link, &stop),
        Command::Push { paths, .. } => push(&config, &link, paths),
        Command::Ls { path } => {
            let listing = RemoteFs::new(&link).list(&path)?;
            for dir in listing.dirs {
                println!("{}/", dir);
            }
            for file in listing.files {
                println!("{}", file);
            }
            Ok(())
        }
        Command::Size { path } => {
            println!("{}", RemoteFs::new(&link).describe_size(&path)?);
            Ok(())
        }
        Command::Devices => Ok(()),
    }
}

// ── Sessions ───────────────────────────────────────────────────────────

fn listen(config: &Config, link: Link, stop: &StopSignal) -> Result<()> {
    let hub = EventHub::new();
    let printer = spawn_printer(hub.subscribe());

    let coordinator = HandshakeCoordinator::new(link.clone(), config.handshake.clone());
    let runner = SessionRunner::new(&link, &hub, config.poll_schedule())
        .purge_trashed(config.pull.purge_trashed);

    coordinator.run(config.handshake_schedule(), stop, |request| {
        match runner.pull(request, &config.pull.local_root) {
            Ok(report) => info!(copied = report.copied, "pull complete"),
            Err(e) => error!(error = %e, "pull failed"),
        }
    });

    drop(runner);
    drop(hub);
    let _ = printer.join();
    Ok(())
}

fn push(config: &Config, link: &Link, paths: Vec<PathBuf>) -> Result<()> {
    let hub = EventHub::new();
    let printer = spawn_printer(hub.subscribe());

    let options = PushOptions {
        staging: config.push.staging,
    };
    let outcome = SessionRunner::new(link, &hub, config.poll_schedule()).push(
        &paths,
        &config.push.remote_root,
        &options,
    );

    drop(hub);
    let _ = printer.join();
    let report = outcome.context("push failed")?;
    info!(
        copied = report.copied,
        root = %config.push.remote_root,
        "push complete"
    );
    Ok(())
}

// ── Progress output ────────────────────────────────────────────────────

fn spawn_printer(rx: Receiver<SessionEvent>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut err = std::io::stderr();
        for event in rx {
            match event {
                SessionEvent::Started { items, total_bytes, .. } => {
                    let _ = writeln!(
                        err,
                        "{} item{}, {}",
                        items,
                        if items == 1 { "" } else { "s" },
                        rocketlink::format::human_size(total_bytes)
                    );
                }
                SessionEvent::Progress(snapshot) => {
                    let _ = write!(err, "\r{:>3}%  {}", snapshot.percent, snapshot.summary());
                    let _ = err.flush();
                }
                SessionEvent::Finished { .. } => {
                    let _ = writeln!(err);
                }
                SessionEvent::Error(msg) => {
                    let _ = writeln!(err, "\nerror: {}", msg);
                }
            }
        }
    })
}
