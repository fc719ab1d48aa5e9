//! Zonefan daemon (zonefand)
//!
//! Closes the loop between host temperatures and the Supermicro fan zones:
//!
//! - Samples GPU temperatures (`nvidia-smi`) and the CPU package (hwmon)
//!   on a fixed cadence
//! - Smooths the per-GPU readings and resolves a stepped fan curve on the
//!   hottest channel
//! - Pushes duty changes through an anti-flap gate to the BMC over IPMI
//! - Restores the BMC's own fan preset on the way out, whatever the reason
//!   for exit
//!
//! Needs root for local IPMI and driver persistence mode; a remote BMC
//! session (`ipmi.hostname` in the configuration) runs unprivileged.

mod cli;
mod hwmon;
mod ipmi;
mod sensors;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};

use zf_core::{ControlLoop, ControllerConfig, ShutdownToken};

use crate::cli::Cli;
use crate::ipmi::SupermicroIpmi;
use crate::sensors::HostSensors;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize tracing: journald when the socket is present, stdout otherwise.
fn init_logging(default_level: &str) {
    let log_level =
        std::env::var("ZONEFAN_LOG").unwrap_or_else(|_| default_level.to_string());

    let mut use_journald = std::path::Path::new("/run/systemd/journal/socket").exists();

    if use_journald {
        match tracing_journald::layer() {
            Ok(journald_layer) => {
                use tracing_subscriber::prelude::*;
                tracing_subscriber::registry()
                    .with(journald_layer)
                    .with(tracing_subscriber::EnvFilter::new(&log_level))
                    .init();
            }
            Err(e) => {
                // Journald layer creation failed, fall back to stdout
                eprintln!("Failed to create journald layer: {}, falling back to stdout", e);
                use_journald = false;
                tracing_subscriber::fmt()
                    .with_target(false)
                    .with_level(true)
                    .with_env_filter(&log_level)
                    .init();
            }
        }
    } else {
        tracing_subscriber::fmt()
            .with_target(false)
            .with_level(true)
            .with_env_filter(&log_level)
            .init();
    }

    info!(
        "STARTUP: Logging to {} at level {}",
        if use_journald { "systemd journal" } else { "stdout" },
        log_level
    );
}

/// Warn when local hardware access is about to be attempted without root.
fn check_privileges(config: &ControllerConfig) {
    // SAFETY: geteuid is always safe - it just returns the effective user ID.
    let euid = unsafe { libc::geteuid() };

    if euid != 0 && config.ipmi.is_local() {
        warn!(
            "Running unprivileged with no remote BMC configured; local ipmitool \
             and nvidia-smi persistence writes will likely be refused"
        );
    }
}

/// Log the resolved curve and control parameters before the loop starts.
fn log_settings(config: &ControllerConfig) -> zf_error::Result<()> {
    let curve = config.curve()?;

    info!("STARTUP: Fan curve ({} points):", curve.points().len());
    for point in curve.points() {
        info!("  {:>6.1}°C -> {:>3.0}%", point.threshold_c, point.fan_percent);
    }
    info!(
        tick_secs = config.tick_interval_secs,
        dwell_secs = config.min_decrease_interval_secs,
        tolerance = config.tolerance_eps,
        zones = ?config.zones,
        local_bmc = config.ipmi.is_local(),
        "STARTUP: Control parameters"
    );

    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // PHASE 1: Load and validate configuration
    let config = ControllerConfig::load(&cli.config)
        .with_context(|| format!("loading configuration {}", cli.config.display()))?;
    log_settings(&config)?;

    if cli.check {
        info!("Configuration OK");
        return Ok(());
    }

    // PHASE 2: Privilege check (warn only; a remote BMC needs no root)
    check_privileges(&config);

    // PHASE 3: Signal handlers wired to the cancellation token
    // Without graceful shutdown the BMC would be stranded in manual control,
    // so a failed handler install is fatal rather than a warning.
    let token = ShutdownToken::new();
    let signal_token = token.clone();
    ctrlc::set_handler(move || {
        info!("SIGNAL: Received SIGINT/SIGTERM - initiating shutdown");
        signal_token.signal();
    })
    .context("installing signal handler")?;

    // PHASE 4: Build the control loop and run it to completion
    let sensors = HostSensors::new();
    let actuator = SupermicroIpmi::new(config.ipmi.clone());
    let mut control = ControlLoop::new(&config, sensors, actuator, token)?;

    control.run().await?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // PHASE 0: Parse arguments and bring up logging
    let cli = Cli::parse();
    init_logging(cli.log_level());

    info!("STARTUP: zonefand {} starting", VERSION);
    info!("STARTUP: PID: {}", std::process::id());

    match run(cli).await {
        Ok(()) => info!("SHUTDOWN: zonefand stopped cleanly"),
        Err(e) => {
            // An error escaping run() means either startup failed or the
            // default preset could not be restored; the non-zero exit lets
            // the service manager surface it either way.
            error!("{:#}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use zf_core::ShutdownToken;

    // Service managers stop the daemon with SIGTERM, not SIGINT; the preset
    // restore only runs if the handler sees that signal instead of the
    // default disposition killing the process.
    #[test]
    fn test_sigterm_reaches_shutdown_handler() {
        let token = ShutdownToken::new();
        let handler_token = token.clone();
        ctrlc::set_handler(move || handler_token.signal()).unwrap();

        // SAFETY: raising a signal in our own process; the handler installed
        // above catches SIGTERM, so the default disposition never runs.
        let rc = unsafe { libc::kill(libc::getpid(), libc::SIGTERM) };
        assert_eq!(rc, 0);

        let deadline = Instant::now() + Duration::from_secs(5);
        while !token.is_signalled() {
            assert!(
                Instant::now() < deadline,
                "SIGTERM was not delivered to the handler"
            );
            std::thread::sleep(Duration::from_millis(10));
        }
    }
}
