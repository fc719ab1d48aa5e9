//! Supermicro fan-zone actuation over IPMI
//!
//! Drives the BMC's raw zone-duty interface through `ipmitool` and
//! snapshots the fan mode (the BMC's own control profile) so it can be
//! put back when the daemon exits.
//!
//! Raw commands (Supermicro X9/X10/X11 generations):
//!
//! | Command                            | Meaning                      |
//! |------------------------------------|------------------------------|
//! | `raw 0x30 0x45 0x00`               | read fan mode                |
//! | `raw 0x30 0x45 0x01 <mode>`        | set fan mode                 |
//! | `raw 0x30 0x70 0x66 0x00 <zone>`   | read zone duty (0-100)       |
//! | `raw 0x30 0x70 0x66 0x01 <zone> <duty>` | set zone duty           |
//!
//! With `ipmi.hostname` configured the session goes out over `lanplus`;
//! otherwise ipmitool talks to the local `/dev/ipmi0` device, which needs
//! root.

use std::collections::BTreeMap;
use std::process::Command;

use tracing::{debug, error, info, warn};

use zf_core::{FanActuator, IpmiConfig, Preset, ZoneId};
use zf_error::{Result, ZonefanError};

const IPMITOOL: &str = "ipmitool";

/// Known Supermicro fan-mode bytes, for log readability
fn mode_name(mode: u8) -> &'static str {
    match mode {
        0x00 => "standard",
        0x01 => "full",
        0x02 => "optimal",
        0x04 => "heavy-io",
        _ => "unknown",
    }
}

/// `FanActuator` backed by `ipmitool raw` against a Supermicro BMC
#[derive(Debug, Clone)]
pub struct SupermicroIpmi {
    connection: IpmiConfig,
}

impl SupermicroIpmi {
    pub fn new(connection: IpmiConfig) -> Self {
        Self { connection }
    }

    /// Full argument vector for one raw command, session args included.
    fn raw_args(&self, raw: &[u8]) -> Vec<String> {
        let mut args = Vec::new();

        if !self.connection.is_local() {
            if let Some(hostname) = &self.connection.hostname {
                args.push("-I".to_string());
                args.push("lanplus".to_string());
                args.push("-H".to_string());
                args.push(hostname.clone());
            }
            if let Some(username) = &self.connection.username {
                args.push("-U".to_string());
                args.push(username.clone());
            }
            if let Some(password) = &self.connection.password {
                args.push("-P".to_string());
                args.push(password.clone());
            }
        }

        args.push("raw".to_string());
        for byte in raw {
            args.push(format!("0x{:02x}", byte));
        }

        args
    }

    /// Run one raw command and return the parsed reply bytes.
    fn run_raw(&self, raw: &[u8]) -> Result<Vec<u8>> {
        // Session args carry the BMC password, so only the raw bytes are logged.
        debug!(command = ?raw, "ipmitool raw");

        let output = Command::new(IPMITOOL)
            .args(self.raw_args(raw))
            .output()
            .map_err(|source| ZonefanError::CommandSpawn {
                tool: IPMITOOL.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(ZonefanError::CommandFailed {
                tool: IPMITOOL.to_string(),
                detail: String::from_utf8_lossy(&output.stderr)
                    .lines()
                    .next()
                    .unwrap_or("no error output")
                    .trim()
                    .to_string(),
            });
        }

        parse_reply(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse ipmitool's reply, whitespace-separated hex bytes (e.g. `" 32"`).
fn parse_reply(stdout: &str) -> Result<Vec<u8>> {
    stdout
        .split_whitespace()
        .map(|token| {
            u8::from_str_radix(token, 16).map_err(|_| {
                ZonefanError::generic(format!("unexpected ipmitool reply token {:?}", token))
            })
        })
        .collect()
}

impl FanActuator for SupermicroIpmi {
    fn default_preset(&mut self) -> Result<Preset> {
        let reply = self.run_raw(&[0x30, 0x45, 0x00])?;
        let mode = *reply
            .first()
            .ok_or_else(|| ZonefanError::generic("BMC returned an empty fan mode reply"))?;

        info!(mode, name = mode_name(mode), "Captured BMC fan mode");
        Ok(Preset::from_raw(vec![mode]))
    }

    fn restore_preset(&mut self, preset: &Preset) -> Result<()> {
        let mode = *preset
            .raw()
            .first()
            .ok_or_else(|| ZonefanError::generic("preset snapshot is empty"))?;

        self.run_raw(&[0x30, 0x45, 0x01, mode])?;

        info!(mode, name = mode_name(mode), "BMC fan mode restored");
        Ok(())
    }

    fn zone_duties(&mut self, zones: &[ZoneId]) -> Result<BTreeMap<ZoneId, f64>> {
        let mut duties = BTreeMap::new();

        for &zone in zones {
            match self.run_raw(&[0x30, 0x70, 0x66, 0x00, zone]) {
                Ok(reply) => match reply.first() {
                    Some(&duty) if duty <= 100 => {
                        duties.insert(zone, f64::from(duty));
                    }
                    Some(&duty) => {
                        warn!(zone, duty, "Zone reports duty above 100, treating as unreadable");
                    }
                    None => {
                        warn!(zone, "Zone returned an empty duty reply");
                    }
                },
                Err(e) => {
                    // An unreadable zone is left out of the map; the gate
                    // treats absent zones as already on target.
                    warn!(zone, error = %e, "Zone duty read failed");
                }
            }
        }

        Ok(duties)
    }

    fn set_zone_duties(&mut self, zones: &[ZoneId], percent: f64) -> Result<()> {
        let duty = percent.clamp(0.0, 100.0).round() as u8;

        let mut failed: Vec<ZoneId> = Vec::new();
        let mut last_error = String::new();

        // Every zone gets its write attempted even after a failure; a single
        // flaky zone must not strand the others at a stale duty.
        for &zone in zones {
            match self.run_raw(&[0x30, 0x70, 0x66, 0x01, zone, duty]) {
                Ok(_) => debug!(zone, duty, "Zone duty written"),
                Err(e) => {
                    error!(zone, duty, error = %e, "Zone duty write failed");
                    last_error = e.to_string();
                    failed.push(zone);
                }
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(ZonefanError::ActuatorWrite {
                zones: failed,
                reason: last_error,
            })
        }
    }
}
