//! Daemon configuration
//!
//! One JSON file holds everything: the curve mapping, loop timing, the
//! zones to drive, and the BMC connection. Unset fields fall back to the
//! defaults in `constants`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use zf_error::{Result, ZonefanError};

use crate::constants::{control, limits, timing, zones};
use crate::curve::{CurvePoint, FanCurve};
use crate::hw::ZoneId;

/// Connection details for the BMC; local `/dev/ipmi` when no hostname is given
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IpmiConfig {
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl IpmiConfig {
    /// True when commands should target the local IPMI device rather than
    /// a remote BMC session
    pub fn is_local(&self) -> bool {
        matches!(
            self.hostname.as_deref(),
            None | Some("") | Some("localhost") | Some("127.0.0.1")
        )
    }
}

/// Top-level daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Curve mapping: temperature threshold in °C (as a JSON key) to duty percent
    pub fan_settings: BTreeMap<String, f64>,

    /// Dwell before a downward duty change is allowed, seconds
    #[serde(default = "default_min_decrease_interval_secs")]
    pub min_decrease_interval_secs: f64,

    /// Control tick cadence, seconds
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: f64,

    /// Deviation (percentage points) a zone must show before a write is issued
    #[serde(default = "default_tolerance_eps")]
    pub tolerance_eps: f64,

    /// Fan zone ids to drive
    #[serde(default = "default_zones")]
    pub zones: Vec<ZoneId>,

    /// BMC connection
    #[serde(default)]
    pub ipmi: IpmiConfig,
}

fn default_min_decrease_interval_secs() -> f64 {
    timing::DEFAULT_MIN_DECREASE_INTERVAL.as_secs_f64()
}

fn default_tick_interval_secs() -> f64 {
    timing::DEFAULT_TICK_INTERVAL.as_secs_f64()
}

fn default_tolerance_eps() -> f64 {
    control::DEFAULT_TOLERANCE_EPS
}

fn default_zones() -> Vec<ZoneId> {
    zones::DEFAULT_ZONE_IDS.to_vec()
}

impl ControllerConfig {
    /// Read and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| ZonefanError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        if text.len() as u64 > limits::MAX_CONFIG_SIZE {
            return Err(ZonefanError::config(format!(
                "configuration file {} exceeds {} bytes",
                path.display(),
                limits::MAX_CONFIG_SIZE
            )));
        }
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field without touching hardware.
    pub fn validate(&self) -> Result<()> {
        self.curve()?;

        if !self.tick_interval_secs.is_finite() || self.tick_interval_secs <= 0.0 {
            return Err(ZonefanError::invalid_config(
                "tick_interval_secs",
                "must be a positive number of seconds",
            ));
        }
        if !self.min_decrease_interval_secs.is_finite() || self.min_decrease_interval_secs < 0.0 {
            return Err(ZonefanError::invalid_config(
                "min_decrease_interval_secs",
                "must be a non-negative number of seconds",
            ));
        }
        self.tick_interval()?;
        self.min_decrease_interval()?;
        if !self.tolerance_eps.is_finite() || self.tolerance_eps < 0.0 {
            return Err(ZonefanError::invalid_config(
                "tolerance_eps",
                "must be a non-negative number of percentage points",
            ));
        }

        if self.zones.is_empty() {
            return Err(ZonefanError::invalid_config(
                "zones",
                "at least one fan zone id is required",
            ));
        }
        let mut seen = self.zones.clone();
        seen.sort_unstable();
        for pair in seen.windows(2) {
            if pair[0] == pair[1] {
                return Err(ZonefanError::invalid_config(
                    "zones",
                    format!("zone id {} listed more than once", pair[0]),
                ));
            }
        }

        Ok(())
    }

    /// Build the fan curve from the `fan_settings` mapping.
    pub fn curve(&self) -> Result<FanCurve> {
        let mut points = Vec::with_capacity(self.fan_settings.len());
        for (key, percent) in &self.fan_settings {
            let threshold_c = key.trim().parse::<f64>().map_err(|_| {
                ZonefanError::invalid_config(
                    "fan_settings",
                    format!("threshold {:?} is not a number", key),
                )
            })?;
            points.push(CurvePoint {
                threshold_c,
                fan_percent: *percent,
            });
        }
        FanCurve::new(points)
    }

    /// Tick cadence as a `Duration`
    pub fn tick_interval(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.tick_interval_secs).map_err(|_| {
            ZonefanError::invalid_config(
                "tick_interval_secs",
                "not representable as a duration",
            )
        })
    }

    /// Decrease dwell as a `Duration`
    pub fn min_decrease_interval(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.min_decrease_interval_secs).map_err(|_| {
            ZonefanError::invalid_config(
                "min_decrease_interval_secs",
                "not representable as a duration",
            )
        })
    }
}
