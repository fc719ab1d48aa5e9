//! Hardware abstraction seams
//!
//! The control loop talks to temperature telemetry and the fan actuator
//! through these traits only. The daemon provides the nvidia-smi / hwmon /
//! IPMI implementations; tests substitute mocks.

use std::collections::BTreeMap;

use zf_error::Result;

/// Identifier of one hardware fan zone
pub type ZoneId = u8;

/// Opaque snapshot of the actuator's default fan-control profile.
///
/// Captured once before the controller takes over and restored exactly once
/// at shutdown. The bytes mean whatever the actuator wants them to mean;
/// the control loop never looks inside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preset {
    raw: Vec<u8>,
}

impl Preset {
    pub fn from_raw(raw: Vec<u8>) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }
}

/// Supplier of GPU and CPU temperatures
pub trait TemperatureSource {
    /// One-time setup before the first sample, e.g. enabling a persistence
    /// mode that keeps later queries cheap. Failure is fatal to startup.
    fn prepare(&mut self) -> Result<()>;

    /// Current temperature of every GPU, °C, in device-index order.
    fn gpu_temps(&mut self) -> Result<Vec<f64>>;

    /// Aggregated CPU temperature, °C. `None` when the host exposes no
    /// usable CPU sensor; never an error.
    fn cpu_temp(&mut self) -> Option<f64>;
}

/// Reader/writer for hardware fan zones
pub trait FanActuator {
    /// Snapshot the profile currently controlling the fans.
    fn default_preset(&mut self) -> Result<Preset>;

    /// Hand fan control back to the given profile.
    fn restore_preset(&mut self, preset: &Preset) -> Result<()>;

    /// Duty percent currently reported by each zone. An unreadable zone is
    /// omitted from the map (or reported as 0), never an error.
    fn zone_duties(&mut self, zones: &[ZoneId]) -> Result<BTreeMap<ZoneId, f64>>;

    /// Drive every listed zone at `percent`.
    fn set_zone_duties(&mut self, zones: &[ZoneId], percent: f64) -> Result<()>;
}
