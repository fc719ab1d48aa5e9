//! Constants and configuration defaults for Zonefan
//!
//! Centralizes all magic numbers and control defaults.
//! This is the SINGLE SOURCE OF TRUTH for tunable values.
//! Never use magic numbers in other files - add them here first.

use std::time::Duration;

/// Control loop timing
pub mod timing {
    use super::*;

    /// Default interval between control ticks
    pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(2);

    /// Default minimum dwell before a downward duty change is allowed
    ///
    /// A fan raised for a heat spike stays raised at least this long, so a
    /// brief dip in temperature cannot bounce the speed straight back down.
    pub const DEFAULT_MIN_DECREASE_INTERVAL: Duration = Duration::from_secs(30);
}

/// Control algorithm parameters
pub mod control {
    /// Default deviation (percentage points) a zone must differ from the
    /// target by before a write is issued
    pub const DEFAULT_TOLERANCE_EPS: f64 = 2.0;

    /// Weight of the previous value in the two-term exponential moving
    /// average applied to GPU temperatures
    pub const EMA_WEIGHT: f64 = 0.5;

    /// Consecutive failed ticks before skip logging escalates from warn to error
    pub const MAX_CONSECUTIVE_ERRORS: u32 = 10;
}

/// Fan zone constants
pub mod zones {
    /// Zone ids driven when the configuration names none
    ///
    /// Matches the four SYS fan zones of Supermicro 4U GPU chassis.
    pub const DEFAULT_ZONE_IDS: &[u8] = &[0, 1, 2, 3];
}

/// Temperature plausibility bounds
pub mod temperature {
    /// Readings below this are discarded as sensor glitches (°C)
    pub const MIN_PLAUSIBLE_C: f64 = -50.0;

    /// Readings above this are discarded as sensor glitches (°C)
    pub const MAX_PLAUSIBLE_C: f64 = 150.0;

    /// hwmon reports millidegrees Celsius (e.g. 45000 = 45.0°C)
    pub const MILLIDEGREE_DIVISOR: f64 = 1000.0;
}

/// Size limits for configuration input
pub mod limits {
    /// Maximum number of curve points accepted from configuration
    pub const MAX_CURVE_POINTS: usize = 32;

    /// Maximum configuration file size (1MB)
    pub const MAX_CONFIG_SIZE: u64 = 1024 * 1024;
}

/// Filesystem paths
pub mod paths {
    /// Default daemon configuration file
    pub const DEFAULT_CONFIG_FILE: &str = "/etc/zonefan/config.json";

    /// Linux hwmon sysfs root
    pub const HWMON_BASE: &str = "/sys/class/hwmon";
}
