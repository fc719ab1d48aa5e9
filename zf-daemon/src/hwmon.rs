//! CPU temperature discovery via the hwmon subsystem
//!
//! Scans `/sys/class/hwmon` for CPU sensor chips (Intel `coretemp`,
//! AMD `k10temp`, ARM `cpu_thermal`), keeps the package-level channels,
//! and aggregates them to a single hottest-package value in °C.
//!
//! Per-core channels ("Core 0", "Core 1", ...) are deliberately skipped:
//! the package sensor already tracks the hottest core, and core counts
//! vary wildly across sockets.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};

use zf_core::constants::{paths, temperature};

/// hwmon chip names that carry CPU temperatures
const CPU_CHIP_PREFIXES: &[&str] = &["coretemp", "k10temp", "cpu_thermal"];

/// Channel labels accepted as package-level readings
const CPU_LABEL_PREFIXES: &[&str] = &["Package id", "Tdie", "Tctl", "CPU"];

/// Read the hottest CPU package temperature from the standard sysfs root.
pub fn read_cpu_temp() -> Option<f64> {
    read_cpu_temp_from(Path::new(paths::HWMON_BASE))
}

/// Scan one hwmon tree and return the max package temperature found.
///
/// Returns `None` when the tree is unreadable or holds no CPU sensor chip;
/// the caller treats a missing CPU reading as non-fatal.
pub fn read_cpu_temp_from(base: &Path) -> Option<f64> {
    let entries = match fs::read_dir(base) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(path = ?base, error = %e, "hwmon root not readable");
            return None;
        }
    };

    let mut max_temp: Option<f64> = None;

    for entry in entries.flatten() {
        let chip_path = entry.path();
        let name = match fs::read_to_string(chip_path.join("name")) {
            Ok(name) => name.trim().to_string(),
            Err(_) => continue,
        };
        if !CPU_CHIP_PREFIXES.iter().any(|p| name.starts_with(p)) {
            trace!(chip = %name, "Skipped non-CPU chip");
            continue;
        }

        trace!(chip = %name, path = ?chip_path, "Reading CPU sensor chip");
        for celsius in read_package_temps(&chip_path) {
            max_temp = Some(max_temp.map_or(celsius, |current| current.max(celsius)));
        }
    }

    max_temp
}

/// Package-level temperatures of one qualifying chip.
fn read_package_temps(chip_path: &Path) -> Vec<f64> {
    let mut temps = Vec::new();

    let entries = match fs::read_dir(chip_path) {
        Ok(entries) => entries,
        Err(_) => return temps,
    };

    let mut inputs: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| is_temp_input(path))
        .collect();
    inputs.sort();

    // Chips without any labels (cpu_thermal on ARM boards) expose a single
    // unlabeled channel; count every input in that case.
    let chip_has_labels = inputs.iter().any(|input| label_path(input).exists());

    for input in inputs {
        if chip_has_labels {
            let label = fs::read_to_string(label_path(&input)).unwrap_or_default();
            let label = label.trim();
            if !CPU_LABEL_PREFIXES.iter().any(|p| label.starts_with(p)) {
                trace!(label = %label, "Skipped non-package channel");
                continue;
            }
        }

        match read_millidegrees(&input) {
            Some(celsius)
                if (temperature::MIN_PLAUSIBLE_C..=temperature::MAX_PLAUSIBLE_C)
                    .contains(&celsius) =>
            {
                temps.push(celsius);
            }
            Some(celsius) => {
                warn!(path = ?input, celsius, "Discarding implausible CPU reading");
            }
            None => {}
        }
    }

    temps
}

fn is_temp_input(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with("temp") && name.ends_with("_input"))
        .unwrap_or(false)
}

fn label_path(input: &Path) -> PathBuf {
    let file_name = input
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    input.with_file_name(file_name.replace("_input", "_label"))
}

/// Temperature is reported in millidegrees Celsius (e.g. 61000 = 61.0°C)
fn read_millidegrees(path: &Path) -> Option<f64> {
    let content = fs::read_to_string(path).ok()?;
    let millidegrees = content.trim().parse::<f64>().ok()?;
    Some(millidegrees / temperature::MILLIDEGREE_DIVISOR)
}
