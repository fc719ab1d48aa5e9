//! Host temperature acquisition
//!
//! GPU temperatures come from `nvidia-smi`; the CPU side rides the hwmon
//! scan in [`crate::hwmon`]. This is the production `TemperatureSource`.

use std::process::Command;

use tracing::info;

use zf_core::TemperatureSource;
use zf_error::{Result, ZonefanError};

use crate::hwmon;

const NVIDIA_SMI: &str = "nvidia-smi";

/// Output tokens nvidia-smi emits when a value is unavailable
const UNAVAILABLE_TOKENS: &[&str] = &["N/A", "[N/A]", "[Not Supported]"];

/// Temperature source backed by `nvidia-smi` and `/sys/class/hwmon`
#[derive(Debug, Default)]
pub struct HostSensors;

impl HostSensors {
    pub fn new() -> Self {
        Self
    }
}

impl TemperatureSource for HostSensors {
    /// Enable driver persistence mode so the driver stays loaded between
    /// queries; without it each sample pays the full driver attach cost.
    fn prepare(&mut self) -> Result<()> {
        let output = Command::new(NVIDIA_SMI)
            .args(["-pm", "1"])
            .output()
            .map_err(|source| ZonefanError::CommandSpawn {
                tool: NVIDIA_SMI.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(ZonefanError::CommandFailed {
                tool: NVIDIA_SMI.to_string(),
                detail: stderr_snippet(&output.stderr),
            });
        }

        info!("NVIDIA driver persistence mode enabled");
        Ok(())
    }

    fn gpu_temps(&mut self) -> Result<Vec<f64>> {
        let output = Command::new(NVIDIA_SMI)
            .args(["--query-gpu=temperature.gpu", "--format=csv,noheader,nounits"])
            .output()
            .map_err(|source| ZonefanError::CommandSpawn {
                tool: NVIDIA_SMI.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(ZonefanError::sample(format!(
                "nvidia-smi exited with an error: {}",
                stderr_snippet(&output.stderr)
            )));
        }

        parse_gpu_temps(&String::from_utf8_lossy(&output.stdout))
    }

    fn cpu_temp(&mut self) -> Option<f64> {
        hwmon::read_cpu_temp()
    }
}

/// Parse the temperature query output: one integer °C per line, device order.
///
/// A device reporting "N/A" poisons the whole sample; partial GPU visibility
/// would otherwise let an overheating card hide behind its neighbours.
fn parse_gpu_temps(stdout: &str) -> Result<Vec<f64>> {
    let mut temps = Vec::new();

    for line in stdout.lines() {
        let value = line.trim();
        if value.is_empty() {
            continue;
        }
        if UNAVAILABLE_TOKENS.contains(&value) {
            return Err(ZonefanError::sample(format!(
                "GPU {} reports no temperature ({})",
                temps.len(),
                value
            )));
        }
        let celsius = value.parse::<f64>().map_err(|_| {
            ZonefanError::sample(format!("unparsable GPU temperature {:?}", value))
        })?;
        temps.push(celsius);
    }

    Ok(temps)
}

/// First stderr line, for error messages.
fn stderr_snippet(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    text.lines().next().unwrap_or("no error output").trim().to_string()
}
