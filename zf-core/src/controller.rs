//! The control loop
//!
//! Owns the sample -> smooth -> resolve -> gate -> actuate cycle and the
//! shutdown protocol around it. Lifecycle:
//!
//! `Initializing -> Running -> Stopping -> Reverted -> Terminated`
//!
//! Initialization failures abort before any write, so there is nothing to
//! revert. Once running, a failed tick is logged and skipped, never fatal.
//! The default preset captured at startup is restored on every exit path
//! past initialization; a restore failure is the one error that surfaces
//! to the operator, because the hardware may be left in a non-default state.

use std::time::{Duration, Instant, SystemTime};

use tracing::{debug, error, info, warn};

use zf_error::{Result, ZonefanError};

use crate::cancel::ShutdownToken;
use crate::config::ControllerConfig;
use crate::constants::control;
use crate::curve::FanCurve;
use crate::hw::{FanActuator, Preset, TemperatureSource, ZoneId};
use crate::hysteresis::{Decision, HysteresisGate};
use crate::smoothing::Smoother;

/// Lifecycle states of the control loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Initializing,
    Running,
    Stopping,
    Reverted,
    Terminated,
}

/// One tick's worth of telemetry, handed to the logging layer
#[derive(Debug, Clone)]
pub struct TickReport {
    pub timestamp: SystemTime,
    pub raw_gpu_temps: Vec<f64>,
    pub smoothed_gpu_temps: Vec<f64>,
    pub cpu_temp: Option<f64>,
    pub combined_temp: f64,
    pub proposed_percent: f64,
    pub applied: bool,
}

/// Closed-loop fan controller over a temperature source and a fan actuator
#[derive(Debug)]
pub struct ControlLoop<S, A> {
    curve: FanCurve,
    smoother: Smoother,
    gate: HysteresisGate,
    source: S,
    actuator: A,
    zones: Vec<ZoneId>,
    tick_interval: Duration,
    token: ShutdownToken,
    state: LoopState,
    consecutive_failures: u32,
}

impl<S, A> ControlLoop<S, A>
where
    S: TemperatureSource,
    A: FanActuator,
{
    /// Build a loop from validated configuration.
    pub fn new(
        config: &ControllerConfig,
        source: S,
        actuator: A,
        token: ShutdownToken,
    ) -> Result<Self> {
        let curve = config.curve()?;
        Ok(Self {
            curve,
            smoother: Smoother::new(),
            gate: HysteresisGate::new(config.min_decrease_interval()?, config.tolerance_eps),
            source,
            actuator,
            zones: config.zones.clone(),
            tick_interval: config.tick_interval()?,
            token,
            state: LoopState::Initializing,
            consecutive_failures: 0,
        })
    }

    /// Current lifecycle state
    pub fn state(&self) -> LoopState {
        self.state
    }

    fn set_state(&mut self, next: LoopState) {
        debug!(from = ?self.state, to = ?next, "Control loop state change");
        self.state = next;
    }

    /// Drive the loop until cancellation, then restore the default preset.
    ///
    /// Returns `Ok` only after the preset has been restored. The errors
    /// this can return are initialization failures (nothing was written)
    /// and restore failures (the hardware may be left in a non-default
    /// state); `state` tells the two apart after an error return.
    pub async fn run(&mut self) -> Result<()> {
        let preset = self.initialize()?;

        self.set_state(LoopState::Running);
        info!(
            zones = ?self.zones,
            interval_secs = self.tick_interval.as_secs_f64(),
            "Fan control loop started"
        );
        self.run_ticks().await;

        self.set_state(LoopState::Stopping);
        info!("Shutdown observed, restoring default fan preset");
        if let Err(err) = self.actuator.restore_preset(&preset) {
            error!("Failed to restore default fan preset: {}", err);
            return Err(ZonefanError::restore(err.to_string()));
        }
        self.set_state(LoopState::Reverted);
        info!("Default fan preset restored");

        self.set_state(LoopState::Terminated);
        Ok(())
    }

    /// Capture the default preset and put the source into persistent mode.
    ///
    /// Runs before any zone write; either step failing is fatal and leaves
    /// the hardware exactly as it was found.
    fn initialize(&mut self) -> Result<Preset> {
        let preset = self
            .actuator
            .default_preset()
            .map_err(|err| ZonefanError::init(format!("snapshot default preset: {}", err)))?;
        info!(preset = ?preset, "Captured default fan preset");

        self.source
            .prepare()
            .map_err(|err| ZonefanError::init(format!("prepare temperature source: {}", err)))?;

        Ok(preset)
    }

    async fn run_ticks(&mut self) {
        while !self.token.is_signalled() {
            match self.tick() {
                Ok(report) => {
                    if self.consecutive_failures > 0 {
                        info!(
                            failed_ticks = self.consecutive_failures,
                            "Control loop recovered"
                        );
                        self.consecutive_failures = 0;
                    }
                    log_report(&report);
                }
                Err(err) => {
                    self.consecutive_failures += 1;
                    if self.consecutive_failures >= control::MAX_CONSECUTIVE_ERRORS {
                        error!(
                            consecutive = self.consecutive_failures,
                            "Tick skipped: {}", err
                        );
                    } else {
                        warn!(
                            consecutive = self.consecutive_failures,
                            "Tick skipped: {}", err
                        );
                    }
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.tick_interval) => {}
                _ = self.token.cancelled() => break,
            }
        }
    }

    /// One sample -> decide -> actuate pass.
    ///
    /// `run` calls this on the tick cadence; it is public so the cycle can
    /// be driven manually without a runtime.
    pub fn tick(&mut self) -> Result<TickReport> {
        let raw = self.source.gpu_temps()?;
        if raw.is_empty() {
            return Err(ZonefanError::sample("no GPU temperatures reported"));
        }
        if let Some(bad) = raw.iter().find(|t| !t.is_finite()) {
            return Err(ZonefanError::sample(format!(
                "non-finite GPU temperature {}",
                bad
            )));
        }

        let smoothed = self.smoother.update(&raw);
        let gpu_max = smoothed.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let cpu_temp = match self.source.cpu_temp() {
            Some(t) if t.is_finite() => Some(t),
            Some(t) => {
                warn!("Discarding non-finite CPU temperature {}", t);
                None
            }
            None => {
                debug!("No CPU temperature available this tick");
                None
            }
        };
        let combined_temp = gpu_max.max(cpu_temp.unwrap_or(f64::NEG_INFINITY));

        let proposed_percent = self.curve.resolve(combined_temp);

        let duties = self.actuator.zone_duties(&self.zones)?;

        let decision = self.gate.decide(proposed_percent, &duties, Instant::now());
        let applied = match decision {
            Decision::Apply { percent } => {
                self.actuator.set_zone_duties(&self.zones, percent)?;
                true
            }
            Decision::Hold { reason } => {
                debug!(?reason, proposed = proposed_percent, "Holding fan duty");
                false
            }
        };

        Ok(TickReport {
            timestamp: SystemTime::now(),
            raw_gpu_temps: raw,
            smoothed_gpu_temps: smoothed,
            cpu_temp,
            combined_temp,
            proposed_percent,
            applied,
        })
    }
}

fn log_report(report: &TickReport) {
    if report.applied {
        info!(
            raw = ?report.raw_gpu_temps,
            smoothed = ?report.smoothed_gpu_temps,
            cpu = ?report.cpu_temp,
            combined = report.combined_temp,
            duty = report.proposed_percent,
            "Fan duty applied"
        );
    } else {
        debug!(
            raw = ?report.raw_gpu_temps,
            smoothed = ?report.smoothed_gpu_temps,
            cpu = ?report.cpu_temp,
            combined = report.combined_temp,
            duty = report.proposed_percent,
            "Fan duty unchanged"
        );
    }
}
