//! Per-GPU temperature smoothing
//!
//! Two-term exponential moving average over successive samples, so one hot
//! scheduler burst does not spin the fans up by itself. The first sample
//! passes through untouched - there is no history to average against yet.

use tracing::debug;

use crate::constants::control;

/// Exponential moving average over per-GPU temperature samples.
///
/// State is positional: slot i tracks GPU index i. If the sample width
/// changes between updates (device reset, GPU fell off the bus) the state
/// re-seeds from the new sample instead of blending readings from
/// mismatched devices.
#[derive(Debug, Clone, Default)]
pub struct Smoother {
    state: Option<Vec<f64>>,
}

impl Smoother {
    pub fn new() -> Self {
        Self { state: None }
    }

    /// Fold one raw sample into the running average and return the smoothed view.
    pub fn update(&mut self, raw: &[f64]) -> Vec<f64> {
        let smoothed = match self.state.take() {
            Some(prev) if prev.len() == raw.len() => prev
                .iter()
                .zip(raw)
                .map(|(ema, new)| ema * control::EMA_WEIGHT + new * (1.0 - control::EMA_WEIGHT))
                .collect(),
            Some(prev) => {
                debug!(
                    previous = prev.len(),
                    current = raw.len(),
                    "GPU count changed, reseeding smoothing state"
                );
                raw.to_vec()
            }
            None => raw.to_vec(),
        };
        self.state = Some(smoothed.clone());
        smoothed
    }
}
