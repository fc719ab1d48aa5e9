//! Anti-flap gating of fan duty changes
//!
//! Decouples "what the curve wants" from "what gets written": increases go
//! through immediately, decreases must wait out a dwell period after the
//! last approved change, and targets the zones already sit at are dropped
//! to avoid redundant hardware writes.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::hw::ZoneId;

/// Why a proposed duty was not applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldReason {
    /// A decrease arrived before the dwell period expired
    DwellActive,
    /// Every readable zone is already within tolerance of the target
    WithinTolerance,
}

/// Outcome of a gate decision
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    /// Write this percent to every configured zone
    Apply { percent: f64 },
    /// Leave the hardware as it is
    Hold { reason: HoldReason },
}

impl Decision {
    /// True when the decision carries a write
    pub fn applies(&self) -> bool {
        matches!(self, Decision::Apply { .. })
    }
}

#[derive(Debug, Clone, Copy)]
struct Approved {
    percent: f64,
    at: Instant,
}

/// Stateful damper between curve output and zone writes.
///
/// Memory updates only when a change is approved; held proposals leave it
/// untouched, so the dwell clock keeps counting from the last change that
/// actually went out.
#[derive(Debug)]
pub struct HysteresisGate {
    min_decrease_interval: Duration,
    tolerance_eps: f64,
    last: Option<Approved>,
}

impl HysteresisGate {
    pub fn new(min_decrease_interval: Duration, tolerance_eps: f64) -> Self {
        Self {
            min_decrease_interval,
            tolerance_eps,
            last: None,
        }
    }

    /// Decide whether `proposed` should be written, given the duty each
    /// zone currently reports.
    ///
    /// Zones reporting 0 are treated as stale and excluded from the
    /// tolerance check. With no readable zone at all the deviation counts
    /// as infinite, so missing telemetry can never wedge the controller at
    /// its current speed.
    pub fn decide(
        &mut self,
        proposed: f64,
        zone_duties: &BTreeMap<ZoneId, f64>,
        now: Instant,
    ) -> Decision {
        let max_deviation = zone_duties
            .values()
            .filter(|duty| **duty > 0.0)
            .map(|duty| (duty - proposed).abs())
            .reduce(f64::max)
            .unwrap_or(f64::INFINITY);

        // The first decision is always eligible, whichever direction it goes.
        if let Some(last) = self.last {
            let is_decrease = proposed < last.percent;
            let elapsed = now.saturating_duration_since(last.at);
            if is_decrease && elapsed <= self.min_decrease_interval {
                return Decision::Hold {
                    reason: HoldReason::DwellActive,
                };
            }
        }

        if max_deviation <= self.tolerance_eps {
            return Decision::Hold {
                reason: HoldReason::WithinTolerance,
            };
        }

        self.last = Some(Approved {
            percent: proposed,
            at: now,
        });
        Decision::Apply { percent: proposed }
    }

    /// Percent of the last approved change, if any
    pub fn last_approved_percent(&self) -> Option<f64> {
        self.last.map(|approved| approved.percent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> HysteresisGate {
        HysteresisGate::new(Duration::from_secs(30), 2.0)
    }

    fn duties(values: &[(ZoneId, f64)]) -> BTreeMap<ZoneId, f64> {
        values.iter().copied().collect()
    }

    #[test]
    fn test_first_decision_always_eligible() {
        let mut gate = gate();
        // A decrease relative to the hardware, with no prior approval.
        let decision = gate.decide(20.0, &duties(&[(0, 80.0), (1, 80.0)]), Instant::now());
        assert_eq!(decision, Decision::Apply { percent: 20.0 });
    }

    #[test]
    fn test_increase_applies_immediately() {
        let mut gate = gate();
        let start = Instant::now();
        gate.decide(40.0, &duties(&[(0, 20.0)]), start);
        let decision = gate.decide(80.0, &duties(&[(0, 40.0)]), start + Duration::from_secs(1));
        assert_eq!(decision, Decision::Apply { percent: 80.0 });
    }

    #[test]
    fn test_decrease_within_dwell_suppressed() {
        let mut gate = gate();
        let start = Instant::now();
        gate.decide(40.0, &duties(&[(0, 20.0)]), start);
        let decision = gate.decide(20.0, &duties(&[(0, 40.0)]), start + Duration::from_secs(5));
        assert_eq!(
            decision,
            Decision::Hold {
                reason: HoldReason::DwellActive
            }
        );
        assert_eq!(gate.last_approved_percent(), Some(40.0));
    }

    #[test]
    fn test_decrease_at_exact_dwell_boundary_suppressed() {
        let mut gate = gate();
        let start = Instant::now();
        gate.decide(40.0, &duties(&[(0, 20.0)]), start);
        let decision = gate.decide(20.0, &duties(&[(0, 40.0)]), start + Duration::from_secs(30));
        assert!(!decision.applies());
    }

    #[test]
    fn test_decrease_after_dwell_applies() {
        let mut gate = gate();
        let start = Instant::now();
        gate.decide(40.0, &duties(&[(0, 20.0)]), start);
        let decision = gate.decide(20.0, &duties(&[(0, 40.0)]), start + Duration::from_secs(31));
        assert_eq!(decision, Decision::Apply { percent: 20.0 });
    }

    #[test]
    fn test_within_tolerance_held() {
        let mut gate = gate();
        let start = Instant::now();
        gate.decide(40.0, &duties(&[(0, 20.0)]), start);
        let decision = gate.decide(41.0, &duties(&[(0, 40.0)]), start + Duration::from_secs(60));
        assert_eq!(
            decision,
            Decision::Hold {
                reason: HoldReason::WithinTolerance
            }
        );
        // Memory still holds the last change that actually went out.
        assert_eq!(gate.last_approved_percent(), Some(40.0));
    }

    #[test]
    fn test_zero_valued_zones_excluded_from_tolerance() {
        let mut gate = gate();
        // Zone 0 reads back 0 (stale); zone 1 already sits at the target.
        let decision = gate.decide(40.0, &duties(&[(0, 0.0), (1, 40.0)]), Instant::now());
        assert_eq!(
            decision,
            Decision::Hold {
                reason: HoldReason::WithinTolerance
            }
        );
    }

    #[test]
    fn test_no_readable_zones_always_applies() {
        let mut gate = gate();
        let start = Instant::now();
        assert!(gate.decide(40.0, &duties(&[]), start).applies());
        // All-zero telemetry behaves the same as no telemetry.
        let decision = gate.decide(
            60.0,
            &duties(&[(0, 0.0), (1, 0.0)]),
            start + Duration::from_secs(1),
        );
        assert_eq!(decision, Decision::Apply { percent: 60.0 });
    }

    #[test]
    fn test_held_proposals_leave_dwell_clock_running() {
        let mut gate = gate();
        let start = Instant::now();
        gate.decide(40.0, &duties(&[(0, 20.0)]), start);
        // Held by the dwell; must not refresh the approval timestamp.
        gate.decide(39.0, &duties(&[(0, 40.0)]), start + Duration::from_secs(29));
        let decision = gate.decide(20.0, &duties(&[(0, 40.0)]), start + Duration::from_secs(31));
        assert_eq!(decision, Decision::Apply { percent: 20.0 });
    }
}
