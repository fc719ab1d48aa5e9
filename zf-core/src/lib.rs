//! Zonefan Core Library
//!
//! Closed-loop fan-zone control for GPU servers: sample GPU and CPU
//! temperatures, smooth them, look up a duty target on a stepped curve,
//! damp the result through an anti-flap gate, and drive the fan zones -
//! with a guaranteed restore of the hardware's default preset on the way
//! out.
//!
//! # Module Structure
//!
//! - `curve` - stepped temperature -> duty mapping
//! - `smoothing` - per-GPU exponential moving average
//! - `hysteresis` - dwell and tolerance gating of duty changes
//! - `controller` - the control loop and its lifecycle
//! - `hw` - the traits hardware implementations plug into
//! - `cancel` - cooperative shutdown token
//! - `config` - JSON configuration model
//! - `constants` - defaults and limits
//!
//! # Example
//!
//! ```
//! use zf_core::{CurvePoint, FanCurve};
//!
//! let curve = FanCurve::new(vec![
//!     CurvePoint { threshold_c: 30.0, fan_percent: 20.0 },
//!     CurvePoint { threshold_c: 50.0, fan_percent: 40.0 },
//!     CurvePoint { threshold_c: 70.0, fan_percent: 80.0 },
//! ]).unwrap();
//!
//! assert_eq!(curve.resolve(65.0), 40.0);
//! ```

pub mod cancel;
pub mod config;
pub mod constants;
pub mod controller;
pub mod curve;
pub mod hw;
pub mod hysteresis;
pub mod smoothing;

pub use cancel::ShutdownToken;
pub use config::{ControllerConfig, IpmiConfig};
pub use controller::{ControlLoop, LoopState, TickReport};
pub use curve::{validate_percent, CurvePoint, FanCurve};
pub use hw::{FanActuator, Preset, TemperatureSource, ZoneId};
pub use hysteresis::{Decision, HoldReason, HysteresisGate};
pub use smoothing::Smoother;
