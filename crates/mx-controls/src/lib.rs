//! Control primitives for the mixflow batch process.
//!
//! Two controllers act on the mixer temperature:
//! - a **feed-forward** predictor that biases the setpoint once per batch to cover the
//!   heat the liquid will lose while it is pumped to storage
//! - a **dual-acting PID** whose signed output drives the heater (positive) or the
//!   cooler (negative)
//!
//! Both are plain numeric code with no knowledge of tanks or process states.

pub mod controller;
pub mod error;
pub mod feedforward;

pub use controller::{DualActingPid, DualActingPidController, DualPidState, PidGains};
pub use error::{ControlError, ControlResult};
pub use feedforward::ThermalFeedForward;
