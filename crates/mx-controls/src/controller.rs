//! Dual-acting (bipolar) PID controller.
//!
//! A single signed output drives two opposing actuators:
//! - positive output is a heating command
//! - negative output is a cooling command
//!
//! Anti-windup is a deadband on integration: the integral only accumulates while the
//! error is inside `integral_zone`, and is clamped to `integral_limit`. Far from the
//! setpoint the controller runs on proportional and derivative action alone.

use crate::error::{ControlError, ControlResult};
use mx_core::ensure_positive;
use serde::{Deserialize, Serialize};

/// Proportional, integral and derivative gains.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            kp: 15.0,
            ki: 0.8,
            kd: 5.0,
        }
    }
}

/// Dual-acting PID configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DualActingPid {
    pub gains: PidGains,
    /// Integration only happens while `|error| < integral_zone`.
    pub integral_zone: f64,
    /// Integral accumulator is clamped to `[-integral_limit, integral_limit]`.
    pub integral_limit: f64,
    /// Output is clamped to `[-output_limit, output_limit]`.
    pub output_limit: f64,
}

impl Default for DualActingPid {
    fn default() -> Self {
        Self {
            gains: PidGains::default(),
            integral_zone: 5.0,
            integral_limit: 50.0,
            output_limit: 100.0,
        }
    }
}

impl DualActingPid {
    /// Create a controller with the default zone and limits.
    pub fn new(gains: PidGains) -> ControlResult<Self> {
        Self {
            gains,
            ..Self::default()
        }
        .validated()
    }

    pub fn with_integral_zone(mut self, zone: f64) -> Self {
        self.integral_zone = zone;
        self
    }

    pub fn with_integral_limit(mut self, limit: f64) -> Self {
        self.integral_limit = limit;
        self
    }

    pub fn with_output_limit(mut self, limit: f64) -> Self {
        self.output_limit = limit;
        self
    }

    /// Check gains and limits, returning the configuration unchanged.
    pub fn validated(self) -> ControlResult<Self> {
        let PidGains { kp, ki, kd } = self.gains;
        if !(kp.is_finite() && ki.is_finite() && kd.is_finite()) {
            return Err(ControlError::InvalidArg {
                what: "gains must be finite",
            });
        }
        if kp < 0.0 || ki < 0.0 || kd < 0.0 {
            return Err(ControlError::InvalidArg {
                what: "gains must be non-negative",
            });
        }
        ensure_positive(self.integral_zone, "integral_zone")?;
        ensure_positive(self.integral_limit, "integral_limit")?;
        ensure_positive(self.output_limit, "output_limit")?;
        Ok(self)
    }

    /// Compute the signed actuation for one sample.
    ///
    /// `dt` must be finite and strictly positive; otherwise an error is returned and
    /// no state is produced.
    pub fn update(
        &self,
        state: &DualPidState,
        target: f64,
        current: f64,
        dt: f64,
    ) -> ControlResult<(DualPidState, f64)> {
        let dt = ensure_positive(dt, "dt")?;

        let error = target - current;
        let p_term = self.gains.kp * error;

        let mut integral = state.integral;
        if error.abs() < self.integral_zone {
            integral += error * dt;
        }
        let integral = integral.clamp(-self.integral_limit, self.integral_limit);
        let i_term = self.gains.ki * integral;

        let d_term = self.gains.kd * (error - state.prev_error) / dt;

        let output = (p_term + i_term + d_term).clamp(-self.output_limit, self.output_limit);

        Ok((
            DualPidState {
                integral,
                prev_error: error,
            },
            output,
        ))
    }
}

/// Dual-acting PID state.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DualPidState {
    /// Integral accumulator.
    pub integral: f64,
    /// Error seen on the previous sample (derivative history).
    pub prev_error: f64,
}

/// Configuration and state bundled into the stateful controller used by the process.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DualActingPidController {
    config: DualActingPid,
    state: DualPidState,
}

impl DualActingPidController {
    pub fn new(config: DualActingPid) -> Self {
        Self {
            config,
            state: DualPidState::default(),
        }
    }

    /// Signed command in `[-output_limit, output_limit]`; positive heats, negative cools.
    ///
    /// On error the internal state is left untouched.
    pub fn compute(&mut self, target: f64, current: f64, dt: f64) -> ControlResult<f64> {
        let (state, output) = self.config.update(&self.state, target, current, dt)?;
        self.state = state;
        Ok(output)
    }

    /// Clear integral and derivative history.
    pub fn reset(&mut self) {
        self.state = DualPidState::default();
    }

    pub fn state(&self) -> &DualPidState {
        &self.state
    }

    pub fn config(&self) -> &DualActingPid {
        &self.config
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn integral_and_output_stay_bounded(
            samples in prop::collection::vec((0.0_f64..120.0, 0.0_f64..120.0, 0.001_f64..2.0), 1..200)
        ) {
            let mut pid = DualActingPidController::new(DualActingPid::default());
            for (target, current, dt) in samples {
                let output = pid.compute(target, current, dt).unwrap();
                prop_assert!((-100.0..=100.0).contains(&output));
                prop_assert!((-50.0..=50.0).contains(&pid.state().integral));
            }
        }
    }
}
