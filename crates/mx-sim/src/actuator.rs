//! Heater/cooler actuation and pump flags.
//!
//! The dual-acting controller emits one signed command. [`ThermalActuation`] is the only
//! way to turn that command into heater and cooler power, and it always leaves the
//! non-chosen side at zero.

use serde::{Deserialize, Serialize};

/// Heater and cooler power pair (percent), at most one side nonzero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ThermalActuation {
    heater: f64,
    cooling: f64,
}

impl ThermalActuation {
    pub const OFF: Self = Self {
        heater: 0.0,
        cooling: 0.0,
    };

    /// Split a signed command: positive drives the heater, negative the cooler.
    ///
    /// The command is clamped to `[-100, 100]`; non-finite commands switch both off.
    pub fn from_command(command: f64) -> Self {
        if !command.is_finite() {
            return Self::OFF;
        }
        let command = command.clamp(-100.0, 100.0);
        if command > 0.0 {
            Self {
                heater: command,
                cooling: 0.0,
            }
        } else {
            Self {
                heater: 0.0,
                cooling: command.abs(),
            }
        }
    }

    pub fn heater(&self) -> f64 {
        self.heater
    }

    pub fn cooling(&self) -> f64 {
        self.cooling
    }

    /// Heater minus cooler power, the value plotted as the control variable.
    pub fn net(&self) -> f64 {
        self.heater - self.cooling
    }

    pub fn is_off(&self) -> bool {
        self.heater == 0.0 && self.cooling == 0.0
    }
}

/// On/off flags of the three transfer pumps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PumpStates {
    pub feed_a: bool,
    pub feed_b: bool,
    pub output: bool,
}

impl PumpStates {
    pub const ALL_OFF: Self = Self {
        feed_a: false,
        feed_b: false,
        output: false,
    };

    pub fn any_on(&self) -> bool {
        self.feed_a || self.feed_b || self.output
    }
}
