//! Simulation clock driven by caller-supplied time steps.
//!
//! The clock has no notion of wall time or frame rate: whoever drives the process
//! decides the step size and how often to call `tick`.

use mx_core::{Time, format_hms, s};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SimClock {
    /// Number of completed ticks.
    pub ticks: u64,
    /// Accumulated simulated time (seconds).
    pub elapsed_s: f64,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one tick of `dt` seconds.
    pub fn advance(&mut self, dt: f64) {
        self.ticks += 1;
        self.elapsed_s += dt;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn elapsed(&self) -> Time {
        s(self.elapsed_s)
    }

    /// Elapsed time as `h:mm:ss`.
    pub fn display(&self) -> String {
        format_hms(self.elapsed())
    }
}
