//! Feed-forward thermal predictor.
//!
//! A batch pumped out of the mixer keeps losing heat on its way to storage. The
//! predictor models that trip as `volume / pump_speed` pump cycles of `tick_duration`
//! seconds under the passive loss law, and returns the mixer setpoint whose
//! exponentially decayed excess over ambient equals the excess of the requested target:
//!
//! ```text
//! required = ambient + (target - ambient) / exp(-k * f * t_transport)
//! ```

use crate::error::ControlResult;
use mx_core::{Real, ThermalEnvironment, Time, ensure_positive, s};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalFeedForward {
    pub environment: ThermalEnvironment,
    /// Volume moved per pump cycle.
    pub pump_speed: Real,
    /// Duration of one pump cycle (seconds).
    pub tick_duration: Real,
}

impl Default for ThermalFeedForward {
    fn default() -> Self {
        Self {
            environment: ThermalEnvironment::default(),
            pump_speed: 1.0,
            tick_duration: 0.05,
        }
    }
}

impl ThermalFeedForward {
    pub fn new(
        environment: ThermalEnvironment,
        pump_speed: Real,
        tick_duration: Real,
    ) -> ControlResult<Self> {
        ensure_positive(pump_speed, "pump_speed")?;
        ensure_positive(tick_duration, "tick_duration")?;
        Ok(Self {
            environment,
            pump_speed,
            tick_duration,
        })
    }

    /// Time the batch spends being pumped out.
    pub fn transport_time(&self, volume: Real) -> Time {
        let cycles = volume.max(0.0) / self.pump_speed;
        s(cycles * self.tick_duration)
    }

    /// Setpoint the mixer must reach so the batch arrives at `target_temperature`.
    ///
    /// Returns the target unchanged for an empty batch, and when the predicted decay
    /// underflows to zero (the loss cannot be compensated).
    pub fn calculate_required_temp(&self, target_temperature: Real, volume: Real) -> Real {
        if volume <= 0.0 {
            return target_temperature;
        }
        let cycles = volume / self.pump_speed;
        let seconds = cycles * self.tick_duration;
        let decay = self.environment.decay_over(seconds);
        if decay == 0.0 {
            return target_temperature;
        }
        let ambient = self.environment.ambient;
        ambient + (target_temperature - ambient) / decay
    }

    /// Overheat margin added on top of the target.
    pub fn correction(&self, target_temperature: Real, volume: Real) -> Real {
        self.calculate_required_temp(target_temperature, volume) - target_temperature
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mx_core::seconds;

    #[test]
    fn empty_batch_needs_no_correction() {
        let ff = ThermalFeedForward::default();
        assert_eq!(ff.calculate_required_temp(60.0, 0.0), 60.0);
        assert_eq!(ff.calculate_required_temp(60.0, -5.0), 60.0);
    }

    #[test]
    fn standard_batch_correction() {
        let ff = ThermalFeedForward::default();
        // 150 cycles * 0.05 s = 7.5 s, decay = exp(-0.075)
        let expected = 20.0 + 40.0 / (-0.075_f64).exp();
        let required = ff.calculate_required_temp(60.0, 150.0);
        assert!((required - expected).abs() < 1e-9);
        assert!((ff.correction(60.0, 150.0) - 3.1153).abs() < 1e-3);
    }

    #[test]
    fn target_at_ambient_is_unchanged() {
        let ff = ThermalFeedForward::default();
        assert!((ff.calculate_required_temp(20.0, 150.0) - 20.0).abs() < 1e-12);
    }

    #[test]
    fn underflowed_decay_returns_target() {
        let ff = ThermalFeedForward::default();
        assert_eq!(ff.calculate_required_temp(60.0, 1.0e9), 60.0);
    }

    #[test]
    fn larger_batches_need_more_overheat() {
        let ff = ThermalFeedForward::default();
        assert!(ff.correction(60.0, 180.0) > ff.correction(60.0, 100.0));
    }

    #[test]
    fn transport_time_follows_pump_speed() {
        let ff = ThermalFeedForward::new(ThermalEnvironment::default(), 2.0, 0.05).unwrap();
        assert!((seconds(ff.transport_time(150.0)) - 3.75).abs() < 1e-12);
        assert!(ThermalFeedForward::new(ThermalEnvironment::default(), 0.0, 0.05).is_err());
    }
}
