//! Ambient environment and the passive heat-loss law.
//!
//! Tanks lose heat toward ambient at a rate proportional to their excess temperature.
//! The same law is used by the feed-forward predictor to back-calculate how much a
//! batch must be overheated to arrive at its target after transport.

use crate::error::MxResult;
use crate::numeric::{Real, ensure_finite, ensure_positive};

/// Ambient temperature and passive loss coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThermalEnvironment {
    /// Ambient temperature (°C). Nothing passively cools below it.
    pub ambient: Real,
    /// Passive cooling coefficient (1/s before the transport factor).
    pub cooling_k: Real,
    /// Multiplier modelling the extra loss of liquid in transport and holding.
    pub transport_factor: Real,
}

impl Default for ThermalEnvironment {
    fn default() -> Self {
        Self {
            ambient: 20.0,
            cooling_k: 0.0005,
            transport_factor: 20.0,
        }
    }
}

impl ThermalEnvironment {
    pub fn new(ambient: Real, cooling_k: Real, transport_factor: Real) -> MxResult<Self> {
        ensure_finite(ambient, "ambient")?;
        ensure_positive(cooling_k, "cooling_k")?;
        ensure_positive(transport_factor, "transport_factor")?;
        Ok(Self {
            ambient,
            cooling_k,
            transport_factor,
        })
    }

    /// Effective first-order loss rate (1/s).
    pub fn loss_rate(&self) -> Real {
        self.cooling_k * self.transport_factor
    }

    /// Temperature drop over `dt` for a body at `temperature` (explicit Euler step).
    pub fn passive_loss(&self, temperature: Real, dt: Real) -> Real {
        self.loss_rate() * (temperature - self.ambient) * dt
    }

    /// Apply one loss step and clamp at ambient.
    pub fn cool(&self, temperature: Real, dt: Real) -> Real {
        (temperature - self.passive_loss(temperature, dt)).max(self.ambient)
    }

    /// Fraction of the excess temperature that survives `seconds` of continuous loss.
    pub fn decay_over(&self, seconds: Real) -> Real {
        (-self.loss_rate() * seconds).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_loss_rate() {
        let env = ThermalEnvironment::default();
        assert!((env.loss_rate() - 0.01).abs() < 1e-15);
    }

    #[test]
    fn cool_never_drops_below_ambient() {
        let env = ThermalEnvironment::default();
        assert_eq!(env.cool(20.0, 0.05), 20.0);
        assert_eq!(env.cool(10.0, 0.05), 20.0);
        let t = env.cool(60.0, 0.05);
        assert!(t < 60.0 && t > 20.0);
    }

    #[test]
    fn decay_is_one_at_zero_time() {
        let env = ThermalEnvironment::default();
        assert_eq!(env.decay_over(0.0), 1.0);
        assert!(env.decay_over(7.5) < 1.0);
        assert_eq!(env.decay_over(1.0e6), 0.0);
    }

    #[test]
    fn rejects_bad_coefficients() {
        assert!(ThermalEnvironment::new(20.0, 0.0, 20.0).is_err());
        assert!(ThermalEnvironment::new(f64::NAN, 0.0005, 20.0).is_err());
        assert!(ThermalEnvironment::new(20.0, 0.0005, 20.0).is_ok());
    }
}
