//! Lumped, perfectly mixed liquid tank.
//!
//! Each tank holds a liquid volume at a single temperature. Liquid mixed in takes the
//! volume-weighted average temperature; an immersed heater or cooler changes the
//! temperature against a thermal inertia that grows with the volume; every step the
//! tank loses heat passively toward ambient.

use crate::actuator::ThermalActuation;
use crate::error::{SimError, SimResult};
use mx_core::{Real, ThermalEnvironment};
use serde::{Deserialize, Serialize};

/// Below this combined volume a mixing-in keeps the old temperature.
const MIN_MIX_VOLUME: Real = 0.001;

/// Heater and cooler ratings plus the inertia model of the liquid body.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeaterSpec {
    /// Temperature rise rate at full heater power, before inertia.
    pub heat_rate: Real,
    /// Temperature drop rate at full cooler power, before inertia.
    pub cool_rate: Real,
    /// Inertia contributed per unit of liquid volume.
    pub inertia_per_volume: Real,
    /// Inertia of the vessel itself.
    pub base_inertia: Real,
    /// Heater and cooler are only immersed above this level.
    pub min_level: Real,
}

impl Default for HeaterSpec {
    fn default() -> Self {
        Self {
            heat_rate: 45.0,
            cool_rate: 60.0,
            inertia_per_volume: 0.2,
            base_inertia: 2.0,
            min_level: 1.0,
        }
    }
}

impl HeaterSpec {
    pub fn inertia(&self, level: Real) -> Real {
        level * self.inertia_per_volume + self.base_inertia
    }
}

/// Level and temperature a tank is charged with at construction and on reset.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TankCharge {
    pub level: Real,
    pub temperature: Real,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Tank {
    name: String,
    capacity: Real,
    level: Real,
    temperature: Real,
    heater_power: Real,
    cooling_power: Real,
    environment: ThermalEnvironment,
    heater: HeaterSpec,
}

impl Tank {
    /// Create an empty tank at ambient temperature.
    pub fn new(
        name: impl Into<String>,
        capacity: Real,
        environment: ThermalEnvironment,
        heater: HeaterSpec,
    ) -> SimResult<Self> {
        if !(capacity.is_finite() && capacity > 0.0) {
            return Err(SimError::InvalidArg {
                what: "tank capacity must be positive",
            });
        }
        Ok(Self {
            name: name.into(),
            capacity,
            level: 0.0,
            temperature: environment.ambient,
            heater_power: 0.0,
            cooling_power: 0.0,
            environment,
            heater,
        })
    }

    /// Replace the contents with `charge`.
    pub fn with_charge(mut self, charge: TankCharge) -> SimResult<Self> {
        self.charge(charge)?;
        Ok(self)
    }

    /// Overwrite level and temperature, e.g. when restoring initial conditions.
    pub fn charge(&mut self, charge: TankCharge) -> SimResult<()> {
        if !(charge.level.is_finite() && charge.level >= 0.0 && charge.level <= self.capacity) {
            return Err(SimError::InvalidArg {
                what: "tank charge must be within [0, capacity]",
            });
        }
        if !charge.temperature.is_finite() {
            return Err(SimError::NonPhysical {
                what: "tank temperature must be finite",
            });
        }
        self.level = charge.level;
        self.temperature = charge.temperature;
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> Real {
        self.capacity
    }

    pub fn level(&self) -> Real {
        self.level
    }

    pub fn temperature(&self) -> Real {
        self.temperature
    }

    /// Operator override of the liquid temperature (feed tanks before a batch).
    pub fn set_temperature(&mut self, temperature: Real) {
        if temperature.is_finite() {
            self.temperature = temperature;
        }
    }

    pub fn heater_power(&self) -> Real {
        self.heater_power
    }

    pub fn cooling_power(&self) -> Real {
        self.cooling_power
    }

    pub fn actuation(&self) -> ThermalActuation {
        ThermalActuation::from_command(self.heater_power - self.cooling_power)
    }

    pub fn headroom(&self) -> Real {
        (self.capacity - self.level).max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.level <= 0.0
    }

    /// Set heater/cooler power for the next physics steps.
    pub fn apply(&mut self, actuation: ThermalActuation) {
        self.heater_power = actuation.heater();
        self.cooling_power = actuation.cooling();
    }

    pub fn shut_off(&mut self) {
        self.apply(ThermalActuation::OFF);
    }

    /// Mix `amount` of liquid at `incoming_temperature` into the tank.
    ///
    /// Returns `false` without changing anything when the tank would overflow, or when
    /// `amount` is negative or non-finite.
    pub fn add_liquid(&mut self, amount: Real, incoming_temperature: Real) -> bool {
        if !(amount.is_finite() && amount >= 0.0) {
            return false;
        }
        if self.level + amount > self.capacity {
            return false;
        }
        let old_level = self.level;
        let new_level = old_level + amount;
        if new_level > MIN_MIX_VOLUME {
            self.temperature =
                (old_level * self.temperature + amount * incoming_temperature) / new_level;
        }
        self.level = new_level;
        true
    }

    /// Remove up to `amount` and return what was actually removed.
    pub fn remove_liquid(&mut self, amount: Real) -> Real {
        if amount.is_nan() || amount <= 0.0 {
            return 0.0;
        }
        if self.level >= amount {
            self.level -= amount;
            amount
        } else {
            let removed = self.level;
            self.level = 0.0;
            removed
        }
    }

    /// Advance the thermal state by `dt` seconds.
    ///
    /// Heater and cooler only act on an immersed liquid body; passive loss toward
    /// ambient applies regardless of level. Both powers are applied when both are set.
    pub fn update_physics(&mut self, dt: Real) {
        if self.level > self.heater.min_level {
            let inertia = self.heater.inertia(self.level);
            if self.heater_power > 0.0 {
                self.temperature +=
                    (self.heater_power / 100.0) * self.heater.heat_rate * dt / inertia;
            }
            if self.cooling_power > 0.0 {
                self.temperature -=
                    (self.cooling_power / 100.0) * self.heater.cool_rate * dt / inertia;
            }
        }
        self.temperature = self.environment.cool(self.temperature, dt);
    }
}

/// Pump up to `amount` from `source` into `destination`.
///
/// The amount is limited by the source level and the destination headroom, so what
/// leaves the source always arrives at the destination. Returns the moved volume.
pub fn transfer(source: &mut Tank, destination: &mut Tank, amount: Real) -> Real {
    let requested = amount.min(destination.headroom());
    let moved = source.remove_liquid(requested);
    if moved <= 0.0 {
        return 0.0;
    }
    let temperature = source.temperature();
    if destination.add_liquid(moved, temperature) {
        moved
    } else {
        // Rounding at the capacity edge; hand the liquid back.
        source.level += moved;
        0.0
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn charged(level: Real, temperature: Real) -> Tank {
        Tank::new(
            "prop",
            500.0,
            ThermalEnvironment::default(),
            HeaterSpec::default(),
        )
        .unwrap()
        .with_charge(TankCharge { level, temperature })
        .unwrap()
    }

    proptest! {
        #[test]
        fn mixing_follows_weighted_average(
            level in 0.0_f64..250.0,
            t_old in 0.0_f64..100.0,
            amount in 0.0_f64..250.0,
            t_in in 0.0_f64..100.0,
        ) {
            let mut t = charged(level, t_old);
            prop_assert!(t.add_liquid(amount, t_in));
            let total = level + amount;
            if total > MIN_MIX_VOLUME {
                let expected = (level * t_old + amount * t_in) / total;
                prop_assert_eq!(t.temperature(), expected);
            } else {
                prop_assert_eq!(t.temperature(), t_old);
            }
            prop_assert_eq!(t.level(), total);
        }

        #[test]
        fn passive_cooling_decreases_toward_ambient(
            level in 0.0_f64..500.0,
            start in 21.0_f64..150.0,
            steps in 1_usize..200,
        ) {
            let mut t = charged(level, start);
            let mut previous = t.temperature();
            for _ in 0..steps {
                t.update_physics(0.05);
                prop_assert!(t.temperature() < previous);
                prop_assert!(t.temperature() >= 20.0);
                previous = t.temperature();
            }
        }

        #[test]
        fn transfers_conserve_total_volume(
            source_level in 0.0_f64..100.0,
            dest_level in 0.0_f64..100.0,
            amounts in prop::collection::vec(0.0_f64..5.0, 1..60),
        ) {
            let mut source = charged(source_level, 70.0);
            let mut dest = Tank::new("dest", 100.0, ThermalEnvironment::default(), HeaterSpec::default())
                .unwrap()
                .with_charge(TankCharge { level: dest_level, temperature: 30.0 })
                .unwrap();
            let total = source_level + dest_level;
            for amount in amounts {
                transfer(&mut source, &mut dest, amount);
                prop_assert!(dest.level() <= dest.capacity());
                prop_assert!((source.level() + dest.level() - total).abs() < 1e-9);
            }
        }
    }
}
