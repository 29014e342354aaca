//! Configuration schema definitions.
//!
//! Every section and field has a default, so a file only needs to name what differs
//! from the standard plant.

use crate::ProjectResult;
use crate::validate::validate_config;
use mx_controls::{DualActingPid, PidGains};
use mx_core::ThermalEnvironment;
use mx_sim::{
    HeaterSpec, ProcessController, ProcessSettings, SetpointRange, Setpoints, TankCharge,
    VesselLayout,
};
use serde::{Deserialize, Serialize};

pub const LATEST_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessConfig {
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub plant: PlantDef,
    #[serde(default)]
    pub thermal: ThermalDef,
    #[serde(default)]
    pub heater: HeaterDef,
    #[serde(default)]
    pub pid: PidDef,
    #[serde(default)]
    pub operator: OperatorDef,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            version: LATEST_VERSION,
            name: "Standard batch".to_string(),
            plant: PlantDef::default(),
            thermal: ThermalDef::default(),
            heater: HeaterDef::default(),
            pid: PidDef::default(),
            operator: OperatorDef::default(),
        }
    }
}

/// Vessels and transfer pumps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlantDef {
    pub feed_a: FeedTankDef,
    pub feed_b: FeedTankDef,
    pub mixer_capacity: f64,
    pub storage_capacity: f64,
    /// Volume moved per tick by each running pump.
    pub pump_speed: f64,
    /// Mixer level at which filling stops.
    pub batch_volume: f64,
}

impl Default for PlantDef {
    fn default() -> Self {
        Self {
            feed_a: FeedTankDef {
                capacity: 100.0,
                initial_level: 90.0,
                initial_temperature_c: 20.0,
            },
            feed_b: FeedTankDef {
                capacity: 100.0,
                initial_level: 90.0,
                initial_temperature_c: 90.0,
            },
            mixer_capacity: 200.0,
            storage_capacity: 300.0,
            pump_speed: 1.0,
            batch_volume: 150.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedTankDef {
    pub capacity: f64,
    pub initial_level: f64,
    pub initial_temperature_c: f64,
}

/// Ambient and passive loss model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThermalDef {
    pub ambient_c: f64,
    pub cooling_k: f64,
    pub transport_factor: f64,
    /// Pump cycle length assumed by the feed-forward transport model.
    pub tick_duration_s: f64,
}

impl Default for ThermalDef {
    fn default() -> Self {
        let env = ThermalEnvironment::default();
        Self {
            ambient_c: env.ambient,
            cooling_k: env.cooling_k,
            transport_factor: env.transport_factor,
            tick_duration_s: 0.05,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HeaterDef {
    pub heat_rate: f64,
    pub cool_rate: f64,
    pub inertia_per_volume: f64,
    pub base_inertia: f64,
    pub min_level: f64,
}

impl Default for HeaterDef {
    fn default() -> Self {
        let spec = HeaterSpec::default();
        Self {
            heat_rate: spec.heat_rate,
            cool_rate: spec.cool_rate,
            inertia_per_volume: spec.inertia_per_volume,
            base_inertia: spec.base_inertia,
            min_level: spec.min_level,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PidDef {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub integral_zone: f64,
    pub integral_limit: f64,
    pub output_limit: f64,
    /// Heating ends when the mixer is this close to the corrected setpoint.
    pub arrival_band_c: f64,
}

impl Default for PidDef {
    fn default() -> Self {
        let pid = DualActingPid::default();
        Self {
            kp: pid.gains.kp,
            ki: pid.gains.ki,
            kd: pid.gains.kd,
            integral_zone: pid.integral_zone,
            integral_limit: pid.integral_limit,
            output_limit: pid.output_limit,
            arrival_band_c: 0.1,
        }
    }
}

/// Operator panel defaults and input limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OperatorDef {
    pub feed_a_c: f64,
    pub feed_b_c: f64,
    pub target_c: f64,
    pub target_min_c: f64,
    pub target_max_c: f64,
    pub feed_min_c: f64,
    pub feed_max_c: f64,
    pub trend_capacity: usize,
}

impl Default for OperatorDef {
    fn default() -> Self {
        let settings = ProcessSettings::default();
        Self {
            feed_a_c: settings.setpoints.feed_a,
            feed_b_c: settings.setpoints.feed_b,
            target_c: settings.setpoints.target,
            target_min_c: settings.target_range.min,
            target_max_c: settings.target_range.max,
            feed_min_c: settings.feed_range.min,
            feed_max_c: settings.feed_range.max,
            trend_capacity: settings.trend_capacity,
        }
    }
}

impl ProcessConfig {
    /// Map the file representation onto simulation settings.
    pub fn to_settings(&self) -> ProcessSettings {
        let plant = &self.plant;
        ProcessSettings {
            environment: ThermalEnvironment {
                ambient: self.thermal.ambient_c,
                cooling_k: self.thermal.cooling_k,
                transport_factor: self.thermal.transport_factor,
            },
            heater: HeaterSpec {
                heat_rate: self.heater.heat_rate,
                cool_rate: self.heater.cool_rate,
                inertia_per_volume: self.heater.inertia_per_volume,
                base_inertia: self.heater.base_inertia,
                min_level: self.heater.min_level,
            },
            vessels: VesselLayout {
                feed_a_capacity: plant.feed_a.capacity,
                feed_b_capacity: plant.feed_b.capacity,
                mixer_capacity: plant.mixer_capacity,
                storage_capacity: plant.storage_capacity,
                feed_a_initial: TankCharge {
                    level: plant.feed_a.initial_level,
                    temperature: plant.feed_a.initial_temperature_c,
                },
                feed_b_initial: TankCharge {
                    level: plant.feed_b.initial_level,
                    temperature: plant.feed_b.initial_temperature_c,
                },
            },
            pid: DualActingPid {
                gains: PidGains {
                    kp: self.pid.kp,
                    ki: self.pid.ki,
                    kd: self.pid.kd,
                },
                integral_zone: self.pid.integral_zone,
                integral_limit: self.pid.integral_limit,
                output_limit: self.pid.output_limit,
            },
            pump_speed: plant.pump_speed,
            tick_duration: self.thermal.tick_duration_s,
            batch_volume: plant.batch_volume,
            arrival_band: self.pid.arrival_band_c,
            trend_capacity: self.operator.trend_capacity,
            target_range: SetpointRange {
                min: self.operator.target_min_c,
                max: self.operator.target_max_c,
            },
            feed_range: SetpointRange {
                min: self.operator.feed_min_c,
                max: self.operator.feed_max_c,
            },
            setpoints: Setpoints {
                feed_a: self.operator.feed_a_c,
                feed_b: self.operator.feed_b_c,
                target: self.operator.target_c,
            },
        }
    }

    /// Validate and wire a ready-to-run controller.
    pub fn build_controller(&self) -> ProjectResult<ProcessController> {
        validate_config(self)?;
        Ok(ProcessController::new(self.to_settings())?)
    }
}
