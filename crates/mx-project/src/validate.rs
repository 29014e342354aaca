//! Configuration validation logic.

use crate::schema::{FeedTankDef, LATEST_VERSION, ProcessConfig};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn positive(field: &str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, value, "must be positive"))
    }
}

fn finite(field: &str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(invalid(field, value, "must be finite"))
    }
}

fn ordered(field: &str, min: f64, max: f64) -> Result<(), ValidationError> {
    finite(field, min)?;
    finite(field, max)?;
    if min <= max {
        Ok(())
    } else {
        Err(invalid(field, format!("[{min}, {max}]"), "min must not exceed max"))
    }
}

pub fn validate_config(config: &ProcessConfig) -> Result<(), ValidationError> {
    if config.version == 0 || config.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: config.version,
        });
    }

    let plant = &config.plant;
    validate_feed("plant.feed_a", &plant.feed_a)?;
    validate_feed("plant.feed_b", &plant.feed_b)?;
    positive("plant.mixer_capacity", plant.mixer_capacity)?;
    positive("plant.storage_capacity", plant.storage_capacity)?;
    positive("plant.pump_speed", plant.pump_speed)?;
    positive("plant.batch_volume", plant.batch_volume)?;
    if plant.batch_volume > plant.mixer_capacity {
        return Err(invalid(
            "plant.batch_volume",
            plant.batch_volume,
            "exceeds mixer capacity",
        ));
    }

    let thermal = &config.thermal;
    finite("thermal.ambient_c", thermal.ambient_c)?;
    positive("thermal.cooling_k", thermal.cooling_k)?;
    positive("thermal.transport_factor", thermal.transport_factor)?;
    positive("thermal.tick_duration_s", thermal.tick_duration_s)?;

    let heater = &config.heater;
    positive("heater.heat_rate", heater.heat_rate)?;
    positive("heater.cool_rate", heater.cool_rate)?;
    positive("heater.inertia_per_volume", heater.inertia_per_volume)?;
    positive("heater.base_inertia", heater.base_inertia)?;
    if !(heater.min_level.is_finite() && heater.min_level >= 0.0) {
        return Err(invalid(
            "heater.min_level",
            heater.min_level,
            "must be non-negative",
        ));
    }

    let pid = &config.pid;
    for (field, gain) in [("pid.kp", pid.kp), ("pid.ki", pid.ki), ("pid.kd", pid.kd)] {
        if !(gain.is_finite() && gain >= 0.0) {
            return Err(invalid(field, gain, "gains must be non-negative"));
        }
    }
    positive("pid.integral_zone", pid.integral_zone)?;
    positive("pid.integral_limit", pid.integral_limit)?;
    positive("pid.output_limit", pid.output_limit)?;
    positive("pid.arrival_band_c", pid.arrival_band_c)?;

    let operator = &config.operator;
    ordered(
        "operator.target range",
        operator.target_min_c,
        operator.target_max_c,
    )?;
    ordered("operator.feed range", operator.feed_min_c, operator.feed_max_c)?;
    finite("operator.feed_a_c", operator.feed_a_c)?;
    finite("operator.feed_b_c", operator.feed_b_c)?;
    finite("operator.target_c", operator.target_c)?;
    if operator.trend_capacity == 0 {
        return Err(invalid(
            "operator.trend_capacity",
            operator.trend_capacity,
            "must be positive",
        ));
    }

    Ok(())
}

fn validate_feed(field: &str, feed: &FeedTankDef) -> Result<(), ValidationError> {
    positive(&format!("{field}.capacity"), feed.capacity)?;
    if !(feed.initial_level.is_finite() && feed.initial_level >= 0.0) {
        return Err(invalid(
            &format!("{field}.initial_level"),
            feed.initial_level,
            "must be non-negative",
        ));
    }
    if feed.initial_level > feed.capacity {
        return Err(invalid(
            &format!("{field}.initial_level"),
            feed.initial_level,
            "exceeds tank capacity",
        ));
    }
    finite(
        &format!("{field}.initial_temperature_c"),
        feed.initial_temperature_c,
    )
}
