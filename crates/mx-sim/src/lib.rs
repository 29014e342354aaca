//! Batch mixing and heating process simulation.
//!
//! Provides:
//! - Lumped tank model with volume-weighted mixing, heater/cooler and passive loss
//! - Exclusive heater/cooler actuation driven by a dual-acting PID
//! - Process state machine with emergency stop, reset and operator setpoints
//! - Per-tick telemetry, operator event log and bounded trend history
//! - Headless batch runner with a tick-indexed command schedule

pub mod actuator;
pub mod clock;
pub mod command;
pub mod error;
pub mod process;
pub mod sim;
pub mod tank;
pub mod telemetry;

pub use actuator::{PumpStates, ThermalActuation};
pub use clock::SimClock;
pub use command::{Command, CommandSchedule};
pub use error::{SimError, SimResult};
pub use process::{
    Plant, ProcessController, ProcessSettings, ProcessState, SetpointRange, Setpoints,
    VesselLayout,
};
pub use sim::{RunOptions, RunProgress, RunRecord, run_batch, run_batch_with_progress};
pub use tank::{HeaterSpec, Tank, TankCharge, transfer};
pub use telemetry::{
    BatchReport, DeviationGrade, EventKind, EventLog, ProcessEvent, Severity, TankSnapshot,
    Telemetry, TrendHistory, TrendPoint,
};
