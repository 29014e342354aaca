//! Batch process state machine.
//!
//! Sequence: `Idle -> Filling -> Calculating -> Heating -> Emptying -> Done`.
//!
//! Every tick first advances the physics of all four tanks with the actuator powers
//! chosen on the previous tick, then evaluates the state machine. The emergency stop
//! is a flag orthogonal to the state: while it is set the state logic is skipped and
//! all actuators are forced off, but physics keeps running so the liquid cools.

use crate::actuator::{PumpStates, ThermalActuation};
use crate::clock::SimClock;
use crate::command::Command;
use crate::error::{SimError, SimResult};
use crate::tank::{HeaterSpec, Tank, TankCharge, transfer};
use crate::telemetry::{
    BatchReport, EventKind, EventLog, ProcessEvent, Severity, TankSnapshot, Telemetry,
    TrendHistory, TrendPoint,
};
use mx_controls::{DualActingPid, DualActingPidController, DualPidState, ThermalFeedForward};
use mx_core::{ThermalEnvironment, seconds};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProcessState {
    #[default]
    Idle,
    Filling,
    Calculating,
    Heating,
    Emptying,
    Done,
}

impl ProcessState {
    /// A new batch may only be started from here; pause/resume are refused here.
    pub fn is_at_rest(self) -> bool {
        matches!(self, ProcessState::Idle | ProcessState::Done)
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProcessState::Idle => "IDLE",
            ProcessState::Filling => "FILLING",
            ProcessState::Calculating => "CALCULATING",
            ProcessState::Heating => "HEATING",
            ProcessState::Emptying => "EMPTYING",
            ProcessState::Done => "DONE",
        };
        f.write_str(label)
    }
}

/// Operator-entered temperatures (°C).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Setpoints {
    pub feed_a: f64,
    pub feed_b: f64,
    pub target: f64,
}

impl Default for Setpoints {
    fn default() -> Self {
        Self {
            feed_a: 15.0,
            feed_b: 95.0,
            target: 60.0,
        }
    }
}

/// Closed interval an operator input is clamped into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SetpointRange {
    pub min: f64,
    pub max: f64,
}

impl SetpointRange {
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// Capacities and initial charges of the four vessels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VesselLayout {
    pub feed_a_capacity: f64,
    pub feed_b_capacity: f64,
    pub mixer_capacity: f64,
    pub storage_capacity: f64,
    pub feed_a_initial: TankCharge,
    pub feed_b_initial: TankCharge,
}

impl Default for VesselLayout {
    fn default() -> Self {
        Self {
            feed_a_capacity: 100.0,
            feed_b_capacity: 100.0,
            mixer_capacity: 200.0,
            storage_capacity: 300.0,
            feed_a_initial: TankCharge {
                level: 90.0,
                temperature: 20.0,
            },
            feed_b_initial: TankCharge {
                level: 90.0,
                temperature: 90.0,
            },
        }
    }
}

/// Everything needed to build a [`ProcessController`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSettings {
    pub environment: ThermalEnvironment,
    pub heater: HeaterSpec,
    pub vessels: VesselLayout,
    pub pid: DualActingPid,
    /// Volume each running pump moves per tick.
    pub pump_speed: f64,
    /// Nominal tick length used by the feed-forward transport model (seconds).
    pub tick_duration: f64,
    /// Mixer level at which filling stops.
    pub batch_volume: f64,
    /// Heating ends once the mixer is this close to the corrected setpoint.
    pub arrival_band: f64,
    pub trend_capacity: usize,
    pub target_range: SetpointRange,
    pub feed_range: SetpointRange,
    pub setpoints: Setpoints,
}

impl Default for ProcessSettings {
    fn default() -> Self {
        Self {
            environment: ThermalEnvironment::default(),
            heater: HeaterSpec::default(),
            vessels: VesselLayout::default(),
            pid: DualActingPid::default(),
            pump_speed: 1.0,
            tick_duration: 0.05,
            batch_volume: 150.0,
            arrival_band: 0.1,
            trend_capacity: 400,
            target_range: SetpointRange {
                min: 20.0,
                max: 95.0,
            },
            feed_range: SetpointRange {
                min: 0.0,
                max: 99.99,
            },
            setpoints: Setpoints::default(),
        }
    }
}

impl ProcessSettings {
    pub fn validate(&self) -> SimResult<()> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.pump_speed) {
            return Err(SimError::InvalidArg {
                what: "pump_speed must be positive",
            });
        }
        if !positive(self.tick_duration) {
            return Err(SimError::InvalidArg {
                what: "tick_duration must be positive",
            });
        }
        if !positive(self.arrival_band) {
            return Err(SimError::InvalidArg {
                what: "arrival_band must be positive",
            });
        }
        if !positive(self.batch_volume) || self.batch_volume > self.vessels.mixer_capacity {
            return Err(SimError::InvalidArg {
                what: "batch_volume must be positive and fit in the mixer",
            });
        }
        if self.trend_capacity == 0 {
            return Err(SimError::InvalidArg {
                what: "trend_capacity must be positive",
            });
        }
        for range in [self.target_range, self.feed_range] {
            if !(range.min.is_finite() && range.max.is_finite() && range.min <= range.max) {
                return Err(SimError::InvalidArg {
                    what: "setpoint range must be finite and ordered",
                });
            }
        }
        Ok(())
    }
}

/// The four vessels of the plant.
#[derive(Debug, Clone, PartialEq)]
pub struct Plant {
    pub feed_a: Tank,
    pub feed_b: Tank,
    pub mixer: Tank,
    pub storage: Tank,
}

impl Plant {
    pub fn build(settings: &ProcessSettings) -> SimResult<Self> {
        let env = settings.environment;
        let heater = settings.heater;
        let v = &settings.vessels;
        Ok(Self {
            feed_a: Tank::new("FEED A", v.feed_a_capacity, env, heater)?
                .with_charge(v.feed_a_initial)?,
            feed_b: Tank::new("FEED B", v.feed_b_capacity, env, heater)?
                .with_charge(v.feed_b_initial)?,
            mixer: Tank::new("MIXER", v.mixer_capacity, env, heater)?,
            storage: Tank::new("STORAGE", v.storage_capacity, env, heater)?,
        })
    }

    pub fn tanks(&self) -> [&Tank; 4] {
        [&self.feed_a, &self.feed_b, &self.mixer, &self.storage]
    }

    fn tanks_mut(&mut self) -> [&mut Tank; 4] {
        [
            &mut self.feed_a,
            &mut self.feed_b,
            &mut self.mixer,
            &mut self.storage,
        ]
    }

    pub fn total_volume(&self) -> f64 {
        self.tanks().iter().map(|t| t.level()).sum()
    }
}

#[derive(Debug, Clone)]
pub struct ProcessController {
    settings: ProcessSettings,
    plant: Plant,
    initial_plant: Plant,
    pid: DualActingPidController,
    feed_forward: ThermalFeedForward,
    setpoints: Setpoints,
    state: ProcessState,
    paused: bool,
    calculated_target: f64,
    pumps: PumpStates,
    clock: SimClock,
    trend: TrendHistory,
    log: EventLog,
    pending: Vec<ProcessEvent>,
    report: Option<BatchReport>,
    storage_blocked: bool,
}

impl ProcessController {
    pub fn new(settings: ProcessSettings) -> SimResult<Self> {
        settings.validate()?;
        let plant = Plant::build(&settings)?;
        let pid = DualActingPidController::new(settings.pid.clone().validated()?);
        let feed_forward = ThermalFeedForward::new(
            settings.environment,
            settings.pump_speed,
            settings.tick_duration,
        )?;
        Ok(Self {
            setpoints: Setpoints {
                feed_a: settings.feed_range.clamp(settings.setpoints.feed_a),
                feed_b: settings.feed_range.clamp(settings.setpoints.feed_b),
                target: settings.target_range.clamp(settings.setpoints.target),
            },
            trend: TrendHistory::new(settings.trend_capacity),
            initial_plant: plant.clone(),
            plant,
            pid,
            feed_forward,
            state: ProcessState::Idle,
            paused: false,
            calculated_target: 0.0,
            pumps: PumpStates::ALL_OFF,
            clock: SimClock::new(),
            log: EventLog::new(),
            pending: Vec::new(),
            report: None,
            storage_blocked: false,
            settings,
        })
    }

    pub fn settings(&self) -> &ProcessSettings {
        &self.settings
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Feed-forward corrected setpoint, only meaningful while heating.
    pub fn calculated_target(&self) -> Option<f64> {
        (self.state == ProcessState::Heating).then_some(self.calculated_target)
    }

    pub fn plant(&self) -> &Plant {
        &self.plant
    }

    pub fn pumps(&self) -> PumpStates {
        self.pumps
    }

    pub fn setpoints(&self) -> Setpoints {
        self.setpoints
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub fn pid_state(&self) -> &DualPidState {
        self.pid.state()
    }

    pub fn trend(&self) -> &TrendHistory {
        &self.trend
    }

    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    pub fn report(&self) -> Option<&BatchReport> {
        self.report.as_ref()
    }

    /// Apply an operator command. Returns whether it was accepted.
    pub fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Start {
                feed_a_temp,
                feed_b_temp,
                target_temp,
            } => self.start(feed_a_temp, feed_b_temp, target_temp),
            Command::Pause => self.pause(),
            Command::Resume => self.resume(),
            Command::Reset => {
                self.reset();
                true
            }
            Command::SetTarget { temperature } => self.set_target(temperature),
            Command::SetFeedTemperatures { feed_a, feed_b } => {
                self.set_feed_temperatures(feed_a, feed_b)
            }
        }
    }

    pub fn start(&mut self, feed_a_temp: f64, feed_b_temp: f64, target_temp: f64) -> bool {
        if !self.state.is_at_rest() {
            self.reject("start", "a batch is already running");
            return false;
        }
        if ![feed_a_temp, feed_b_temp, target_temp]
            .iter()
            .all(|v| v.is_finite())
        {
            self.reject("start", "temperatures must be finite");
            return false;
        }
        if self.plant.feed_a.is_empty() && self.plant.feed_b.is_empty() {
            self.reject("start", "feed tanks are empty, reset required");
            return false;
        }

        self.setpoints = Setpoints {
            feed_a: self.settings.feed_range.clamp(feed_a_temp),
            feed_b: self.settings.feed_range.clamp(feed_b_temp),
            target: self.settings.target_range.clamp(target_temp),
        };
        self.plant.feed_a.set_temperature(self.setpoints.feed_a);
        self.plant.feed_b.set_temperature(self.setpoints.feed_b);

        self.trend.clear();
        self.pid.reset();
        self.clock.reset();
        self.log.clear();
        self.report = None;
        self.storage_blocked = false;
        self.paused = false;

        info!(
            feed_a = self.setpoints.feed_a,
            feed_b = self.setpoints.feed_b,
            target = self.setpoints.target,
            "batch started"
        );
        self.emit(EventKind::System, Severity::Info, "process started");
        self.transition(ProcessState::Filling);
        true
    }

    /// Emergency stop. Idempotent; refused when no batch is running.
    pub fn pause(&mut self) -> bool {
        if self.state.is_at_rest() {
            self.reject("pause", "no batch is running");
            return false;
        }
        self.freeze();
        if !self.paused {
            self.paused = true;
            warn!(state = %self.state, "emergency stop");
            self.emit(EventKind::System, Severity::Alarm, "EMERGENCY STOP");
        }
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.state.is_at_rest() {
            self.reject("resume", "no batch is running");
            return false;
        }
        if self.paused {
            self.paused = false;
            info!(state = %self.state, "process resumed");
            self.emit(EventKind::System, Severity::Info, "process resumed");
        }
        true
    }

    /// Return to the freshly constructed plant and state. Accepted from any state.
    ///
    /// A reset of an already fresh controller changes nothing, event log included.
    pub fn reset(&mut self) {
        if self.is_fresh() {
            debug!("reset ignored, controller already fresh");
            return;
        }
        self.plant = self.initial_plant.clone();
        self.state = ProcessState::Idle;
        self.paused = false;
        self.calculated_target = 0.0;
        self.pumps = PumpStates::ALL_OFF;
        self.pid.reset();
        self.clock.reset();
        self.trend.clear();
        self.report = None;
        self.storage_blocked = false;
        info!("full reset");
        self.emit(EventKind::System, Severity::Info, "full reset");
    }

    /// Nothing has happened since construction or the last reset.
    fn is_fresh(&self) -> bool {
        self.state == ProcessState::Idle
            && !self.paused
            && self.plant == self.initial_plant
            && self.clock == SimClock::default()
            && self.trend.is_empty()
            && self.report.is_none()
            && *self.pid.state() == DualPidState::default()
            && self.calculated_target == 0.0
            && !self.pumps.any_on()
            && !self.storage_blocked
    }

    pub fn set_target(&mut self, temperature: f64) -> bool {
        if !temperature.is_finite() {
            self.reject("set-target", "temperature must be finite");
            return false;
        }
        self.setpoints.target = self.settings.target_range.clamp(temperature);
        debug!(target = self.setpoints.target, "target updated");
        true
    }

    pub fn set_feed_temperatures(&mut self, feed_a: f64, feed_b: f64) -> bool {
        if !(feed_a.is_finite() && feed_b.is_finite()) {
            self.reject("set-feed-temperatures", "temperatures must be finite");
            return false;
        }
        self.setpoints.feed_a = self.settings.feed_range.clamp(feed_a);
        self.setpoints.feed_b = self.settings.feed_range.clamp(feed_b);
        debug!(
            feed_a = self.setpoints.feed_a,
            feed_b = self.setpoints.feed_b,
            "feed temperatures updated"
        );
        true
    }

    /// Advance the process by one step of `dt` seconds.
    pub fn tick(&mut self, dt: f64) -> SimResult<Telemetry> {
        check_dt(dt)?;
        self.clock.advance(dt);

        for tank in self.plant.tanks_mut() {
            tank.update_physics(dt);
        }

        if self.paused {
            self.freeze();
        } else {
            self.step_state(dt)?;
        }

        let point = self.trend_point();
        self.trend.push(point);
        Ok(self.snapshot(point))
    }

    fn step_state(&mut self, dt: f64) -> SimResult<()> {
        let pump = self.settings.pump_speed;
        match self.state {
            ProcessState::Idle => {}
            ProcessState::Filling => {
                self.pumps.feed_a = true;
                self.pumps.feed_b = true;
                transfer(&mut self.plant.feed_a, &mut self.plant.mixer, pump);
                transfer(&mut self.plant.feed_b, &mut self.plant.mixer, pump);

                let mixer = &self.plant.mixer;
                let feeds_empty = self.plant.feed_a.is_empty() && self.plant.feed_b.is_empty();
                if mixer.level() >= self.settings.batch_volume
                    || feeds_empty
                    || mixer.headroom() <= 0.0
                {
                    self.transition(ProcessState::Calculating);
                }
            }
            ProcessState::Calculating => {
                self.pumps.feed_a = false;
                self.pumps.feed_b = false;

                let volume = self.plant.mixer.level();
                if volume <= self.settings.heater.min_level {
                    warn!(volume, "mixer too low to heat, draining directly");
                    self.emit(
                        EventKind::Calculation,
                        Severity::Warning,
                        format!("heating skipped: mixer level {volume:.2} below heater"),
                    );
                    self.transition(ProcessState::Emptying);
                    return Ok(());
                }

                let target = self.setpoints.target;
                self.calculated_target = self
                    .feed_forward
                    .calculate_required_temp(target, volume);
                let correction = self.feed_forward.correction(target, volume);
                debug!(
                    volume,
                    target,
                    required = self.calculated_target,
                    transport_s = seconds(self.feed_forward.transport_time(volume)),
                    "feed-forward setpoint"
                );
                self.emit(
                    EventKind::Calculation,
                    Severity::Info,
                    format!("loss correction: {correction:+.2} °C"),
                );
                self.transition(ProcessState::Heating);
            }
            ProcessState::Heating => {
                let current = self.plant.mixer.temperature();
                let output = self.pid.compute(self.calculated_target, current, dt)?;
                self.plant
                    .mixer
                    .apply(ThermalActuation::from_command(output));

                let arrived = (self.plant.mixer.temperature() - self.calculated_target).abs()
                    < self.settings.arrival_band;
                if arrived {
                    self.transition(ProcessState::Emptying);
                    self.plant.mixer.shut_off();
                }
            }
            ProcessState::Emptying => {
                self.pumps.output = true;
                let moved = transfer(&mut self.plant.mixer, &mut self.plant.storage, pump);
                if moved > 0.0 {
                    self.storage_blocked = false;
                } else if !self.plant.mixer.is_empty() && !self.storage_blocked {
                    self.storage_blocked = true;
                    warn!(
                        storage = self.plant.storage.level(),
                        "storage full, draining halted"
                    );
                    self.emit(
                        EventKind::System,
                        Severity::Alarm,
                        "storage full, draining halted",
                    );
                }
                if self.plant.mixer.is_empty() {
                    self.transition(ProcessState::Done);
                }
            }
            ProcessState::Done => {
                self.pumps = PumpStates::ALL_OFF;
                if self.report.is_none() {
                    let storage = &self.plant.storage;
                    let report = BatchReport::new(
                        storage.temperature(),
                        storage.level(),
                        self.setpoints.target,
                    );
                    info!(
                        final_temperature = report.final_temperature,
                        deviation = report.deviation,
                        grade = %report.grade,
                        plant_volume = self.plant.total_volume(),
                        "batch complete"
                    );
                    self.emit(
                        EventKind::Completion,
                        Severity::Success,
                        format!("final temperature: {:.2} °C", report.final_temperature),
                    );
                    self.report = Some(report);
                }
            }
        }
        Ok(())
    }

    /// Force every actuator and pump off.
    fn freeze(&mut self) {
        for tank in self.plant.tanks_mut() {
            tank.shut_off();
        }
        self.pumps = PumpStates::ALL_OFF;
    }

    fn transition(&mut self, to: ProcessState) {
        info!(from = %self.state, to = %to, t = self.clock.elapsed_s, "state change");
        self.state = to;
        self.emit(EventKind::StateChange, Severity::Info, to.to_string());
    }

    fn reject(&mut self, command: &'static str, reason: &str) {
        warn!(command, reason, state = %self.state, "command ignored");
        self.emit(
            EventKind::System,
            Severity::Warning,
            format!("{command} ignored: {reason}"),
        );
    }

    fn emit(&mut self, kind: EventKind, severity: Severity, message: impl Into<String>) {
        let event = ProcessEvent {
            sim_time_s: self.clock.elapsed_s,
            kind,
            severity,
            message: message.into(),
        };
        self.log.push(event.clone());
        self.pending.push(event);
    }

    fn trend_point(&self) -> TrendPoint {
        let mixer = &self.plant.mixer;
        TrendPoint {
            pv: mixer.temperature(),
            sp: self.calculated_target().unwrap_or(self.setpoints.target),
            cv: mixer.heater_power() - mixer.cooling_power(),
        }
    }

    /// Operator status line for the current state.
    pub fn status_line(&self) -> String {
        if self.paused {
            return "!!! EMERGENCY STOP - COOLING DOWN !!!".to_string();
        }
        match self.state {
            ProcessState::Idle => "SYSTEM READY".to_string(),
            ProcessState::Filling => ">> FILLING MIXER".to_string(),
            ProcessState::Calculating => ">> CALCULATING LOSS CORRECTION".to_string(),
            ProcessState::Heating => format!(
                ">> PID REGULATION (TARGET: {:.1}°C)",
                self.calculated_target
            ),
            ProcessState::Emptying if self.storage_blocked => {
                "!! STORAGE FULL - DRAINING HALTED".to_string()
            }
            ProcessState::Emptying => ">> DRAINING TO STORAGE".to_string(),
            ProcessState::Done => match &self.report {
                Some(r) => format!("FINISHED. DEVIATION: {:+.2}°C [{}]", r.deviation, r.grade),
                None => "FINISHED".to_string(),
            },
        }
    }

    fn snapshot(&mut self, trend: TrendPoint) -> Telemetry {
        Telemetry {
            tick: self.clock.ticks,
            sim_time_s: self.clock.elapsed_s,
            state: self.state,
            paused: self.paused,
            feed_a: TankSnapshot::from(&self.plant.feed_a),
            feed_b: TankSnapshot::from(&self.plant.feed_b),
            mixer: TankSnapshot::from(&self.plant.mixer),
            storage: TankSnapshot::from(&self.plant.storage),
            pumps: self.pumps,
            calculated_target: self.calculated_target(),
            trend,
            status: self.status_line(),
            events: std::mem::take(&mut self.pending),
            report: self.report,
        }
    }
}

fn check_dt(dt: f64) -> SimResult<()> {
    if dt.is_finite() && dt > 0.0 {
        Ok(())
    } else {
        Err(SimError::InvalidArg {
            what: "dt must be finite and positive",
        })
    }
}

/// Apply `commands`, then advance one tick, threading the state through by value.
///
/// `dt` is checked before any command is applied, so an error leaves nothing half-done
/// (the controller is dropped with the error; clone it first to keep it).
pub fn tick(
    mut controller: ProcessController,
    commands: impl IntoIterator<Item = Command>,
    dt: f64,
) -> SimResult<(ProcessController, Telemetry)> {
    check_dt(dt)?;
    for command in commands {
        controller.handle(command);
    }
    let telemetry = controller.tick(dt)?;
    Ok((controller, telemetry))
}
