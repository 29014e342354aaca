//! Per-tick telemetry, the operator event log and the trend history.
//!
//! Renderers, plotters and log viewers only ever see these types; nothing here
//! references the controller itself.

use crate::actuator::PumpStates;
use crate::process::ProcessState;
use crate::tank::Tank;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Level, temperature and actuator powers of one tank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TankSnapshot {
    pub name: String,
    pub capacity: f64,
    pub level: f64,
    pub temperature: f64,
    pub heater_power: f64,
    pub cooling_power: f64,
}

impl From<&Tank> for TankSnapshot {
    fn from(tank: &Tank) -> Self {
        Self {
            name: tank.name().to_string(),
            capacity: tank.capacity(),
            level: tank.level(),
            temperature: tank.temperature(),
            heater_power: tank.heater_power(),
            cooling_power: tank.cooling_power(),
        }
    }
}

/// One sample of the mixer control loop: process value, setpoint, control variable.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrendPoint {
    pub pv: f64,
    pub sp: f64,
    pub cv: f64,
}

/// Bounded history of trend samples; the oldest sample is dropped first.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendHistory {
    capacity: usize,
    points: VecDeque<TrendPoint>,
}

impl TrendHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            points: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, point: TrendPoint) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&TrendPoint> {
        self.points.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrendPoint> {
        self.points.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    System,
    StateChange,
    Calculation,
    Completion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Alarm,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EventKind::System => "SYSTEM",
            EventKind::StateChange => "STATE CHANGE",
            EventKind::Calculation => "CALCULATION",
            EventKind::Completion => "COMPLETE",
        };
        f.write_str(label)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Alarm => "alarm",
        };
        f.write_str(label)
    }
}

/// Entry of the append-only operator event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessEvent {
    pub sim_time_s: f64,
    pub kind: EventKind,
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for ProcessEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:>8.2}s] {:<12} {:<7} {}",
            self.sim_time_s, self.kind, self.severity, self.message
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventLog {
    events: Vec<ProcessEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: ProcessEvent) {
        self.events.push(event);
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn events(&self) -> &[ProcessEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// How close the delivered batch came to the operator target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviationGrade {
    /// Within half a degree.
    Ideal,
    Acceptable,
}

impl DeviationGrade {
    pub const IDEAL_BAND: f64 = 0.5;

    pub fn from_deviation(deviation: f64) -> Self {
        if deviation.abs() < Self::IDEAL_BAND {
            DeviationGrade::Ideal
        } else {
            DeviationGrade::Acceptable
        }
    }
}

impl fmt::Display for DeviationGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviationGrade::Ideal => f.write_str("IDEAL"),
            DeviationGrade::Acceptable => f.write_str("OK"),
        }
    }
}

/// Final result of a batch, produced once the process reaches `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub final_temperature: f64,
    pub final_volume: f64,
    pub target: f64,
    /// `final_temperature - target`.
    pub deviation: f64,
    pub grade: DeviationGrade,
}

impl BatchReport {
    pub fn new(final_temperature: f64, final_volume: f64, target: f64) -> Self {
        let deviation = final_temperature - target;
        Self {
            final_temperature,
            final_volume,
            target,
            deviation,
            grade: DeviationGrade::from_deviation(deviation),
        }
    }
}

/// Snapshot emitted once per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    pub tick: u64,
    pub sim_time_s: f64,
    pub state: ProcessState,
    pub paused: bool,
    pub feed_a: TankSnapshot,
    pub feed_b: TankSnapshot,
    pub mixer: TankSnapshot,
    pub storage: TankSnapshot,
    pub pumps: PumpStates,
    /// Feed-forward corrected setpoint, only while heating.
    pub calculated_target: Option<f64>,
    pub trend: TrendPoint,
    pub status: String,
    /// Events raised since the previous snapshot.
    pub events: Vec<ProcessEvent>,
    pub report: Option<BatchReport>,
}

impl Telemetry {
    pub fn tanks(&self) -> [&TankSnapshot; 4] {
        [&self.feed_a, &self.feed_b, &self.mixer, &self.storage]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_history_is_bounded() {
        let mut history = TrendHistory::new(3);
        for i in 0..5 {
            history.push(TrendPoint {
                pv: i as f64,
                sp: 0.0,
                cv: 0.0,
            });
        }
        assert_eq!(history.len(), 3);
        let pvs: Vec<f64> = history.iter().map(|p| p.pv).collect();
        assert_eq!(pvs, vec![2.0, 3.0, 4.0]);
        assert_eq!(history.latest().map(|p| p.pv), Some(4.0));
        history.clear();
        assert!(history.is_empty());
    }

    #[test]
    fn zero_capacity_history_still_keeps_latest() {
        let mut history = TrendHistory::new(0);
        history.push(TrendPoint::default());
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn report_grading() {
        let ideal = BatchReport::new(59.8, 150.0, 60.0);
        assert_eq!(ideal.grade, DeviationGrade::Ideal);
        assert!((ideal.deviation + 0.2).abs() < 1e-9);

        let ok = BatchReport::new(61.0, 150.0, 60.0);
        assert_eq!(ok.grade, DeviationGrade::Acceptable);
        assert_eq!(ok.grade.to_string(), "OK");
    }

    #[test]
    fn event_display_contains_message() {
        let event = ProcessEvent {
            sim_time_s: 3.75,
            kind: EventKind::Calculation,
            severity: Severity::Info,
            message: "loss correction: +3.12 °C".to_string(),
        };
        let line = event.to_string();
        assert!(line.contains("CALCULATION"));
        assert!(line.contains("+3.12"));
    }
}
