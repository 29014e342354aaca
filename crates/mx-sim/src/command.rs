//! Operator commands accepted by the process controller.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Discrete operator command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    /// Begin a batch with the given feed temperatures and target (°C).
    Start {
        feed_a_temp: f64,
        feed_b_temp: f64,
        target_temp: f64,
    },
    /// Emergency stop: freeze process logic, physics keeps running.
    Pause,
    Resume,
    /// Hard restart of the process state and tank contents.
    Reset,
    /// Change the operator target without starting a batch.
    SetTarget { temperature: f64 },
    /// Change the operator feed temperatures applied at the next start.
    SetFeedTemperatures { feed_a: f64, feed_b: f64 },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Start { .. } => "start",
            Command::Pause => "pause",
            Command::Resume => "resume",
            Command::Reset => "reset",
            Command::SetTarget { .. } => "set-target",
            Command::SetFeedTemperatures { .. } => "set-feed-temperatures",
        }
    }
}

/// Commands keyed by the tick index before which they are applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandSchedule {
    entries: BTreeMap<u64, Vec<Command>>,
}

impl CommandSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, tick: u64, command: Command) -> Self {
        self.push(tick, command);
        self
    }

    pub fn push(&mut self, tick: u64, command: Command) {
        self.entries.entry(tick).or_default().push(command);
    }

    /// Commands due before tick `tick`, in insertion order.
    pub fn due(&self, tick: u64) -> &[Command] {
        self.entries.get(&tick).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}
