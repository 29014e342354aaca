//! Headless batch runner and result recording.

use crate::command::CommandSchedule;
use crate::error::{SimError, SimResult};
use crate::process::{ProcessController, ProcessState};
use crate::telemetry::{BatchReport, ProcessEvent, Telemetry};
use tracing::info;

/// Options for batch runs.
#[derive(Clone, Debug, PartialEq)]
pub struct RunOptions {
    /// Fixed time step (seconds)
    pub dt: f64,
    /// Maximum number of ticks (safety limit)
    pub max_ticks: u64,
    /// Record every N-th telemetry snapshot (decimation)
    pub record_every: u64,
    /// Stop once the batch is done and its report has been produced
    pub stop_on_done: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            dt: 0.05,
            max_ticks: 100_000,
            record_every: 1,
            stop_on_done: true,
        }
    }
}

impl RunOptions {
    pub fn validate(&self) -> SimResult<()> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(SimError::InvalidArg {
                what: "dt must be positive",
            });
        }
        if self.max_ticks == 0 {
            return Err(SimError::InvalidArg {
                what: "max_ticks must be positive",
            });
        }
        if self.record_every == 0 {
            return Err(SimError::InvalidArg {
                what: "record_every must be positive",
            });
        }
        Ok(())
    }
}

/// Progress passed to the observer after every tick.
#[derive(Clone, Copy, Debug)]
pub struct RunProgress {
    pub tick: u64,
    pub max_ticks: u64,
    pub sim_time_s: f64,
    pub state: ProcessState,
}

/// Result of a batch run.
#[derive(Clone, Debug)]
pub struct RunRecord {
    /// Decimated telemetry; the last snapshot is always included.
    pub telemetry: Vec<Telemetry>,
    /// Every event raised during the run, in order.
    pub events: Vec<ProcessEvent>,
    pub ticks: u64,
    pub final_state: ProcessState,
    pub report: Option<BatchReport>,
}

impl RunRecord {
    pub fn completed(&self) -> bool {
        self.report.is_some()
    }
}

/// Drive `controller` with `schedule` until the batch is done or `max_ticks` elapse.
///
/// Commands keyed by tick `n` are applied right before the `n`-th tick (0-based).
pub fn run_batch(
    controller: &mut ProcessController,
    schedule: &CommandSchedule,
    opts: &RunOptions,
) -> SimResult<RunRecord> {
    run_batch_with_progress(controller, schedule, opts, |_| {})
}

pub fn run_batch_with_progress<F>(
    controller: &mut ProcessController,
    schedule: &CommandSchedule,
    opts: &RunOptions,
    mut progress: F,
) -> SimResult<RunRecord>
where
    F: FnMut(RunProgress),
{
    opts.validate()?;

    let mut telemetry = Vec::new();
    let mut events = Vec::new();
    let mut last = None;
    let mut tick = 0;

    while tick < opts.max_ticks {
        for command in schedule.due(tick) {
            controller.handle(*command);
        }
        let snapshot = controller.tick(opts.dt)?;
        tick += 1;

        events.extend(snapshot.events.iter().cloned());
        progress(RunProgress {
            tick,
            max_ticks: opts.max_ticks,
            sim_time_s: snapshot.sim_time_s,
            state: snapshot.state,
        });

        let done = opts.stop_on_done && snapshot.report.is_some();
        if tick % opts.record_every == 0 {
            telemetry.push(snapshot);
        } else {
            last = Some(snapshot);
        }
        if done {
            break;
        }
    }

    // Always record final snapshot
    if tick % opts.record_every != 0 {
        telemetry.extend(last);
    }

    let record = RunRecord {
        telemetry,
        events,
        ticks: tick,
        final_state: controller.state(),
        report: controller.report().copied(),
    };
    info!(
        ticks = record.ticks,
        state = %record.final_state,
        completed = record.completed(),
        "batch run finished"
    );
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::process::ProcessSettings;

    fn start() -> Command {
        Command::Start {
            feed_a_temp: 15.0,
            feed_b_temp: 95.0,
            target_temp: 60.0,
        }
    }

    #[test]
    fn run_options_defaults() {
        let opts = RunOptions::default();
        assert_eq!(opts.dt, 0.05);
        assert_eq!(opts.max_ticks, 100_000);
        assert_eq!(opts.record_every, 1);
        assert!(opts.stop_on_done);
    }

    #[test]
    fn invalid_options_are_rejected() {
        let mut controller = ProcessController::new(ProcessSettings::default()).unwrap();
        let schedule = CommandSchedule::new();
        for opts in [
            RunOptions {
                dt: 0.0,
                ..RunOptions::default()
            },
            RunOptions {
                max_ticks: 0,
                ..RunOptions::default()
            },
            RunOptions {
                record_every: 0,
                ..RunOptions::default()
            },
        ] {
            assert!(run_batch(&mut controller, &schedule, &opts).is_err());
        }
        assert_eq!(controller.clock().ticks, 0);
    }

    #[test]
    fn idle_run_stops_at_max_ticks() {
        let mut controller = ProcessController::new(ProcessSettings::default()).unwrap();
        let opts = RunOptions {
            max_ticks: 25,
            record_every: 10,
            ..RunOptions::default()
        };
        let record = run_batch(&mut controller, &CommandSchedule::new(), &opts).unwrap();
        assert_eq!(record.ticks, 25);
        assert_eq!(record.final_state, ProcessState::Idle);
        assert!(!record.completed());
        let ticks: Vec<u64> = record.telemetry.iter().map(|t| t.tick).collect();
        assert_eq!(ticks, vec![10, 20, 25]);
    }

    #[test]
    fn progress_sees_every_tick() {
        let mut controller = ProcessController::new(ProcessSettings::default()).unwrap();
        let schedule = CommandSchedule::new().at(0, start());
        let opts = RunOptions {
            max_ticks: 40,
            ..RunOptions::default()
        };
        let mut seen = Vec::new();
        run_batch_with_progress(&mut controller, &schedule, &opts, |p| seen.push(p.tick))
            .unwrap();
        assert_eq!(seen.len(), 40);
        assert_eq!(seen.first(), Some(&1));
        assert_eq!(controller.state(), ProcessState::Filling);
    }

    #[test]
    fn run_collects_events() {
        let mut controller = ProcessController::new(ProcessSettings::default()).unwrap();
        let schedule = CommandSchedule::new().at(0, start());
        let opts = RunOptions {
            max_ticks: 100,
            ..RunOptions::default()
        };
        let record = run_batch(&mut controller, &schedule, &opts).unwrap();
        let messages: Vec<&str> = record.events.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages[0], "process started");
        assert!(messages.contains(&"CALCULATING"));
        assert!(messages.contains(&"HEATING"));
    }
}
