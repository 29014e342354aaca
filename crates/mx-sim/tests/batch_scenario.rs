//! Integration test: one full batch from the default plant.
//!
//! Feed A (90 L, charged at 15 °C) and feed B (90 L at 95 °C) fill the mixer to 150 L,
//! the feed-forward raises the setpoint above 60 °C, the PID regulates to it and the
//! batch is drained to storage, arriving close to 60 °C after transport losses.

use mx_sim::{
    Command, CommandSchedule, DeviationGrade, EventKind, ProcessController, ProcessSettings,
    ProcessState, RunOptions, Severity, run_batch,
};

fn start(target: f64) -> Command {
    Command::Start {
        feed_a_temp: 15.0,
        feed_b_temp: 95.0,
        target_temp: target,
    }
}

fn run_default() -> (ProcessController, mx_sim::RunRecord) {
    let mut controller = ProcessController::new(ProcessSettings::default()).unwrap();
    let schedule = CommandSchedule::new().at(0, start(60.0));
    let record = run_batch(&mut controller, &schedule, &RunOptions::default()).unwrap();
    (controller, record)
}

#[test]
fn batch_arrives_near_target() {
    let (controller, record) = run_default();

    assert!(record.completed());
    assert_eq!(record.final_state, ProcessState::Done);
    assert!(record.ticks > 700 && record.ticks < 1_000, "ticks = {}", record.ticks);

    let report = record.report.unwrap();
    assert!((report.final_volume - 150.0).abs() < 1e-9);
    assert!(report.deviation.abs() < 0.5, "deviation = {}", report.deviation);
    assert_eq!(report.grade, DeviationGrade::Ideal);

    let plant = controller.plant();
    assert_eq!(plant.mixer.level(), 0.0);
    assert!((plant.feed_a.level() - 15.0).abs() < 1e-9);
    assert!((plant.feed_b.level() - 15.0).abs() < 1e-9);

    let last = record.telemetry.last().unwrap();
    assert!(last.status.starts_with("FINISHED. DEVIATION:"));
    assert!(last.status.ends_with("[IDEAL]"));
    assert!(!last.pumps.any_on());
}

#[test]
fn liquid_is_conserved_every_tick() {
    let (controller, record) = run_default();
    assert!((controller.plant().total_volume() - 180.0).abs() < 1e-9);
    for t in &record.telemetry {
        let total: f64 = t.tanks().iter().map(|tank| tank.level).sum();
        assert!((total - 180.0).abs() < 1e-9, "tick {}: {total}", t.tick);
        for tank in t.tanks() {
            assert!(tank.level >= 0.0 && tank.level <= tank.capacity);
        }
    }
}

#[test]
fn states_follow_the_batch_sequence() {
    let (_, record) = run_default();
    let mut sequence: Vec<ProcessState> = Vec::new();
    for t in &record.telemetry {
        if sequence.last() != Some(&t.state) {
            sequence.push(t.state);
        }
    }
    assert_eq!(
        sequence,
        vec![
            ProcessState::Filling,
            ProcessState::Calculating,
            ProcessState::Heating,
            ProcessState::Emptying,
            ProcessState::Done,
        ]
    );

    let changes: Vec<&str> = record
        .events
        .iter()
        .filter(|e| e.kind == EventKind::StateChange)
        .map(|e| e.message.as_str())
        .collect();
    assert_eq!(
        changes,
        vec!["FILLING", "CALCULATING", "HEATING", "EMPTYING", "DONE"]
    );
    let completion = record.events.last().unwrap();
    assert_eq!(completion.kind, EventKind::Completion);
    assert_eq!(completion.severity, Severity::Success);
}

#[test]
fn heating_holds_one_corrected_setpoint() {
    let (_, record) = run_default();
    let heating: Vec<_> = record
        .telemetry
        .iter()
        .filter(|t| t.state == ProcessState::Heating)
        .collect();
    assert!(!heating.is_empty());

    let setpoint = heating[0].calculated_target.unwrap();
    assert!(setpoint > 60.0 && setpoint < 65.0);
    for t in &heating {
        assert_eq!(t.calculated_target, Some(setpoint));
        assert_eq!(t.trend.sp, setpoint);
        assert!(t.mixer.heater_power == 0.0 || t.mixer.cooling_power == 0.0);
    }

    for t in record
        .telemetry
        .iter()
        .filter(|t| t.state != ProcessState::Heating)
    {
        assert_eq!(t.calculated_target, None);
        assert_eq!(t.trend.sp, 60.0);
    }
}

#[test]
fn record_every_decimates_but_keeps_final_snapshot() {
    let mut controller = ProcessController::new(ProcessSettings::default()).unwrap();
    let schedule = CommandSchedule::new().at(0, start(60.0));
    let opts = RunOptions {
        record_every: 100,
        ..RunOptions::default()
    };
    let record = run_batch(&mut controller, &schedule, &opts).unwrap();
    let last = record.telemetry.last().unwrap();
    assert_eq!(last.tick, record.ticks);
    assert!(last.report.is_some());
    assert_eq!(record.telemetry.len() as u64, record.ticks.div_ceil(100));
}

#[test]
fn second_batch_drains_remaining_feed() {
    let (mut controller, _) = run_default();
    let schedule = CommandSchedule::new().at(0, start(60.0));
    let record = run_batch(&mut controller, &schedule, &RunOptions::default()).unwrap();

    assert!(record.completed());
    let report = record.report.unwrap();
    assert!((report.final_volume - 180.0).abs() < 1e-9);
    assert!(controller.plant().feed_a.is_empty());
    assert!(controller.plant().feed_b.is_empty());
    // The first batch sat cooling in storage the whole time.
    assert_eq!(report.grade, DeviationGrade::Acceptable);
    assert!(report.deviation < -0.5);

    assert!(!controller.start(15.0, 95.0, 60.0));
    assert_eq!(controller.state(), ProcessState::Done);
}

#[test]
fn lower_target_settles_lower() {
    let mut controller = ProcessController::new(ProcessSettings::default()).unwrap();
    let schedule = CommandSchedule::new().at(0, start(50.0));
    let record = run_batch(&mut controller, &schedule, &RunOptions::default()).unwrap();
    let report = record.report.unwrap();
    assert_eq!(report.target, 50.0);
    assert!(report.deviation.abs() < 1.0, "deviation = {}", report.deviation);
}

#[test]
fn calculation_event_reports_loss_correction() {
    let (controller, record) = run_default();
    let settings = controller.settings();
    let ff = mx_controls::ThermalFeedForward::new(
        settings.environment,
        settings.pump_speed,
        settings.tick_duration,
    )
    .unwrap();
    let expected = ff.correction(60.0, settings.batch_volume);
    assert!(expected > 0.0);
    let event = record
        .events
        .iter()
        .find(|e| e.kind == EventKind::Calculation)
        .unwrap();
    assert_eq!(event.message, format!("loss correction: {expected:+.2} °C"));
}

#[test]
fn high_target_settles_short_of_corrected_setpoint() {
    let mut controller = ProcessController::new(ProcessSettings::default()).unwrap();
    let schedule = CommandSchedule::new().at(0, start(80.0));
    let opts = RunOptions {
        max_ticks: 20_000,
        record_every: 1_000,
        ..RunOptions::default()
    };
    let record = run_batch(&mut controller, &schedule, &opts).unwrap();

    assert!(!record.completed());
    assert_eq!(record.final_state, ProcessState::Heating);
    let setpoint = controller.calculated_target().unwrap();
    let gap = setpoint - controller.plant().mixer.temperature();
    assert!(gap > 0.1 && gap < 1.0, "gap = {gap}");
    assert!(controller.pid_state().integral >= 49.9);
}
