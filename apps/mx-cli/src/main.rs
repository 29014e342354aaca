mod error;

use clap::{Parser, Subcommand};
use error::{CliError, CliResult};
use mx_project::ProcessConfig;
use mx_sim::{
    Command, CommandSchedule, ProcessController, ProcessState, RunOptions, RunProgress,
    RunRecord, Telemetry, run_batch_with_progress,
};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "mixflow")]
#[command(about = "Mixflow CLI - batch mixing and heating process simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a process configuration file
    Validate {
        /// Path to the configuration YAML file
        config_path: PathBuf,
    },
    /// Run one batch headless
    Run(RunArgs),
    /// Write the default configuration as YAML
    DefaultConfig {
        /// Output file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct RunArgs {
    /// Configuration YAML file (defaults to the standard plant)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Feed A temperature (°C)
    #[arg(long)]
    feed_a: Option<f64>,
    /// Feed B temperature (°C)
    #[arg(long)]
    feed_b: Option<f64>,
    /// Target temperature in storage (°C)
    #[arg(long)]
    target: Option<f64>,
    /// Time step in seconds
    #[arg(long, default_value_t = 0.05)]
    dt: f64,
    /// Safety limit on the number of ticks
    #[arg(long, default_value_t = 100_000)]
    max_ticks: u64,
    /// Trigger the emergency stop before this tick
    #[arg(long)]
    pause_at: Option<u64>,
    /// Release the emergency stop before this tick
    #[arg(long, requires = "pause_at")]
    resume_at: Option<u64>,
    /// Record every N-th telemetry snapshot
    #[arg(long, default_value_t = 1)]
    record_every: u64,
    /// Write recorded telemetry as JSON lines
    #[arg(long)]
    jsonl: Option<PathBuf>,
    /// Write the recorded trend as CSV
    #[arg(long)]
    csv: Option<PathBuf>,
}

fn main() -> CliResult<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config_path } => cmd_validate(&config_path),
        Commands::Run(args) => cmd_run(&args),
        Commands::DefaultConfig { output } => cmd_default_config(output.as_deref()),
    }
}

fn cmd_validate(config_path: &Path) -> CliResult<()> {
    println!("Validating config: {}", config_path.display());
    let config = mx_project::load_yaml(config_path)?;
    info!(name = %config.name, version = config.version, "config loaded");
    config.build_controller()?;
    println!("✓ Config '{}' is valid", config.name);
    Ok(())
}

fn cmd_default_config(output: Option<&Path>) -> CliResult<()> {
    let content = serde_yaml::to_string(&ProcessConfig::default())?;
    if let Some(path) = output {
        std::fs::write(path, content)?;
        println!("✓ Wrote default config to {}", path.display());
    } else {
        print!("{}", content);
    }
    Ok(())
}

fn cmd_run(args: &RunArgs) -> CliResult<()> {
    let config = match &args.config {
        Some(path) => {
            let config = mx_project::load_yaml(path)?;
            info!(path = %path.display(), name = %config.name, "config loaded");
            config
        }
        None => ProcessConfig::default(),
    };
    if let (Some(pause), Some(resume)) = (args.pause_at, args.resume_at) {
        if resume <= pause {
            return Err(CliError::InvalidArg {
                what: format!("--resume-at ({resume}) must come after --pause-at ({pause})"),
            });
        }
    }

    let mut controller = config.build_controller()?;
    let operator = &config.operator;
    let target = args.target.unwrap_or(operator.target_c);
    let start = Command::Start {
        feed_a_temp: args.feed_a.unwrap_or(operator.feed_a_c),
        feed_b_temp: args.feed_b.unwrap_or(operator.feed_b_c),
        target_temp: target,
    };
    let mut schedule = CommandSchedule::new().at(0, start);
    if let Some(tick) = args.pause_at {
        schedule.push(tick, Command::Pause);
    }
    if let Some(tick) = args.resume_at {
        schedule.push(tick, Command::Resume);
    }
    let opts = RunOptions {
        dt: args.dt,
        max_ticks: args.max_ticks,
        record_every: args.record_every,
        stop_on_done: true,
    };

    println!("Running batch '{}'", config.name);
    println!(
        "  dt = {:.3} s, max ticks = {}, record every {}",
        opts.dt, opts.max_ticks, opts.record_every
    );

    info!(
        name = %config.name,
        target,
        max_ticks = opts.max_ticks,
        "batch run starting"
    );
    let wall = Instant::now();
    let mut last_emit = Instant::now();
    let record = run_batch_with_progress(&mut controller, &schedule, &opts, |progress| {
        if last_emit.elapsed().as_millis() >= 100 || progress.tick == progress.max_ticks {
            render_cli_progress(&progress, wall.elapsed().as_secs_f64());
            last_emit = Instant::now();
        }
    })?;
    clear_progress_line();
    if !record.completed() {
        warn!(
            ticks = record.ticks,
            state = %record.final_state,
            "batch did not complete"
        );
    }

    print_events(&record);
    print_summary(&record, &controller, wall.elapsed().as_secs_f64());

    if let Some(path) = &args.jsonl {
        write_jsonl(path, &record.telemetry)?;
        println!(
            "✓ Exported {} snapshots to {}",
            record.telemetry.len(),
            path.display()
        );
    }
    if let Some(path) = &args.csv {
        write_trend_csv(path, &record.telemetry)?;
        println!(
            "✓ Exported {} trend points to {}",
            record.telemetry.len(),
            path.display()
        );
    }

    Ok(())
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(100));
    let _ = io::stdout().flush();
}

fn render_cli_progress(progress: &RunProgress, elapsed_wall_s: f64) {
    let width = 28usize;
    let fraction = progress.tick as f64 / progress.max_ticks.max(1) as f64;
    let filled = ((fraction * width as f64).round() as usize).min(width);
    let bar = format!(
        "{}{}",
        "#".repeat(filled),
        "-".repeat(width.saturating_sub(filled))
    );
    print!(
        "\r[{}] tick={}  state={}  t={:.2}s  elapsed={:.1}s",
        bar, progress.tick, progress.state, progress.sim_time_s, elapsed_wall_s
    );
    let _ = io::stdout().flush();
}

fn print_events(record: &RunRecord) {
    println!("\nEvent log:");
    for event in &record.events {
        println!("  {}", event);
    }
}

fn print_summary(record: &RunRecord, controller: &ProcessController, wall_s: f64) {
    println!("\nRun summary:");
    println!("  Ticks:       {}", record.ticks);
    println!("  Sim time:    {}", controller.clock().display());
    println!("  Wall time:   {:.3}s", wall_s);
    println!("  Final state: {}", record.final_state);
    match &record.report {
        Some(report) => {
            println!("  Delivered:   {:.1} L", report.final_volume);
            println!(
                "  Final temp:  {:.2}°C (target {:.1}°C)",
                report.final_temperature, report.target
            );
            println!(
                "  Deviation:   {:+.2}°C [{}]",
                report.deviation, report.grade
            );
        }
        None => {
            println!("  Batch did not complete within {} ticks", record.ticks);
            if record.final_state == ProcessState::Heating {
                print_heating_stall(controller);
            }
        }
    }
}

/// The PID integral clamp caps the steady heater demand it can hold, so a hot enough
/// corrected setpoint leaves the mixer parked just outside the arrival band.
fn print_heating_stall(controller: &ProcessController) {
    let Some(setpoint) = controller.calculated_target() else {
        return;
    };
    let mixer = controller.plant().mixer.temperature();
    println!(
        "  Mixer held at {:.2}°C, {:.2}°C short of the corrected setpoint {:.2}°C",
        mixer,
        setpoint - mixer,
        setpoint
    );
    println!(
        "  The heater demand at this target exceeds the PID integral limit; \
         raise pid.integral_limit or lower the target"
    );
}

fn write_jsonl(path: &Path, telemetry: &[Telemetry]) -> CliResult<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for snapshot in telemetry {
        serde_json::to_writer(&mut out, snapshot)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

fn write_trend_csv(path: &Path, telemetry: &[Telemetry]) -> CliResult<()> {
    let mut csv = String::from(
        "tick,time_s,state,paused,pv,sp,cv,mixer_level,storage_level,storage_temperature\n",
    );
    for t in telemetry {
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{}\n",
            t.tick,
            t.sim_time_s,
            t.state,
            t.paused,
            t.trend.pv,
            t.trend.sp,
            t.trend.cv,
            t.mixer.level,
            t.storage.level,
            t.storage.temperature
        ));
    }
    std::fs::write(path, csv)?;
    Ok(())
}
