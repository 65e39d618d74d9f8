use std::path::PathBuf;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use intersection_sim::simulation::{
    ChannelSink, EventSink, LogSink, ScenarioKind, ScheduledCommand, SimulationEngine,
    DEFAULT_QUEUE_CAPACITY,
};

#[derive(Parser)]
#[command(name = "intersection_sim")]
#[command(about = "Traffic simulation of a single signalized intersection")]
struct Cli {
    /// Scenario to start with (normal, rush-hour, night)
    #[arg(long, default_value = "normal")]
    scenario: ScenarioKind,

    /// Number of simulation ticks to run
    #[arg(long, default_value = "1000")]
    ticks: u32,

    /// Simulated seconds per tick
    #[arg(long, default_value = "0.03")]
    delta: f64,

    /// Seed for reproducible vehicle spawning
    #[arg(long)]
    seed: Option<u64>,

    /// Write every event as a JSON line to this file
    #[arg(long)]
    event_log: Option<PathBuf>,

    /// Capacity of the event queue in front of the log writer
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,

    /// Sleep for the tick duration between ticks
    #[arg(long)]
    realtime: bool,

    /// Print the junction map once per simulated second
    #[arg(long)]
    map: bool,

    /// Print the final snapshot as JSON
    #[arg(long)]
    json: bool,

    /// Control command to apply before a tick, as <tick>:<command>
    /// (start, pause, stop, reset, manual, auto, scenario=<name>)
    #[arg(long = "at", value_name = "TICK:COMMAND")]
    schedule: Vec<ScheduledCommand>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn,intersection_sim=info"),
    )
    .init();

    let cli = Cli::parse();

    let mut dropped_events = None;
    let sink: Box<dyn EventSink> = match &cli.event_log {
        Some(path) => {
            let sink = ChannelSink::to_file(path, cli.queue_capacity)
                .with_context(|| format!("Failed to open event log {}", path.display()))?;
            dropped_events = Some(sink.dropped_counter());
            Box::new(sink)
        }
        None => Box::new(LogSink),
    };

    let mut engine = match cli.seed {
        Some(seed) => SimulationEngine::new_with_seed(cli.scenario, sink, seed),
        None => SimulationEngine::new(cli.scenario, sink),
    };

    run_headless(&mut engine, &cli);

    info!("=== SIMULATION COMPLETE ===");
    info!("Simulated time: {:.2}s", engine.time());
    info!("Scenario: {}", engine.scenario_name());
    info!("Active vehicles: {}", engine.vehicles().len());
    info!("Collisions: {}", engine.collision_count());
    info!("Violations: {}", engine.violation_count());
    info!(
        "Final lights: NS:{} EO:{}",
        engine.controller().ns(),
        engine.controller().eo()
    );

    if cli.json {
        let snapshot = serde_json::to_string_pretty(&engine.snapshot())
            .context("Failed to serialize snapshot")?;
        println!("{}", snapshot);
    }

    // Dropping the engine closes the event queue and waits for the writer
    drop(engine);
    if let Some(dropped) = dropped_events {
        info!("Dropped events: {}", dropped.load(Ordering::Relaxed));
    }

    Ok(())
}

/// Run the simulation without any graphics
fn run_headless(engine: &mut SimulationEngine, cli: &Cli) {
    let ticks_per_second = (1.0 / cli.delta).ceil().max(1.0) as u32;
    info!(
        "Running {} ticks of {}s ({} per simulated second)",
        cli.ticks, cli.delta, ticks_per_second
    );

    engine.start();

    if cli.map {
        engine.print_summary();
        engine.draw_map();
    }

    for tick in 0..cli.ticks {
        for scheduled in cli.schedule.iter().filter(|s| s.tick == tick) {
            info!("Tick {}: applying '{}'", tick, scheduled.command);
            scheduled.command.apply(engine);
        }

        engine.tick(cli.delta);

        if (tick + 1) % ticks_per_second == 0 {
            info!("{}", engine.status_line());
            if cli.map {
                engine.draw_map();
            }
        }

        if cli.realtime {
            std::thread::sleep(std::time::Duration::from_secs_f64(cli.delta.max(0.0)));
        }
    }

    if cli.map {
        engine.print_summary();
    }
}
