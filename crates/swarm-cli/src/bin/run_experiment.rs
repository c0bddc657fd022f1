//! Run one scripted scenario against an in-process simulator.
//!
//! Usage:
//!   cargo run -p swarm-cli --bin run_experiment -- takeoff-hover-land --drones 3 --duration 5

use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use tokio::sync::broadcast;

use swarm_sim::config::Config;
use swarm_sim::experiments::{spawn_experiment, ExperimentParams, Scenario};
use swarm_sim::loops::simulation_loop::run_simulation_loop;
use swarm_sim::state::SimState;
use swarm_sim::telemetry::ChannelSink;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScenarioArg {
    CircularFormation,
    FigureEight,
    TakeoffHoverLand,
}

impl From<ScenarioArg> for Scenario {
    fn from(arg: ScenarioArg) -> Self {
        match arg {
            ScenarioArg::CircularFormation => Scenario::CircularFormation,
            ScenarioArg::FigureEight => Scenario::FigureEight,
            ScenarioArg::TakeoffHoverLand => Scenario::TakeoffHoverLand,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Run a scripted swarm experiment")]
struct Args {
    /// Scenario to run
    #[arg(value_enum)]
    scenario: ScenarioArg,

    /// Number of drones in the swarm
    #[arg(long, default_value_t = 3)]
    drones: usize,

    /// Scenario duration in seconds (excluding takeoff settle time)
    #[arg(long, default_value_t = 10.0)]
    duration: f64,

    /// Formation radius in meters
    #[arg(long)]
    radius: Option<f64>,

    /// Flight height in meters
    #[arg(long)]
    height: Option<f64>,

    /// Sensor noise seed (0 = random)
    #[arg(long)]
    seed: Option<u64>,

    /// Wall-clock speed-up factor
    #[arg(long)]
    speed: Option<f64>,

    /// Print every telemetry sample to stdout as JSON lines
    #[arg(long, default_value_t = false)]
    emit_telemetry: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    swarm_cli::init_tracing("swarm_sim=info")?;
    let args = Args::parse();

    if !(args.duration.is_finite() && args.duration >= 0.0) {
        bail!("--duration must be a non-negative number of seconds");
    }

    let mut config = Config::from_env();
    if let Some(seed) = args.seed {
        config.noise_seed = seed;
    }
    if let Some(speed) = args.speed {
        if !(speed.is_finite() && speed > 0.0) {
            bail!("--speed must be positive");
        }
        config.simulation_speed = speed;
    }

    let (sink, mut telemetry) = ChannelSink::channel(config.telemetry_capacity);
    let sink = Arc::new(sink);
    let state = Arc::new(SimState::new(config, sink.clone()));

    let emit = args.emit_telemetry;
    let printer = tokio::spawn(async move {
        let mut samples = 0usize;
        while let Some(batch) = telemetry.recv().await {
            samples += batch.len();
            if emit {
                for sample in &batch {
                    match serde_json::to_string(sample) {
                        Ok(line) => println!("{}", line),
                        Err(err) => tracing::warn!("Failed to encode sample: {}", err),
                    }
                }
            }
        }
        samples
    });

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let sim_loop = tokio::spawn(run_simulation_loop(state.clone(), shutdown_tx.subscribe()));

    let experiment = spawn_experiment(
        state.clone(),
        args.scenario.into(),
        args.drones,
        args.duration,
        ExperimentParams {
            radius: args.radius,
            height: args.height,
        },
    );
    tracing::info!("Experiment {} running", experiment.id());

    let result = experiment.join().await;

    let _ = shutdown_tx.send(());
    sim_loop.await?;
    // Last sender goes away with the state, which ends the printer
    drop(state);
    drop(sink);
    let samples = printer.await?;

    let result = result?;
    tracing::info!("Collected {} telemetry samples", samples);
    eprintln!("{}", serde_json::to_string_pretty(&result)?);

    if !result.success {
        bail!("experiment {} did not complete", result.run_id);
    }
    Ok(())
}
