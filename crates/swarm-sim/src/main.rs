//! Swarm simulator - runs the fixed-rate loop until interrupted

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use swarm_sim::config::Config;
use swarm_sim::experiments::{spawn_experiment, ExperimentParams, Scenario};
use swarm_sim::loops::simulation_loop::run_simulation_loop;
use swarm_sim::state::SimState;
use swarm_sim::telemetry::MemorySink;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("swarm_sim=debug".parse()?),
        )
        .init();

    tracing::info!("Starting swarm simulator...");

    let config = Config::from_env();
    // Fail fast on a bad scenario name before anything starts ticking
    let scenario = config
        .startup_scenario
        .as_deref()
        .map(str::parse::<Scenario>)
        .transpose()?;

    let sink = Arc::new(MemorySink::new());
    let state = Arc::new(SimState::new(config.clone(), sink.clone()));

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let sim_loop = tokio::spawn(run_simulation_loop(state.clone(), shutdown_tx.subscribe()));

    let experiment = scenario.map(|scenario| {
        spawn_experiment(
            state.clone(),
            scenario,
            config.startup_scenario_drones,
            config.startup_scenario_duration_secs,
            ExperimentParams::default(),
        )
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");

    if let Some(experiment) = experiment {
        if !experiment.is_finished() {
            experiment.cancel();
        }
        match experiment.join().await {
            Ok(result) => tracing::info!(
                "Experiment {} ({}) success={}",
                result.scenario,
                result.run_id,
                result.success
            ),
            Err(err) => tracing::warn!("Experiment failed: {}", err),
        }
    }

    let _ = shutdown_tx.send(());
    sim_loop.await?;

    tracing::info!(
        "Recorded {} telemetry samples across {} run(s)",
        sink.len(),
        sink.run_ids().len()
    );
    Ok(())
}
