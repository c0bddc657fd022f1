//! Scripted experiments against a live simulation loop.
//!
//! Runs on paused tokio time, so multi-second scenarios finish instantly.

use std::sync::Arc;
use std::time::Duration;

use swarm_core::DroneStatus;
use swarm_sim::config::Config;
use swarm_sim::experiments::{
    run_experiment, spawn_experiment, ExperimentError, ExperimentParams, Scenario,
};
use swarm_sim::loops::simulation_loop::run_simulation_loop;
use swarm_sim::state::SimState;
use swarm_sim::telemetry::MemorySink;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

struct Harness {
    state: Arc<SimState>,
    sink: Arc<MemorySink>,
    shutdown: broadcast::Sender<()>,
    sim_loop: JoinHandle<()>,
}

impl Harness {
    fn start() -> Self {
        let config = Config {
            noise_seed: 11,
            ..Config::default()
        };
        let sink = Arc::new(MemorySink::new());
        let state = Arc::new(SimState::new(config, sink.clone()));
        let (shutdown, _) = broadcast::channel(1);
        let sim_loop = tokio::spawn(run_simulation_loop(state.clone(), shutdown.subscribe()));
        Self {
            state,
            sink,
            shutdown,
            sim_loop,
        }
    }

    async fn stop(self) {
        self.shutdown.send(()).unwrap();
        self.sim_loop.await.unwrap();
    }

    fn statuses(&self) -> Vec<DroneStatus> {
        self.state
            .get_all_states()
            .values()
            .map(|d| d.status)
            .collect()
    }
}

#[tokio::test(start_paused = true)]
async fn takeoff_hover_land_completes_and_lands() {
    let harness = Harness::start();

    let result = run_experiment(
        harness.state.clone(),
        "takeoff_hover_land",
        2,
        1.0,
        ExperimentParams::default(),
    )
    .await
    .unwrap();

    assert!(result.success);
    assert_eq!(result.scenario, "takeoff_hover_land");
    assert!(result.run_id.starts_with("hover_"));
    assert_eq!(result.duration, 1.0);

    // Drones were flying at ~0.6 m when the land command went out
    let samples = harness.sink.samples(&result.run_id);
    assert!(samples
        .iter()
        .any(|s| s.status == DroneStatus::Flying && (s.z - 0.6).abs() < 0.1));
    assert!(harness
        .statuses()
        .iter()
        .all(|s| matches!(s, DroneStatus::Landing | DroneStatus::Idle)));

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert!(harness.statuses().iter().all(|s| *s == DroneStatus::Idle));

    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn cancelled_experiment_lands_and_reports_failure() {
    let harness = Harness::start();

    let handle = spawn_experiment(
        harness.state.clone(),
        Scenario::CircularFormation,
        3,
        30.0,
        ExperimentParams {
            radius: Some(0.8),
            height: None,
        },
    );
    assert_eq!(handle.scenario(), Scenario::CircularFormation);

    // Past the settle phase, inside the formation hold
    tokio::time::sleep(Duration::from_secs(4)).await;
    assert!(!handle.is_finished());
    assert!(harness.statuses().iter().all(|s| *s == DroneStatus::Flying));

    handle.cancel();
    let result = handle.join().await.unwrap();
    assert!(!result.success);
    assert!(result.run_id.starts_with("circular_"));
    assert!(harness
        .statuses()
        .iter()
        .all(|s| matches!(s, DroneStatus::Landing | DroneStatus::Idle)));

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert!(harness.statuses().iter().all(|s| *s == DroneStatus::Idle));

    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn figure_eight_flies_the_first_drone_only() {
    let harness = Harness::start();

    let result = run_experiment(
        harness.state.clone(),
        "figure_eight",
        2,
        5.0,
        ExperimentParams::default(),
    )
    .await
    .unwrap();
    assert!(result.success);
    assert!(result.run_id.starts_with("figure8_"));

    let states = harness.state.get_all_states();
    assert_eq!(states["d1"].status, DroneStatus::Landing);
    assert_eq!(states["d2"].status, DroneStatus::Idle);

    // The loop reached the far side of the figure
    let samples = harness.sink.samples(&result.run_id);
    let max_x = samples
        .iter()
        .filter(|s| s.drone_id == "d1")
        .map(|s| s.x)
        .fold(f64::NEG_INFINITY, f64::max);
    assert!(max_x > 0.5, "max x = {}", max_x);

    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn bad_requests_fail_before_creating_a_run() {
    let harness = Harness::start();

    let err = run_experiment(harness.state.clone(), "loop_the_loop", 2, 1.0, Default::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ExperimentError::UnknownScenario(_)));

    let err = run_experiment(harness.state.clone(), "figure_eight", 0, 1.0, Default::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ExperimentError::NotEnoughDrones { .. }));

    let err = run_experiment(harness.state.clone(), "takeoff_hover_land", 11, 1.0, Default::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ExperimentError::Swarm(_)));

    assert!(harness.state.run().is_none());
    harness.stop().await;
}
