//! Scripted experiment scenarios.
//!
//! An experiment is a command-and-wait script. It talks to the swarm only
//! through the [`SimState`] command contract and never touches drone state
//! directly, so the simulation loop stays the single writer of physics.
//! Scripts run as tokio tasks; their waits never hold the registry lock.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use swarm_core::{CommandError, FormationParams};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use uuid::Uuid;

use crate::state::SimState;

const TAKEOFF_DURATION_SECS: f64 = 2.0;
/// Wait after the takeoff command before the scenario proper starts
const SETTLE_SECS: f64 = 3.0;
const FIGURE_EIGHT_HEIGHT: f64 = 0.6;
const FIGURE_EIGHT_SPEED: f64 = 0.5;
const FIGURE_EIGHT_WAYPOINTS: [(f64, f64, f64); 5] = [
    (0.0, 0.0, 0.6),
    (1.0, 0.5, 0.6),
    (0.0, 1.0, 0.6),
    (-1.0, 0.5, 0.6),
    (0.0, 0.0, 0.6),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    /// All drones take off and hold a circle formation
    CircularFormation,
    /// The first drone flies a figure-eight waypoint loop
    FigureEight,
    /// All drones take off, hover and land
    TakeoffHoverLand,
}

impl Scenario {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::CircularFormation => "circular_formation",
            Scenario::FigureEight => "figure_eight",
            Scenario::TakeoffHoverLand => "takeoff_hover_land",
        }
    }

    fn run_prefix(&self) -> &'static str {
        match self {
            Scenario::CircularFormation => "circular",
            Scenario::FigureEight => "figure8",
            Scenario::TakeoffHoverLand => "hover",
        }
    }
}

impl FromStr for Scenario {
    type Err = ExperimentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "circular_formation" => Ok(Scenario::CircularFormation),
            "figure_eight" => Ok(Scenario::FigureEight),
            "takeoff_hover_land" => Ok(Scenario::TakeoffHoverLand),
            other => Err(ExperimentError::UnknownScenario(other.to_string())),
        }
    }
}

/// Optional scenario parameters; each scenario picks its own defaults.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentParams {
    pub radius: Option<f64>,
    pub height: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentResult {
    pub scenario: String,
    pub run_id: String,
    /// Requested scenario duration in seconds
    pub duration: f64,
    pub success: bool,
}

#[derive(Debug, Error)]
pub enum ExperimentError {
    #[error("unknown scenario: {0}")]
    UnknownScenario(String),
    #[error("{scenario} needs at least {required} drone(s), got {requested}")]
    NotEnoughDrones {
        scenario: &'static str,
        required: usize,
        requested: usize,
    },
    #[error("could not create swarm: {0}")]
    Swarm(#[from] CommandError),
    #[error("experiment task failed: {0}")]
    Task(String),
}

/// Run a named scenario to completion on the current task.
pub async fn run_experiment(
    state: Arc<SimState>,
    scenario: &str,
    count: usize,
    duration_secs: f64,
    params: ExperimentParams,
) -> Result<ExperimentResult, ExperimentError> {
    let scenario = scenario.parse::<Scenario>()?;
    // Sender stays alive for the whole run, so the script is never cancelled
    let (_cancel, cancel_rx) = watch::channel(false);
    Script::new(state, cancel_rx)
        .run(scenario, count, duration_secs, params)
        .await
}

/// Handle to an experiment running on its own task.
pub struct ExperimentHandle {
    id: Uuid,
    scenario: Scenario,
    cancel: watch::Sender<bool>,
    task: JoinHandle<Result<ExperimentResult, ExperimentError>>,
}

impl ExperimentHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn scenario(&self) -> Scenario {
        self.scenario
    }

    /// Interrupt the current wait; the script lands its drones and reports failure.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn join(self) -> Result<ExperimentResult, ExperimentError> {
        self.task
            .await
            .map_err(|err| ExperimentError::Task(err.to_string()))?
    }
}

/// Spawn a scenario as an independent, cancellable task.
pub fn spawn_experiment(
    state: Arc<SimState>,
    scenario: Scenario,
    count: usize,
    duration_secs: f64,
    params: ExperimentParams,
) -> ExperimentHandle {
    let id = Uuid::new_v4();
    let (cancel, cancel_rx) = watch::channel(false);
    tracing::info!("Spawning experiment {} ({})", id, scenario.as_str());

    let task = tokio::spawn(async move {
        Script::new(state, cancel_rx)
            .run(scenario, count, duration_secs, params)
            .await
    });

    ExperimentHandle {
        id,
        scenario,
        cancel,
        task,
    }
}

struct Script {
    state: Arc<SimState>,
    cancel: watch::Receiver<bool>,
    detached: bool,
}

impl Script {
    fn new(state: Arc<SimState>, cancel: watch::Receiver<bool>) -> Self {
        Self {
            state,
            cancel,
            detached: false,
        }
    }

    async fn run(
        mut self,
        scenario: Scenario,
        count: usize,
        duration_secs: f64,
        params: ExperimentParams,
    ) -> Result<ExperimentResult, ExperimentError> {
        if scenario == Scenario::FigureEight && count < 1 {
            return Err(ExperimentError::NotEnoughDrones {
                scenario: scenario.as_str(),
                required: 1,
                requested: count,
            });
        }

        let run_id = format!("{}_{}", scenario.run_prefix(), Utc::now().timestamp());
        let drones = self.state.create_swarm_with_run_id(count, &run_id)?.drones;
        tracing::info!("Experiment {} started with run {}", scenario.as_str(), run_id);

        let completed = match scenario {
            Scenario::CircularFormation => {
                self.circular_formation(&drones, duration_secs, params).await
            }
            Scenario::FigureEight => self.figure_eight(&drones[0], duration_secs).await,
            Scenario::TakeoffHoverLand => {
                self.takeoff_hover_land(&drones, duration_secs, params).await
            }
        };

        if completed {
            tracing::info!("Experiment {} finished (run {})", scenario.as_str(), run_id);
        } else {
            tracing::warn!("Experiment {} cancelled; landing drones", scenario.as_str());
            self.land_all(&drones);
        }

        Ok(ExperimentResult {
            scenario: scenario.as_str().to_string(),
            run_id,
            duration: duration_secs,
            success: completed,
        })
    }

    async fn circular_formation(
        &mut self,
        drones: &[String],
        duration_secs: f64,
        params: ExperimentParams,
    ) -> bool {
        let height = params.height.unwrap_or(0.5);
        let formation = FormationParams {
            radius: params.radius.unwrap_or(1.0),
            height,
            ..FormationParams::default()
        };

        self.takeoff_all(drones, height);
        if !self.wait(SETTLE_SECS).await {
            return false;
        }
        self.state.set_formation("circle", &formation);
        if !self.wait(duration_secs).await {
            return false;
        }
        self.land_all(drones);
        true
    }

    async fn figure_eight(&mut self, drone: &str, duration_secs: f64) -> bool {
        self.state.takeoff(drone, FIGURE_EIGHT_HEIGHT, TAKEOFF_DURATION_SECS);
        if !self.wait(SETTLE_SECS).await {
            return false;
        }

        let leg_secs = duration_secs / FIGURE_EIGHT_WAYPOINTS.len() as f64;
        for (x, y, z) in FIGURE_EIGHT_WAYPOINTS {
            self.state.goto(drone, x, y, z, FIGURE_EIGHT_SPEED);
            if !self.wait(leg_secs).await {
                return false;
            }
        }

        self.state.land(drone);
        true
    }

    async fn takeoff_hover_land(
        &mut self,
        drones: &[String],
        duration_secs: f64,
        params: ExperimentParams,
    ) -> bool {
        self.takeoff_all(drones, params.height.unwrap_or(0.6));
        if !self.wait(SETTLE_SECS).await {
            return false;
        }
        if !self.wait(duration_secs).await {
            return false;
        }
        self.land_all(drones);
        true
    }

    fn takeoff_all(&self, drones: &[String], height: f64) {
        for id in drones {
            self.state.takeoff(id, height, TAKEOFF_DURATION_SECS);
        }
    }

    fn land_all(&self, drones: &[String]) {
        for id in drones {
            self.state.land(id);
        }
    }

    /// Sleep for `secs`; false when cancelled first.
    async fn wait(&mut self, secs: f64) -> bool {
        if *self.cancel.borrow() {
            return false;
        }

        let pause = sleep(Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO));
        tokio::pin!(pause);

        loop {
            tokio::select! {
                _ = &mut pause => return true,
                changed = self.cancel.changed(), if !self.detached => match changed {
                    Ok(()) if *self.cancel.borrow() => return false,
                    Ok(()) => {}
                    // Handle dropped without cancelling: run to completion
                    Err(_) => self.detached = true,
                },
            }
        }
    }
}
