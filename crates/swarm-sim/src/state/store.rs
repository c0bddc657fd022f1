//! Session object owning the swarm registry.
//!
//! Every command, query and tick takes the registry mutex for its duration,
//! so emergency stop and reset are serialized with tick execution and are
//! visible to the very next tick.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use indexmap::IndexMap;
use serde::Serialize;
use swarm_core::{
    CommandError, DroneState, FormationParams, PathPlanner, RunInfo, Swarm, Vec3,
};

use crate::config::Config;
use crate::telemetry::TelemetrySink;

/// Response of a create-swarm command.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwarmCreated {
    pub run_id: String,
    pub drones: Vec<String>,
}

pub struct SimState {
    swarm: Mutex<Swarm>,
    sink: Arc<dyn TelemetrySink>,
    planner: PathPlanner,
    config: Config,
}

impl SimState {
    pub fn new(config: Config, sink: Arc<dyn TelemetrySink>) -> Self {
        Self {
            swarm: Mutex::new(Swarm::new(config.swarm_config())),
            planner: config.planner(),
            sink,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Stateless planner shared with the validation surface.
    pub fn planner(&self) -> &PathPlanner {
        &self.planner
    }

    fn swarm(&self) -> MutexGuard<'_, Swarm> {
        // A panic mid-command leaves plain data behind; keep simulating
        self.swarm.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a new run with a timestamped run id.
    pub fn create_swarm(&self, count: usize) -> Result<SwarmCreated, CommandError> {
        let run_id = format!("run_{}", Utc::now().format("%Y%m%d_%H%M%S"));
        self.create_swarm_with_run_id(count, &run_id)
    }

    pub fn create_swarm_with_run_id(
        &self,
        count: usize,
        run_id: &str,
    ) -> Result<SwarmCreated, CommandError> {
        let drones = self.swarm().create_swarm(count, run_id)?;
        Ok(SwarmCreated {
            run_id: run_id.to_string(),
            drones,
        })
    }

    pub fn reset(&self) {
        self.swarm().reset();
    }

    pub fn takeoff(&self, drone_id: &str, height: f64, duration: f64) -> bool {
        accepted(self.swarm().takeoff(drone_id, height, duration))
    }

    /// `speed` is accepted but motion always uses the configured maximum speed.
    pub fn goto(&self, drone_id: &str, x: f64, y: f64, z: f64, speed: f64) -> bool {
        accepted(self.swarm().goto(drone_id, Vec3::new(x, y, z), speed))
    }

    pub fn land(&self, drone_id: &str) -> bool {
        accepted(self.swarm().land(drone_id))
    }

    pub fn set_formation(&self, name: &str, params: &FormationParams) -> bool {
        self.swarm().set_formation(name, params)
    }

    pub fn emergency_stop(&self) {
        self.swarm().emergency_stop();
    }

    pub fn get_state(&self, drone_id: &str) -> Option<DroneState> {
        self.swarm().get_state(drone_id).cloned()
    }

    /// Snapshot of every drone in creation order.
    pub fn get_all_states(&self) -> IndexMap<String, DroneState> {
        self.swarm().drones().clone()
    }

    pub fn run(&self) -> Option<RunInfo> {
        self.swarm().run().cloned()
    }

    /// Simulation time of the current run in seconds.
    pub fn now(&self) -> f64 {
        self.swarm().now()
    }

    /// Advance one tick and forward the telemetry batch to the sink.
    ///
    /// Returns the number of samples emitted.
    pub fn tick(&self) -> usize {
        let batch = self.swarm().tick(Utc::now());
        // Registry lock is released before the sink runs
        self.sink.record(&batch);
        batch.len()
    }
}

fn accepted(result: Result<(), CommandError>) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            tracing::debug!("Command rejected: {}", err);
            false
        }
    }
}
