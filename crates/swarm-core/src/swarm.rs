//! Swarm registry: the drones of one run and the commands that mutate them.
//!
//! The registry owns the simulation clock. Phase timers are measured in
//! simulation seconds (`tick count * dt`), so a run replays identically for
//! a fixed noise seed regardless of wall-clock scheduling.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dynamics::{self, DynamicsConfig, NoiseModel};
use crate::formation::{compute_positions, FormationParams};
use crate::geometry::{Vec3, Waypoint};
use crate::models::{DroneState, DroneStatus, RunInfo, TakeoffPhase, TelemetrySample};

/// Run id used for telemetry emitted before any swarm was created.
pub const DEFAULT_RUN_ID: &str = "default";

/// Reasons a command is refused. Surfaced to callers as a plain `false`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("unknown drone {0}")]
    UnknownDrone(String),
    #[error("{command} rejected for {id}: drone is {status}")]
    InvalidTransition {
        id: String,
        command: &'static str,
        status: DroneStatus,
    },
    #[error("requested {requested} drones, maximum is {max}")]
    SwarmTooLarge { requested: usize, max: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmConfig {
    /// Fixed timestep in seconds
    pub dt: f64,
    pub max_drones: usize,
    /// 0 seeds the noise generator from OS entropy
    pub noise_seed: u64,
    pub dynamics: DynamicsConfig,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            dt: 0.05,
            max_drones: 10,
            noise_seed: 0,
            dynamics: DynamicsConfig::default(),
        }
    }
}

pub struct Swarm {
    config: SwarmConfig,
    noise: NoiseModel,
    run: Option<RunInfo>,
    drones: IndexMap<String, DroneState>,
    ticks: u64,
}

impl Default for Swarm {
    fn default() -> Self {
        Self::new(SwarmConfig::default())
    }
}

impl Swarm {
    pub fn new(config: SwarmConfig) -> Self {
        Self {
            noise: NoiseModel::new(config.noise_seed),
            config,
            run: None,
            drones: IndexMap::new(),
            ticks: 0,
        }
    }

    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    /// Current simulation time in seconds.
    pub fn now(&self) -> f64 {
        self.ticks as f64 * self.config.dt
    }

    pub fn run(&self) -> Option<&RunInfo> {
        self.run.as_ref()
    }

    pub fn run_id(&self) -> &str {
        self.run.as_ref().map(|r| r.id.as_str()).unwrap_or(DEFAULT_RUN_ID)
    }

    /// Start a new run with `count` idle drones `d1..dN` at the origin.
    ///
    /// Any previous run is discarded and the simulation clock restarts.
    pub fn create_swarm(&mut self, count: usize, run_id: &str) -> Result<Vec<String>, CommandError> {
        if count > self.config.max_drones {
            return Err(CommandError::SwarmTooLarge {
                requested: count,
                max: self.config.max_drones,
            });
        }

        self.drones.clear();
        self.ticks = 0;
        self.run = Some(RunInfo {
            id: run_id.to_string(),
            name: format!("Swarm of {} drones", count),
            started_at: Utc::now(),
        });

        let ids: Vec<String> = (1..=count).map(|i| format!("d{}", i)).collect();
        for id in &ids {
            self.drones.insert(id.clone(), DroneState::new(id.clone(), Vec3::ZERO));
        }

        tracing::info!("Created swarm of {} drones for run {}", count, run_id);
        Ok(ids)
    }

    /// Clear the whole registry.
    pub fn reset(&mut self) {
        let removed = self.drones.len();
        self.drones.clear();
        self.run = None;
        self.ticks = 0;
        tracing::info!("Swarm reset ({} drones removed)", removed);
    }

    pub fn len(&self) -> usize {
        self.drones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drones.is_empty()
    }

    pub fn get_state(&self, id: &str) -> Option<&DroneState> {
        self.drones.get(id)
    }

    /// All drones in creation order.
    pub fn drones(&self) -> &IndexMap<String, DroneState> {
        &self.drones
    }

    pub fn takeoff(&mut self, id: &str, height: f64, duration: f64) -> Result<(), CommandError> {
        let now = self.now();
        let drone = self.drone_mut(id)?;
        if drone.status != DroneStatus::Idle {
            return Err(invalid(drone, "takeoff"));
        }

        drone.status = DroneStatus::TakingOff;
        drone.takeoff = TakeoffPhase {
            start: now,
            height,
            duration,
        };
        // Hover above the takeoff point unless a goto says otherwise
        drone.target = Vec3::new(drone.position.x, drone.position.y, height);
        Ok(())
    }

    /// Set a new target. `_speed` is accepted for interface compatibility;
    /// motion always uses the configured maximum speed.
    pub fn goto(&mut self, id: &str, target: Waypoint, _speed: f64) -> Result<(), CommandError> {
        let drone = self.drone_mut(id)?;
        if !drone.status.is_airborne() {
            return Err(invalid(drone, "goto"));
        }

        drone.target = target;
        Ok(())
    }

    pub fn land(&mut self, id: &str) -> Result<(), CommandError> {
        let now = self.now();
        let drone = self.drone_mut(id)?;
        if !drone.status.is_airborne() {
            return Err(invalid(drone, "land"));
        }

        drone.status = DroneStatus::Landing;
        drone.land_start = now;
        Ok(())
    }

    /// Retarget every flying drone to the named formation, in registry order.
    ///
    /// Returns false when no drone is flying. Surplus drones (more flying
    /// than positions, e.g. an unknown formation) keep their target.
    pub fn set_formation(&mut self, name: &str, params: &FormationParams) -> bool {
        let flying: Vec<&mut DroneState> = self
            .drones
            .values_mut()
            .filter(|d| d.status == DroneStatus::Flying)
            .collect();
        if flying.is_empty() {
            return false;
        }

        let positions = compute_positions(name, flying.len(), params);
        let assigned = positions.len().min(flying.len());
        for (drone, position) in flying.into_iter().zip(positions) {
            drone.target = position;
        }

        tracing::debug!("Formation {} assigned to {} drone(s)", name, assigned);
        true
    }

    /// Zero velocity and force Idle for every drone, bypassing transition guards.
    pub fn emergency_stop(&mut self) {
        for drone in self.drones.values_mut() {
            drone.velocity = Vec3::ZERO;
            drone.status = DroneStatus::Idle;
        }
        tracing::warn!("Emergency stop applied to {} drone(s)", self.drones.len());
    }

    /// Advance every drone by one timestep and return the telemetry batch.
    pub fn tick(&mut self, timestamp: DateTime<Utc>) -> Vec<TelemetrySample> {
        self.ticks += 1;
        let now = self.now();
        let dt = self.config.dt;

        for drone in self.drones.values_mut() {
            if let Some(fault) =
                dynamics::step(drone, now, dt, &self.config.dynamics, &mut self.noise)
            {
                tracing::warn!("Drone {} entered error state: {}", drone.id, fault);
            }
        }

        let run_id = self.run_id();
        self.drones
            .values()
            .map(|drone| TelemetrySample::from_state(run_id, now, timestamp, drone))
            .collect()
    }

    fn drone_mut(&mut self, id: &str) -> Result<&mut DroneState, CommandError> {
        self.drones
            .get_mut(id)
            .ok_or_else(|| CommandError::UnknownDrone(id.to_string()))
    }
}

fn invalid(drone: &DroneState, command: &'static str) -> CommandError {
    CommandError::InvalidTransition {
        id: drone.id.clone(),
        command,
        status: drone.status,
    }
}
