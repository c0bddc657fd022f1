//! Core data models for the swarm simulator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geometry::Vec3;

/// Flight status of a simulated drone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DroneStatus {
    /// On the ground (or stopped), not moving
    #[default]
    Idle,
    /// Climbing to the commanded takeoff height
    TakingOff,
    /// Airborne and tracking its target position
    Flying,
    /// Descending to the ground
    Landing,
    /// Battery depleted or out of bounds; terminal for the run
    Error,
}

impl DroneStatus {
    /// Wire name used in telemetry and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            DroneStatus::Idle => "idle",
            DroneStatus::TakingOff => "takingOff",
            DroneStatus::Flying => "flying",
            DroneStatus::Landing => "landing",
            DroneStatus::Error => "error",
        }
    }

    /// Airborne states that accept goto and land commands.
    pub fn is_airborne(&self) -> bool {
        matches!(self, DroneStatus::TakingOff | DroneStatus::Flying)
    }
}

impl fmt::Display for DroneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timers recorded when a takeoff is commanded (simulation seconds).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TakeoffPhase {
    pub start: f64,
    pub height: f64,
    pub duration: f64,
}

/// Full simulated state of one drone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DroneState {
    pub id: String,
    pub position: Vec3,
    pub velocity: Vec3,
    /// Percent, in [0, 100]
    pub battery: f64,
    pub status: DroneStatus,
    pub target: Vec3,
    pub takeoff: TakeoffPhase,
    pub land_start: f64,
    pub last_update: f64,
}

impl DroneState {
    /// A fully charged idle drone at `position`.
    pub fn new(id: impl Into<String>, position: Vec3) -> Self {
        Self {
            id: id.into(),
            position,
            velocity: Vec3::ZERO,
            battery: 100.0,
            status: DroneStatus::Idle,
            target: position,
            takeoff: TakeoffPhase::default(),
            land_start: 0.0,
            last_update: 0.0,
        }
    }
}

/// Bookkeeping for one swarm run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInfo {
    pub id: String,
    pub name: String,
    pub started_at: DateTime<Utc>,
}

/// One telemetry record per drone per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySample {
    pub run_id: String,
    /// Simulation time in seconds
    pub t: f64,
    pub timestamp: DateTime<Utc>,
    pub drone_id: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub vx: f64,
    pub vy: f64,
    pub vz: f64,
    pub battery: f64,
    pub status: DroneStatus,
}

impl TelemetrySample {
    pub fn from_state(run_id: &str, t: f64, timestamp: DateTime<Utc>, state: &DroneState) -> Self {
        Self {
            run_id: run_id.to_string(),
            t,
            timestamp,
            drone_id: state.id.clone(),
            x: state.position.x,
            y: state.position.y,
            z: state.position.z,
            vx: state.velocity.x,
            vy: state.velocity.y,
            vz: state.velocity.z,
            battery: state.battery,
            status: state.status,
        }
    }
}
