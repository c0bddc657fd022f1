pub mod dynamics;
pub mod formation;
pub mod geometry;
pub mod models;
pub mod planner;
pub mod swarm;

pub use dynamics::{DynamicsConfig, Fault, NoiseModel};
pub use formation::{compute_positions, Formation, FormationParams};
pub use geometry::{Vec3, Waypoint};
pub use models::{DroneState, DroneStatus, RunInfo, TakeoffPhase, TelemetrySample};
pub use planner::{
    PathPlanner, PathValidation, PlannedPath, PlannerConfig, PlannerError, ALGORITHM_NAME,
};
pub use swarm::{CommandError, Swarm, SwarmConfig, DEFAULT_RUN_ID};
