//! Fixed-timestep flight dynamics for a single drone.
//!
//! One call to [`step`] advances a drone by `dt`: battery drain, the motion
//! model for its current status, sensor/actuator noise, then the battery and
//! workspace limit checks that may force [`DroneStatus::Error`].

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::Vec3;
use crate::models::{DroneState, DroneStatus};

/// Slack for comparing simulation times built from `ticks * dt`
const CLOCK_EPSILON: f64 = 1e-9;

/// Physical constants of the simulated airframe and workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicsConfig {
    /// Speed limit for every axis controller (m/s)
    pub max_speed: f64,
    /// Ceiling of the flight volume (m)
    pub max_height: f64,
    /// Half-width of the square workspace in x and y (m)
    pub workspace_bound: f64,
    /// Battery drain (% per second)
    pub battery_drain_rate: f64,
    /// Proportional gain of the vertical controller during takeoff/landing
    pub vertical_gain: f64,
    /// Distance at which a target or the ground counts as reached (m)
    pub arrival_tolerance: f64,
    /// Radius inside which cruise speed ramps down linearly (m)
    pub slowdown_radius: f64,
    pub position_noise_std: f64,
    pub velocity_noise_std: f64,
}

impl Default for DynamicsConfig {
    fn default() -> Self {
        Self {
            max_speed: 1.0,
            max_height: 1.0,
            workspace_bound: 2.0,
            battery_drain_rate: 0.1,
            vertical_gain: 2.0,
            arrival_tolerance: 0.05,
            slowdown_radius: 0.1,
            position_noise_std: 0.01,
            velocity_noise_std: 0.005,
        }
    }
}

impl DynamicsConfig {
    /// Same constants with sensor noise switched off.
    pub fn noiseless() -> Self {
        Self {
            position_noise_std: 0.0,
            velocity_noise_std: 0.0,
            ..Self::default()
        }
    }
}

/// Why a drone was forced into the error state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Fault {
    #[error("battery depleted")]
    BatteryDepleted,
    #[error("position outside workspace bounds")]
    BoundsViolation,
}

/// Gaussian noise source with optional deterministic seeding.
#[derive(Debug, Clone)]
pub struct NoiseModel {
    rng: SmallRng,
}

impl NoiseModel {
    /// Seed 0 draws from OS entropy; any other seed is reproducible.
    pub fn new(seed: u64) -> Self {
        let rng = if seed == 0 {
            SmallRng::from_os_rng()
        } else {
            SmallRng::seed_from_u64(seed)
        };
        Self { rng }
    }

    /// Zero-mean Gaussian sample with the given standard deviation.
    pub fn gaussian(&mut self, stddev: f64) -> f64 {
        if stddev == 0.0 {
            return 0.0;
        }
        let n: f64 = self.rng.sample(StandardNormal);
        n * stddev
    }

    fn perturb(&mut self, v: &mut Vec3, stddev: f64) {
        v.x += self.gaussian(stddev);
        v.y += self.gaussian(stddev);
        v.z += self.gaussian(stddev);
    }
}

/// Advance `drone` by one tick ending at simulation time `now`.
///
/// Returns the fault when this tick moved the drone into the error state.
pub fn step(
    drone: &mut DroneState,
    now: f64,
    dt: f64,
    config: &DynamicsConfig,
    noise: &mut NoiseModel,
) -> Option<Fault> {
    drone.battery = (drone.battery - config.battery_drain_rate * dt).max(0.0);

    match drone.status {
        DroneStatus::TakingOff => update_takeoff(drone, now, dt, config),
        DroneStatus::Flying => update_flying(drone, dt, config),
        DroneStatus::Landing => update_landing(drone, dt, config),
        DroneStatus::Idle | DroneStatus::Error => {}
    }

    // Noise accumulates on the integrated state for every drone, every tick
    noise.perturb(&mut drone.position, config.position_noise_std);
    noise.perturb(&mut drone.velocity, config.velocity_noise_std);
    // Ground contact
    drone.position.z = drone.position.z.max(0.0);

    drone.last_update = now;

    if drone.status == DroneStatus::Error {
        return None;
    }
    let fault = check_limits(drone, config)?;
    drone.status = DroneStatus::Error;
    Some(fault)
}

fn update_takeoff(drone: &mut DroneState, now: f64, dt: f64, config: &DynamicsConfig) {
    let phase = drone.takeoff;
    let elapsed = now - phase.start;
    drone.velocity.x = 0.0;
    drone.velocity.y = 0.0;

    if elapsed + CLOCK_EPSILON >= phase.duration {
        drone.position.z = phase.height;
        drone.velocity.z = 0.0;
        drone.status = DroneStatus::Flying;
        return;
    }

    let target_z = phase.height * (elapsed / phase.duration);
    drone.velocity.z = vertical_command(target_z - drone.position.z, config);
    drone.position.z += drone.velocity.z * dt;
}

fn update_flying(drone: &mut DroneState, dt: f64, config: &DynamicsConfig) {
    let delta = drone.target - drone.position;
    let distance = delta.length();

    if distance > config.arrival_tolerance {
        let speed = config.max_speed * (distance / config.slowdown_radius).min(1.0);
        drone.velocity = delta * (speed / distance);
        drone.position += drone.velocity * dt;
    } else {
        // Hold without snapping onto the target
        drone.velocity = Vec3::ZERO;
    }
}

fn update_landing(drone: &mut DroneState, dt: f64, config: &DynamicsConfig) {
    drone.velocity.x = 0.0;
    drone.velocity.y = 0.0;

    if drone.position.z.abs() > config.arrival_tolerance {
        drone.velocity.z = vertical_command(-drone.position.z, config);
        drone.position.z += drone.velocity.z * dt;
    } else {
        drone.position.z = 0.0;
        drone.velocity.z = 0.0;
        drone.status = DroneStatus::Idle;
    }
}

fn vertical_command(error: f64, config: &DynamicsConfig) -> f64 {
    (error * config.vertical_gain).clamp(-config.max_speed, config.max_speed)
}

/// Battery and workspace limits; battery takes precedence.
///
/// [`step`] floors `z` at the ground first, so the lower bound only trips for
/// states built outside the tick path.
pub fn check_limits(drone: &DroneState, config: &DynamicsConfig) -> Option<Fault> {
    if drone.battery <= 0.0 {
        return Some(Fault::BatteryDepleted);
    }

    let p = drone.position;
    let outside = p.x.abs() > config.workspace_bound
        || p.y.abs() > config.workspace_bound
        || p.z > config.max_height
        || p.z < 0.0;
    outside.then_some(Fault::BoundsViolation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TakeoffPhase;

    const DT: f64 = 0.05;

    fn run(drone: &mut DroneState, ticks: usize, start_tick: usize, config: &DynamicsConfig) {
        let mut noise = NoiseModel::new(7);
        for i in 1..=ticks {
            let now = (start_tick + i) as f64 * DT;
            step(drone, now, DT, config, &mut noise);
        }
    }

    fn taking_off(height: f64, duration: f64) -> DroneState {
        let mut drone = DroneState::new("d1", Vec3::ZERO);
        drone.status = DroneStatus::TakingOff;
        drone.takeoff = TakeoffPhase {
            start: 0.0,
            height,
            duration,
        };
        drone.target = Vec3::new(0.0, 0.0, height);
        drone
    }

    #[test]
    fn battery_drains_per_tick() {
        let config = DynamicsConfig::noiseless();
        let mut drone = DroneState::new("d1", Vec3::ZERO);

        run(&mut drone, 20, 0, &config);
        assert!((drone.battery - (100.0 - 0.1)).abs() < 1e-9);
    }

    #[test]
    fn takeoff_climbs_then_snaps_to_height() {
        let config = DynamicsConfig::noiseless();
        let mut drone = taking_off(0.6, 2.0);

        run(&mut drone, 20, 0, &config);
        assert_eq!(drone.status, DroneStatus::TakingOff);
        assert!(drone.position.z > 0.0 && drone.position.z < 0.6);

        run(&mut drone, 21, 20, &config);
        assert_eq!(drone.status, DroneStatus::Flying);
        assert!((drone.position.z - 0.6).abs() < 1e-9);
        assert_eq!(drone.velocity.z, 0.0);
    }

    #[test]
    fn zero_duration_takeoff_completes_on_first_tick() {
        let config = DynamicsConfig::noiseless();
        let mut drone = taking_off(0.5, 0.0);

        run(&mut drone, 1, 0, &config);
        assert_eq!(drone.status, DroneStatus::Flying);
        assert_eq!(drone.position.z, 0.5);
    }

    #[test]
    fn flying_moves_at_max_speed_then_holds() {
        let config = DynamicsConfig::noiseless();
        let mut drone = DroneState::new("d1", Vec3::new(0.0, 0.0, 0.5));
        drone.status = DroneStatus::Flying;
        drone.target = Vec3::new(1.0, 0.0, 0.5);

        run(&mut drone, 1, 0, &config);
        assert!((drone.velocity.x - 1.0).abs() < 1e-12);
        assert!((drone.position.x - 0.05).abs() < 1e-12);

        run(&mut drone, 200, 1, &config);
        let remaining = drone.target.distance(drone.position);
        assert!(remaining <= config.arrival_tolerance);
        assert!(remaining > 0.0, "holds without snapping");
        assert_eq!(drone.velocity, Vec3::ZERO);
        assert_eq!(drone.status, DroneStatus::Flying);
    }

    #[test]
    fn speed_ramps_down_near_target() {
        let config = DynamicsConfig::noiseless();
        let mut drone = DroneState::new("d1", Vec3::new(0.0, 0.0, 0.5));
        drone.status = DroneStatus::Flying;
        drone.target = Vec3::new(0.08, 0.0, 0.5);

        run(&mut drone, 1, 0, &config);
        assert!((drone.velocity.length() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn landing_reaches_ground_and_goes_idle() {
        let config = DynamicsConfig::noiseless();
        let mut drone = DroneState::new("d1", Vec3::new(0.3, 0.2, 0.6));
        drone.status = DroneStatus::Landing;
        drone.velocity = Vec3::new(0.4, 0.0, 0.0);

        run(&mut drone, 100, 0, &config);
        assert_eq!(drone.status, DroneStatus::Idle);
        assert_eq!(drone.position.z, 0.0);
        assert_eq!(drone.velocity, Vec3::ZERO);
        assert_eq!(drone.position.x, 0.3);
    }

    #[test]
    fn depleted_battery_forces_error() {
        let config = DynamicsConfig::noiseless();
        let mut drone = DroneState::new("d1", Vec3::ZERO);
        drone.battery = 0.001;

        let mut noise = NoiseModel::new(1);
        assert_eq!(step(&mut drone, DT, DT, &config, &mut noise), Some(Fault::BatteryDepleted));
        assert_eq!(drone.status, DroneStatus::Error);
        assert_eq!(drone.battery, 0.0);
    }

    #[test]
    fn leaving_workspace_forces_error() {
        let config = DynamicsConfig::noiseless();
        let mut drone = DroneState::new("d1", Vec3::new(1.99, 0.0, 0.5));
        drone.status = DroneStatus::Flying;
        drone.target = Vec3::new(3.0, 0.0, 0.5);

        let mut noise = NoiseModel::new(1);
        assert_eq!(step(&mut drone, DT, DT, &config, &mut noise), Some(Fault::BoundsViolation));
        assert_eq!(drone.status, DroneStatus::Error);
    }

    #[test]
    fn error_is_terminal() {
        let config = DynamicsConfig::noiseless();
        let mut drone = DroneState::new("d1", Vec3::new(0.0, 0.0, 0.5));
        drone.status = DroneStatus::Error;
        drone.target = Vec3::new(1.0, 0.0, 0.5);

        let mut noise = NoiseModel::new(1);
        for i in 1..50 {
            assert_eq!(step(&mut drone, i as f64 * DT, DT, &config, &mut noise), None);
        }
        assert_eq!(drone.status, DroneStatus::Error);
        assert_eq!(drone.position, Vec3::new(0.0, 0.0, 0.5));
    }

    #[test]
    fn noise_is_applied_to_idle_drones_and_is_seeded() {
        let config = DynamicsConfig::default();
        let mut a = DroneState::new("a", Vec3::new(0.0, 0.0, 0.5));
        let mut b = a.clone();

        let mut noise_a = NoiseModel::new(42);
        let mut noise_b = NoiseModel::new(42);
        step(&mut a, DT, DT, &config, &mut noise_a);
        step(&mut b, DT, DT, &config, &mut noise_b);

        assert_eq!(a.position, b.position);
        assert_ne!(a.position, Vec3::new(0.0, 0.0, 0.5));
        assert_ne!(a.velocity, Vec3::ZERO);
    }

    #[test]
    fn below_ground_state_fails_limit_check() {
        let config = DynamicsConfig::default();
        let drone = DroneState::new("d1", Vec3::new(0.0, 0.0, -0.01));
        assert_eq!(check_limits(&drone, &config), Some(Fault::BoundsViolation));
    }

    #[test]
    fn ground_contact_keeps_z_non_negative() {
        let config = DynamicsConfig::default();
        let mut drone = DroneState::new("d1", Vec3::ZERO);
        let mut noise = NoiseModel::new(3);

        for i in 1..200 {
            step(&mut drone, i as f64 * DT, DT, &config, &mut noise);
            assert!(drone.position.z >= 0.0);
        }
        assert_eq!(drone.status, DroneStatus::Idle);
    }
}
