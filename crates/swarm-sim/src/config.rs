//! Simulator configuration from environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use swarm_core::{DynamicsConfig, PathPlanner, PlannerConfig, SwarmConfig};

#[derive(Debug, Clone)]
pub struct Config {
    /// Nominal tick rate; dt is its reciprocal
    pub tick_rate_hz: f64,
    /// Wall-clock speed-up factor (2.0 runs twice as fast as real time)
    pub simulation_speed: f64,
    pub max_drones: usize,
    pub safety_radius: f64,
    /// 0 seeds sensor noise from OS entropy
    pub noise_seed: u64,
    /// Bounded queue size for channel telemetry sinks (batches)
    pub telemetry_capacity: usize,
    /// Scenario the server binary runs right after startup, if any
    pub startup_scenario: Option<String>,
    pub startup_scenario_drones: usize,
    pub startup_scenario_duration_secs: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_rate_hz: 20.0,
            simulation_speed: 1.0,
            max_drones: 10,
            safety_radius: 0.3,
            noise_seed: 0,
            telemetry_capacity: 1024,
            startup_scenario: None,
            startup_scenario_drones: 3,
            startup_scenario_duration_secs: 10.0,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            tick_rate_hz: positive("SWARM_TICK_RATE_HZ").unwrap_or(defaults.tick_rate_hz),
            simulation_speed: positive("SWARM_SIMULATION_SPEED")
                .unwrap_or(defaults.simulation_speed),
            max_drones: parsed("SWARM_MAX_DRONES").unwrap_or(defaults.max_drones),
            safety_radius: positive("SWARM_SAFETY_RADIUS").unwrap_or(defaults.safety_radius),
            noise_seed: parsed("SWARM_NOISE_SEED").unwrap_or(defaults.noise_seed),
            telemetry_capacity: parsed("SWARM_TELEMETRY_CAPACITY")
                .filter(|&n: &usize| n > 0)
                .unwrap_or(defaults.telemetry_capacity),
            startup_scenario: env::var("SWARM_SCENARIO").ok().filter(|s| !s.is_empty()),
            startup_scenario_drones: parsed("SWARM_SCENARIO_DRONES")
                .unwrap_or(defaults.startup_scenario_drones),
            startup_scenario_duration_secs: positive("SWARM_SCENARIO_DURATION")
                .unwrap_or(defaults.startup_scenario_duration_secs),
        }
    }

    /// Fixed simulation timestep in seconds.
    pub fn dt(&self) -> f64 {
        1.0 / self.tick_rate_hz
    }

    /// Wall-clock budget of one tick after applying the speed-up factor.
    pub fn tick_budget(&self) -> Duration {
        Duration::try_from_secs_f64(self.dt() / self.simulation_speed).unwrap_or(Duration::ZERO)
    }

    pub fn swarm_config(&self) -> SwarmConfig {
        SwarmConfig {
            dt: self.dt(),
            max_drones: self.max_drones,
            noise_seed: self.noise_seed,
            dynamics: DynamicsConfig::default(),
        }
    }

    pub fn planner(&self) -> PathPlanner {
        PathPlanner::with_config(PlannerConfig {
            safety_radius: self.safety_radius,
            ..PlannerConfig::default()
        })
    }
}

fn parsed<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn positive(key: &str) -> Option<f64> {
    parsed::<f64>(key).filter(|v| v.is_finite() && *v > 0.0)
}
