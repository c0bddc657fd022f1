//! Planner test cases: built-in set and JSON file loading.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use swarm_core::{PathPlanner, PlannerConfig, Vec3};
use swarm_sim::validation::PlannerTestCase;

/// A test case with a human-readable label.
pub struct NamedCase {
    pub name: &'static str,
    pub case: PlannerTestCase,
}

/// Reference cases covering clear, blocked and multi-obstacle segments.
pub fn builtin_cases() -> Vec<NamedCase> {
    vec![
        NamedCase {
            name: "clear",
            case: case([0.0, 0.0, 0.5], [2.0, 0.0, 0.5], &[]),
        },
        NamedCase {
            name: "single_obstacle",
            case: case([0.0, 0.0, 0.5], [2.0, 0.0, 0.5], &[[1.0, 0.0, 0.5]]),
        },
        NamedCase {
            name: "obstacle_at_midpoint",
            case: case([0.0, 0.0, 0.5], [1.0, 0.0, 0.5], &[[0.5, 0.0, 0.5]]),
        },
        NamedCase {
            name: "two_in_line",
            case: case(
                [0.0, 0.0, 0.5],
                [3.0, 0.0, 0.5],
                &[[1.0, 0.0, 0.5], [2.0, 0.0, 0.5]],
            ),
        },
        NamedCase {
            name: "diagonal_climb",
            case: case([-1.0, -1.0, 0.3], [1.0, 1.0, 0.8], &[[0.0, 0.0, 0.55]]),
        },
    ]
}

/// Load a JSON array of `{start, goal, obstacles?}` cases.
pub fn load_cases(path: &Path) -> Result<Vec<PlannerTestCase>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading test cases from {}", path.display()))?;
    parse_cases(&raw).with_context(|| format!("parsing test cases in {}", path.display()))
}

pub fn parse_cases(raw: &str) -> Result<Vec<PlannerTestCase>> {
    Ok(serde_json::from_str(raw)?)
}

/// Planner for a validation run; a bad safety radius is an error, not a fallback.
pub fn planner(safety_radius: f64, max_depth: Option<usize>) -> Result<PathPlanner> {
    let defaults = PlannerConfig::default();
    PathPlanner::try_with_config(PlannerConfig {
        safety_radius,
        max_detour_depth: max_depth.unwrap_or(defaults.max_detour_depth),
        ..defaults
    })
    .context("invalid --safety-radius")
}

fn case(start: [f64; 3], goal: [f64; 3], obstacles: &[[f64; 3]]) -> PlannerTestCase {
    PlannerTestCase {
        start: Vec3::from(start),
        goal: Vec3::from(goal),
        obstacles: obstacles.iter().copied().map(Vec3::from).collect(),
    }
}
