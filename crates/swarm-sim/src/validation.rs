//! Batch evaluation of the path planner.
//!
//! Each case is planned, timed and validated independently. A case that
//! produces an unsafe path is reported with `success = false`; only an
//! unknown algorithm name fails the whole batch.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use swarm_core::{PathPlanner, PathValidation, Vec3, Waypoint, ALGORITHM_NAME};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannerTestCase {
    pub start: Waypoint,
    pub goal: Waypoint,
    #[serde(default)]
    pub obstacles: Vec<Vec3>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseResult {
    pub test_case: PlannerTestCase,
    pub path: Vec<Waypoint>,
    pub planning_time_ms: f64,
    pub path_length_m: f64,
    pub success: bool,
    pub depth_exhausted: bool,
    pub validation: PathValidation,
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("unknown planning algorithm: {0}")]
    UnknownAlgorithm(String),
}

/// Run every case through the named algorithm, preserving input order.
pub fn validate_algorithm(
    planner: &PathPlanner,
    algorithm: &str,
    cases: &[PlannerTestCase],
) -> Result<Vec<CaseResult>, ValidationError> {
    if algorithm != ALGORITHM_NAME {
        return Err(ValidationError::UnknownAlgorithm(algorithm.to_string()));
    }

    let results: Vec<CaseResult> = cases.iter().map(|case| evaluate_case(planner, case)).collect();
    let passed = results.iter().filter(|r| r.success).count();
    tracing::info!(
        "Validated {} planner case(s) with {}: {} passed",
        results.len(),
        algorithm,
        passed
    );
    Ok(results)
}

pub fn evaluate_case(planner: &PathPlanner, case: &PlannerTestCase) -> CaseResult {
    let started = Instant::now();
    let planned = planner.plan(case.start, case.goal, &case.obstacles);
    let planning_time_ms = started.elapsed().as_secs_f64() * 1000.0;

    let validation = planner.validate_path(&planned.waypoints, &case.obstacles);
    if !validation.success {
        tracing::debug!(
            "Planner case {:?} -> {:?} unsafe (min separation {:.3})",
            case.start,
            case.goal,
            validation.min_separation
        );
    }

    CaseResult {
        test_case: case.clone(),
        path_length_m: validation.path_length,
        success: validation.success,
        depth_exhausted: planned.depth_exhausted,
        path: planned.waypoints,
        planning_time_ms,
        validation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(obstacles: Vec<Vec3>) -> PlannerTestCase {
        PlannerTestCase {
            start: Vec3::new(0.0, 0.0, 0.5),
            goal: Vec3::new(2.0, 0.0, 0.5),
            obstacles,
        }
    }

    #[test]
    fn unknown_algorithm_is_rejected() {
        let err = validate_algorithm(&PathPlanner::new(0.3), "a_star", &[case(vec![])]).unwrap_err();
        assert_eq!(err, ValidationError::UnknownAlgorithm("a_star".to_string()));
    }

    #[test]
    fn results_follow_input_order() {
        let planner = PathPlanner::new(0.3);
        let cases = vec![case(vec![]), case(vec![Vec3::new(1.0, 0.0, 0.5)])];
        let results = validate_algorithm(&planner, ALGORITHM_NAME, &cases).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].path.len(), 2);
        assert!((results[0].path_length_m - 2.0).abs() < 1e-9);
        assert_eq!(results[1].path.len(), 3);
        assert!(results.iter().all(|r| r.success && !r.depth_exhausted));
        assert!(results.iter().all(|r| r.planning_time_ms >= 0.0));
    }

    #[test]
    fn cases_parse_without_obstacles() {
        let case: PlannerTestCase =
            serde_json::from_str(r#"{"start":[0,0,0.5],"goal":[1,1,0.5]}"#).unwrap();
        assert!(case.obstacles.is_empty());
        assert_eq!(case.goal, Vec3::new(1.0, 1.0, 0.5));
    }

    #[test]
    fn result_keys_are_camel_case() {
        let planner = PathPlanner::new(0.3);
        let result = evaluate_case(&planner, &case(vec![]));
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("planningTimeMs").is_some());
        assert!(json.get("pathLengthM").is_some());
        assert_eq!(json["testCase"]["start"], serde_json::json!([0.0, 0.0, 0.5]));
    }
}
