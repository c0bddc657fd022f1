//! Heuristic collision-avoidance planner for point obstacles.
//!
//! The planner keeps the direct segment when it clears every obstacle by the
//! safety radius. Otherwise it inserts a detour waypoint beside the obstacle
//! closest to the segment and recurses on both halves. It is neither optimal
//! nor complete: recursion is capped and an exhausted search returns a
//! best-effort path that may still violate clearance.

use crate::geometry::{closest_point_on_segment, path_length, point_segment_distance, Vec3, Waypoint};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name the validation surface accepts for this planner.
pub const ALGORITHM_NAME: &str = "simple_collision_avoidance";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Minimum clearance between any segment and any obstacle
    pub safety_radius: f64,
    /// Detour offset as a multiple of the safety radius
    pub detour_margin: f64,
    /// Maximum nesting of detour recursion before giving up
    pub max_detour_depth: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            safety_radius: 0.3,
            detour_margin: 1.5,
            max_detour_depth: 8,
        }
    }
}

impl PlannerConfig {
    /// The safety radius must be a positive, finite distance.
    pub fn validate(&self) -> Result<(), PlannerError> {
        if self.safety_radius.is_finite() && self.safety_radius > 0.0 {
            Ok(())
        } else {
            Err(PlannerError::InvalidSafetyRadius(self.safety_radius))
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PlannerError {
    #[error("safety radius must be positive and finite, got {0}")]
    InvalidSafetyRadius(f64),
}

/// Result of a planning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedPath {
    pub waypoints: Vec<Waypoint>,
    /// True when at least one sub-segment hit the recursion cap
    pub depth_exhausted: bool,
}

/// Safety and efficiency metrics for a path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub path_length: f64,
    /// Infinite when there are no obstacles (serialized as null)
    pub min_separation: f64,
    pub success: bool,
    pub waypoints: usize,
}

#[derive(Debug, Clone, Default)]
pub struct PathPlanner {
    config: PlannerConfig,
}

impl PathPlanner {
    /// Create a planner with the given safety radius and default margins.
    ///
    /// A radius that is not positive and finite is replaced by the default.
    pub fn new(safety_radius: f64) -> Self {
        Self::with_config(PlannerConfig {
            safety_radius,
            ..PlannerConfig::default()
        })
    }

    /// Like [`PathPlanner::try_with_config`], but falls back to the default
    /// safety radius (with a warning) instead of failing.
    pub fn with_config(mut config: PlannerConfig) -> Self {
        if let Err(err) = config.validate() {
            config.safety_radius = PlannerConfig::default().safety_radius;
            tracing::warn!("{}; using {} m", err, config.safety_radius);
        }
        Self { config }
    }

    pub fn try_with_config(config: PlannerConfig) -> Result<Self, PlannerError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn safety_radius(&self) -> f64 {
        self.config.safety_radius
    }

    /// Plan a path from `start` to `goal` avoiding `obstacles`.
    pub fn plan_path(&self, start: Waypoint, goal: Waypoint, obstacles: &[Vec3]) -> Vec<Waypoint> {
        self.plan(start, goal, obstacles).waypoints
    }

    /// Plan a path and report whether the detour search was exhausted.
    pub fn plan(&self, start: Waypoint, goal: Waypoint, obstacles: &[Vec3]) -> PlannedPath {
        if self.is_segment_clear(start, goal, obstacles) {
            return PlannedPath {
                waypoints: vec![start, goal],
                depth_exhausted: false,
            };
        }

        let mut depth_exhausted = false;
        let waypoints = self.detour_path(start, goal, obstacles, 0, &mut depth_exhausted);
        if depth_exhausted {
            tracing::warn!(
                "Detour search exhausted after depth {} ({} waypoints); path is best-effort",
                self.config.max_detour_depth,
                waypoints.len()
            );
        }

        PlannedPath {
            waypoints,
            depth_exhausted,
        }
    }

    /// Whether segment `a`-`b` keeps at least the safety radius from every obstacle.
    pub fn is_segment_clear(&self, a: Waypoint, b: Waypoint, obstacles: &[Vec3]) -> bool {
        obstacles
            .iter()
            .all(|&obstacle| point_segment_distance(a, b, obstacle) >= self.config.safety_radius)
    }

    fn detour_path(
        &self,
        start: Waypoint,
        goal: Waypoint,
        obstacles: &[Vec3],
        depth: usize,
        exhausted: &mut bool,
    ) -> Vec<Waypoint> {
        let closest = match closest_obstacle(start, goal, obstacles) {
            Some(obstacle) => obstacle,
            None => return vec![start, goal],
        };

        if depth >= self.config.max_detour_depth {
            *exhausted = true;
            return vec![start, goal];
        }

        let detour = self.detour_point(start, goal, closest);

        let mut first = if self.is_segment_clear(start, detour, obstacles) {
            vec![start, detour]
        } else {
            self.detour_path(start, detour, obstacles, depth + 1, exhausted)
        };
        let second = if self.is_segment_clear(detour, goal, obstacles) {
            vec![detour, goal]
        } else {
            self.detour_path(detour, goal, obstacles, depth + 1, exhausted)
        };

        // Both halves share the detour point
        first.pop();
        first.extend(second);
        first
    }

    /// Waypoint offset sideways from the obstacle's projection onto the segment.
    fn detour_point(&self, start: Waypoint, goal: Waypoint, obstacle: Vec3) -> Waypoint {
        let direction = goal - start;
        if direction.length_squared() == 0.0 {
            return start;
        }

        let projected = closest_point_on_segment(start, goal, obstacle);
        let offset = obstacle - projected;

        let perpendicular = direction.cross(offset).normalized().unwrap_or(
            // Obstacle lies on the segment's line
            if direction.z == 0.0 {
                Vec3::UNIT_Z
            } else {
                Vec3::UNIT_X
            },
        );

        projected + perpendicular * (self.config.safety_radius * self.config.detour_margin)
    }

    /// Validate a planned path for safety and efficiency.
    ///
    /// Never fails: a path with fewer than two waypoints is reported invalid.
    pub fn validate_path(&self, path: &[Waypoint], obstacles: &[Vec3]) -> PathValidation {
        if path.len() < 2 {
            return PathValidation {
                valid: false,
                reason: Some("Path too short".to_string()),
                path_length: 0.0,
                min_separation: f64::INFINITY,
                success: false,
                waypoints: path.len(),
            };
        }

        let min_separation = path
            .windows(2)
            .flat_map(|segment| {
                obstacles
                    .iter()
                    .map(move |&obstacle| point_segment_distance(segment[0], segment[1], obstacle))
            })
            .fold(f64::INFINITY, f64::min);

        let safe = min_separation >= self.config.safety_radius;

        PathValidation {
            valid: safe,
            reason: None,
            path_length: path_length(path),
            min_separation,
            success: safe,
            waypoints: path.len(),
        }
    }
}

/// Obstacle nearest to the segment; the first one wins ties.
fn closest_obstacle(start: Waypoint, goal: Waypoint, obstacles: &[Vec3]) -> Option<Vec3> {
    obstacles.iter().copied().min_by(|a, b| {
        point_segment_distance(start, goal, *a).total_cmp(&point_segment_distance(start, goal, *b))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planner() -> PathPlanner {
        PathPlanner::new(0.3)
    }

    #[test]
    fn clear_path_is_direct() {
        let start = Vec3::new(0.0, 0.0, 0.5);
        let goal = Vec3::new(2.0, 0.0, 0.5);

        let path = planner().plan_path(start, goal, &[]);
        assert_eq!(path, vec![start, goal]);

        // An obstacle outside the safety radius does not matter either
        let path = planner().plan_path(start, goal, &[Vec3::new(1.0, 0.31, 0.5)]);
        assert_eq!(path, vec![start, goal]);
    }

    #[test]
    fn single_obstacle_gets_one_detour() {
        let start = Vec3::new(0.0, 0.0, 0.5);
        let goal = Vec3::new(2.0, 0.0, 0.5);
        let obstacles = [Vec3::new(1.0, 0.0, 0.5)];
        let planner = planner();

        let planned = planner.plan(start, goal, &obstacles);
        assert!(!planned.depth_exhausted);
        let path = planned.waypoints;
        assert_eq!(path.len(), 3);
        assert_eq!(path[0], start);
        assert_eq!(path[2], goal);

        // Obstacle is collinear, so the detour uses the vertical fallback axis
        let middle = path[1];
        assert!((middle.x - 1.0).abs() < 1e-9);
        assert!(middle.y.abs() < 1e-9);
        assert!((middle.z - 0.5 - 1.5 * 0.3).abs() < 1e-9);

        let report = planner.validate_path(&path, &obstacles);
        assert!(report.valid);
        assert!(report.min_separation >= planner.safety_radius());
    }

    #[test]
    fn detour_is_perpendicular_to_offset_obstacle() {
        let start = Vec3::new(0.0, 0.0, 0.5);
        let goal = Vec3::new(2.0, 0.0, 0.5);
        let obstacles = [Vec3::new(1.0, 0.1, 0.5)];
        let planner = planner();

        let path = planner.plan_path(start, goal, &obstacles);
        assert!(path.len() >= 3);
        // cross((2,0,0), (0,0.1,0)) points along +Z
        assert!(path[1].z > 0.5);
        assert!(planner.validate_path(&path, &obstacles).valid);
    }

    #[test]
    fn multiple_obstacles_keep_endpoints() {
        let start = Vec3::new(0.0, 0.0, 0.5);
        let goal = Vec3::new(3.0, 0.0, 0.5);
        let obstacles = [Vec3::new(1.0, 0.0, 0.5), Vec3::new(2.0, 0.0, 0.5)];
        let planner = planner();

        let planned = planner.plan(start, goal, &obstacles);
        let path = &planned.waypoints;
        assert!(path.len() >= 3);
        assert_eq!(path[0], start);
        assert_eq!(*path.last().unwrap(), goal);
        if !planned.depth_exhausted {
            assert!(planner.validate_path(path, &obstacles).min_separation >= 0.3);
        }
    }

    #[test]
    fn detour_points_stay_outside_safety_radius() {
        let start = Vec3::new(0.0, 0.0, 0.5);
        let goal = Vec3::new(1.0, 0.0, 0.5);
        let obstacle = Vec3::new(0.5, 0.0, 0.5);
        let planner = planner();

        let path = planner.plan_path(start, goal, &[obstacle]);
        for point in &path[1..path.len() - 1] {
            assert!(point.distance(obstacle) >= planner.safety_radius());
        }
    }

    #[test]
    fn unreachable_clearance_terminates_at_depth_cap() {
        // Obstacle sits on the start point: no segment leaving start can ever clear it
        let start = Vec3::new(0.0, 0.0, 0.5);
        let goal = Vec3::new(1.0, 0.0, 0.5);
        let planner = planner();

        let planned = planner.plan(start, goal, &[start]);
        assert!(planned.depth_exhausted);
        assert_eq!(planned.waypoints.first(), Some(&start));
        assert_eq!(planned.waypoints.last(), Some(&goal));
        assert!(!planner.validate_path(&planned.waypoints, &[start]).valid);
    }

    #[test]
    fn identical_start_and_goal_near_obstacle() {
        let point = Vec3::new(0.0, 0.0, 0.5);
        let planned = planner().plan(point, point, &[Vec3::new(0.1, 0.0, 0.5)]);
        assert!(planned.depth_exhausted);
        assert!(planned.waypoints.iter().all(|w| *w == point));
    }

    #[test]
    fn validation_without_obstacles() {
        let path = [
            Vec3::new(0.0, 0.0, 0.5),
            Vec3::new(1.0, 0.0, 0.5),
            Vec3::new(2.0, 0.0, 0.5),
        ];
        let report = planner().validate_path(&path, &[]);

        assert!(report.valid);
        assert!(report.success);
        assert!((report.path_length - 2.0).abs() < 1e-12);
        assert_eq!(report.min_separation, f64::INFINITY);
        assert_eq!(report.waypoints, 3);
    }

    #[test]
    fn validation_detects_collision() {
        let path = [
            Vec3::new(0.0, 0.0, 0.5),
            Vec3::new(1.0, 0.0, 0.5),
            Vec3::new(2.0, 0.0, 0.5),
        ];
        let report = planner().validate_path(&path, &[Vec3::new(1.0, 0.0, 0.5)]);

        assert!(!report.valid);
        assert!(!report.success);
        assert!(report.min_separation < 0.3);
    }

    #[test]
    fn empty_path_is_too_short() {
        let report = planner().validate_path(&[], &[]);

        assert!(!report.valid);
        assert!(!report.success);
        assert_eq!(report.reason.as_deref(), Some("Path too short"));
        assert_eq!(report.path_length, 0.0);
    }

    #[test]
    fn non_positive_radius_is_rejected() {
        for radius in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = PlannerConfig {
                safety_radius: radius,
                ..PlannerConfig::default()
            };
            assert!(matches!(
                PathPlanner::try_with_config(config),
                Err(PlannerError::InvalidSafetyRadius(_))
            ));
        }
        assert!(PathPlanner::try_with_config(PlannerConfig::default()).is_ok());
    }

    #[test]
    fn invalid_radius_falls_back_and_still_avoids_obstacles() {
        let planner = PathPlanner::new(-1.0);
        assert_eq!(planner.safety_radius(), 0.3);

        let start = Vec3::new(0.0, 0.0, 0.5);
        let goal = Vec3::new(2.0, 0.0, 0.5);
        let obstacles = [Vec3::new(1.0, 0.0, 0.5)];
        assert!(!planner.validate_path(&[start, goal], &obstacles).valid);
        assert!(planner.plan_path(start, goal, &obstacles).len() > 2);
    }

    #[test]
    fn report_without_obstacles_serializes_null_separation() {
        let path = [Vec3::new(0.0, 0.0, 0.5), Vec3::new(1.0, 0.0, 0.5)];
        let json = serde_json::to_value(planner().validate_path(&path, &[])).unwrap();
        assert!(json["minSeparation"].is_null());
        assert_eq!(json["pathLength"], 1.0);
    }

    #[test]
    fn validation_is_deterministic() {
        let path = [Vec3::new(0.0, 0.0, 0.5), Vec3::new(2.0, 0.4, 0.5)];
        let obstacles = [Vec3::new(1.0, 0.0, 0.5), Vec3::new(0.5, 0.5, 0.2)];
        let planner = planner();

        assert_eq!(
            planner.validate_path(&path, &obstacles),
            planner.validate_path(&path, &obstacles)
        );
    }
}
