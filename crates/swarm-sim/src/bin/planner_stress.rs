use swarm_core::geometry::Vec3;
use swarm_core::ALGORITHM_NAME;
use swarm_sim::config::Config;
use swarm_sim::validation::{validate_algorithm, PlannerTestCase};

struct StressCase {
    name: &'static str,
    case: PlannerTestCase,
}

fn main() {
    let config = Config::from_env();
    let planner = config.planner();
    let radius = planner.safety_radius();

    let cases = vec![
        StressCase {
            name: "Open corridor",
            case: case((0.0, 0.0, 0.5), (2.0, 0.0, 0.5), &[]),
        },
        StressCase {
            name: "Obstacle dead ahead",
            case: case((0.0, 0.0, 0.5), (2.0, 0.0, 0.5), &[(1.0, 0.0, 0.5)]),
        },
        StressCase {
            name: "Offset obstacle",
            case: case((0.0, 0.0, 0.5), (2.0, 0.0, 0.5), &[(1.0, 0.1, 0.5)]),
        },
        StressCase {
            name: "Climbing diagonal",
            case: case((-1.0, -1.0, 0.2), (1.0, 1.0, 0.9), &[(0.0, 0.0, 0.55)]),
        },
        StressCase {
            name: "Picket fence",
            case: case(
                (-1.5, 0.0, 0.5),
                (1.5, 0.0, 0.5),
                &[(-0.75, 0.0, 0.5), (0.0, 0.05, 0.5), (0.75, -0.05, 0.5)],
            ),
        },
        StressCase {
            name: "Stacked column",
            case: case(
                (0.0, -1.0, 0.5),
                (0.0, 1.0, 0.5),
                &[(0.0, 0.0, 0.3), (0.0, 0.0, 0.5), (0.0, 0.0, 0.7)],
            ),
        },
    ];

    let batch: Vec<PlannerTestCase> = cases.iter().map(|c| c.case.clone()).collect();
    let results = match validate_algorithm(&planner, ALGORITHM_NAME, &batch) {
        Ok(results) => results,
        Err(err) => {
            println!("Result: FAIL ({})", err);
            return;
        }
    };

    for (stress, result) in cases.iter().zip(results) {
        println!("\n=== {} ===", stress.name);
        println!(
            "Result: {} | waypoints={} length={:.3}m time={:.3}ms{}",
            if result.success { "OK" } else { "FAIL" },
            result.path.len(),
            result.path_length_m,
            result.planning_time_ms,
            if result.depth_exhausted { " (depth exhausted)" } else { "" }
        );

        let violations = find_clearance_violations(&result.path, &stress.case.obstacles, radius);
        if violations.is_empty() {
            println!("Clearance check: PASS");
        } else {
            println!("Clearance check: FAIL ({})", violations.len());
            for violation in violations {
                println!(" - {}", violation);
            }
        }
    }
}

fn case(start: (f64, f64, f64), goal: (f64, f64, f64), obstacles: &[(f64, f64, f64)]) -> PlannerTestCase {
    PlannerTestCase {
        start: Vec3::new(start.0, start.1, start.2),
        goal: Vec3::new(goal.0, goal.1, goal.2),
        obstacles: obstacles.iter().map(|&(x, y, z)| Vec3::new(x, y, z)).collect(),
    }
}

/// Sampled check, independent of the planner's closed-form segment distance.
fn find_clearance_violations(path: &[Vec3], obstacles: &[Vec3], radius: f64) -> Vec<String> {
    let mut violations = Vec::new();
    for obstacle in obstacles {
        let closest = path
            .windows(2)
            .map(|segment| sampled_distance(segment[0], segment[1], *obstacle))
            .fold(f64::INFINITY, f64::min);
        if closest < radius {
            violations.push(format!(
                "[{:.2}, {:.2}, {:.2}] within {:.3}m",
                obstacle.x, obstacle.y, obstacle.z, closest
            ));
        }
    }
    violations
}

fn sampled_distance(start: Vec3, end: Vec3, obstacle: Vec3) -> f64 {
    let samples = 200usize;
    (0..=samples)
        .map(|i| {
            let t = i as f64 / samples as f64;
            (start + (end - start) * t).distance(obstacle)
        })
        .fold(f64::INFINITY, f64::min)
}
