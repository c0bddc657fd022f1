//! Evaluate the path planner over a batch of test cases.
//!
//! Usage:
//!   cargo run -p swarm-cli --bin validate_paths -- --file cases.json

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use serde::Serialize;

use swarm_cli::cases::{builtin_cases, load_cases, planner};
use swarm_core::ALGORITHM_NAME;
use swarm_sim::validation::{validate_algorithm, CaseResult};

#[derive(Parser, Debug)]
#[command(author, version, about = "Validate the swarm path planner")]
struct Args {
    /// JSON file with an array of {start, goal, obstacles} cases; built-ins when omitted
    #[arg(long)]
    file: Option<PathBuf>,

    /// Planning algorithm name
    #[arg(long, default_value = ALGORITHM_NAME)]
    algorithm: String,

    /// Minimum obstacle clearance in meters
    #[arg(long, default_value_t = 0.3)]
    safety_radius: f64,

    /// Recursion cap for the detour search
    #[arg(long)]
    max_depth: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    algorithm: String,
    total: usize,
    passed: usize,
    results: Vec<CaseResult>,
}

fn main() -> Result<()> {
    swarm_cli::init_tracing("swarm_sim=info")?;
    let args = Args::parse();

    let (names, cases): (Vec<String>, Vec<_>) = match &args.file {
        Some(path) => {
            let cases = load_cases(path)?;
            ((1..=cases.len()).map(|i| format!("case_{}", i)).collect(), cases)
        }
        None => builtin_cases()
            .into_iter()
            .map(|named| (named.name.to_string(), named.case))
            .unzip(),
    };

    let planner = planner(args.safety_radius, args.max_depth)?;

    let results = validate_algorithm(&planner, &args.algorithm, &cases)?;
    for (name, result) in names.iter().zip(&results) {
        eprintln!(
            "{:<24} {} waypoints={} length={:.3}m",
            name,
            if result.success { "PASS" } else { "FAIL" },
            result.path.len(),
            result.path_length_m
        );
    }

    let report = Report {
        algorithm: args.algorithm,
        total: results.len(),
        passed: results.iter().filter(|r| r.success).count(),
        results,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
