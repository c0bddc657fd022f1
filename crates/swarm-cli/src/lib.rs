//! Swarm CLI - command line tools for the swarm test bed.
//!
//! - run_experiment: run a scripted scenario against an in-process simulator
//! - validate_paths: batch-evaluate the path planner and print JSON results

pub mod cases;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Log to stderr so stdout stays machine-readable.
pub fn init_tracing(default_directive: &str) -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_directive.parse()?),
        )
        .init();
    Ok(())
}
