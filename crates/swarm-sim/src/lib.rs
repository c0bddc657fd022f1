//! Shared library surface for the swarm simulator binary, CLI tools and tests.

pub mod config;
pub mod experiments;
pub mod loops;
pub mod state;
pub mod telemetry;
pub mod validation;
