//! Shared simulation session state.

mod store;

pub use store::{SimState, SwarmCreated};
