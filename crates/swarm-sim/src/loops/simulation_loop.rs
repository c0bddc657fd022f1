//! Fixed-rate simulation loop.
//!
//! Ticks every drone in the registry, forwards telemetry, then sleeps for
//! whatever remains of the tick budget. An overrun tick is followed
//! immediately by the next one; lost time is never caught up.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::time::{sleep, Instant};

use crate::state::SimState;

pub async fn run_simulation_loop(state: Arc<SimState>, mut shutdown: broadcast::Receiver<()>) {
    let budget = state.config().tick_budget();
    tracing::info!(
        "Simulation loop started ({} Hz, speed x{})",
        state.config().tick_rate_hz,
        state.config().simulation_speed
    );

    let mut ticks: u64 = 0;
    loop {
        let started = Instant::now();
        state.tick();
        ticks += 1;

        let elapsed = started.elapsed();
        if elapsed > budget {
            tracing::debug!("Tick {} overran its budget ({:?} > {:?})", ticks, elapsed, budget);
        }

        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Simulation loop shutting down after {} ticks", ticks);
                break;
            }
            _ = sleep(budget.saturating_sub(elapsed)) => {}
        }
    }
}
