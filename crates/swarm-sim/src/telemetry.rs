//! Telemetry sinks fed by the simulation loop.
//!
//! The loop hands every tick's batch to a [`TelemetrySink`]. Sinks must not
//! block: [`MemorySink`] appends under a per-run shard lock and
//! [`ChannelSink`] drops batches when its bounded queue is full.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use swarm_core::TelemetrySample;
use tokio::sync::mpsc;

pub trait TelemetrySink: Send + Sync {
    /// Consume one tick's worth of samples.
    fn record(&self, batch: &[TelemetrySample]);
}

/// In-memory sample log keyed by run id.
#[derive(Default)]
pub struct MemorySink {
    runs: DashMap<String, Vec<TelemetrySample>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Samples of one run, ordered by time then drone id.
    pub fn samples(&self, run_id: &str) -> Vec<TelemetrySample> {
        let mut samples = self
            .runs
            .get(run_id)
            .map(|r| r.value().clone())
            .unwrap_or_default();
        samples.sort_by(|a, b| a.t.total_cmp(&b.t).then_with(|| a.drone_id.cmp(&b.drone_id)));
        samples
    }

    pub fn run_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.runs.iter().map(|r| r.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Total number of samples across all runs.
    pub fn len(&self) -> usize {
        self.runs.iter().map(|r| r.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.runs.clear();
    }
}

impl TelemetrySink for MemorySink {
    fn record(&self, batch: &[TelemetrySample]) {
        for sample in batch {
            self.runs
                .entry(sample.run_id.clone())
                .or_default()
                .push(sample.clone());
        }
    }
}

/// Forwards batches to an async consumer over a bounded channel.
pub struct ChannelSink {
    tx: mpsc::Sender<Vec<TelemetrySample>>,
    dropped: AtomicU64,
}

impl ChannelSink {
    /// Create a sink and the receiver its batches arrive on.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Vec<TelemetrySample>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                tx,
                dropped: AtomicU64::new(0),
            },
            rx,
        )
    }

    /// Batches discarded because the consumer fell behind or went away.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl TelemetrySink for ChannelSink {
    fn record(&self, batch: &[TelemetrySample]) {
        if batch.is_empty() {
            return;
        }
        match self.tx.try_send(batch.to_vec()) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if dropped.is_power_of_two() {
                    tracing::warn!("Telemetry consumer is lagging; {} batch(es) dropped", dropped);
                }
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Telemetry channel closed; batch dropped");
            }
        }
    }
}
