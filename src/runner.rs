//! Bounded worker pools for the two fan-out stages.
//!
//! Both stages dispatch fire-and-forget jobs onto a fixed-size Rayon pool and
//! join them through a [`CompletionSignal`](crate::CompletionSignal) rather than
//! Rayon's own scopes, so the dispatcher can give up after a timeout while jobs keep
//! running.

use crate::relay::RelayHandle;
use anyhow::{Context, Result};
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Worker counts for each stage.
///
/// Deserialization holds whole source files plus their parsed records in memory,
/// so it defaults to half the cores; writing defaults to every core.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Parallelism {
    pub deserialize_workers: usize,
    pub write_workers: usize,
}

impl Parallelism {
    /// Derive both counts from a core count.
    #[must_use]
    pub fn from_cores(cores: usize) -> Self {
        Self {
            deserialize_workers: (cores / 2).max(1),
            write_workers: cores.max(1),
        }
    }
}

impl Default for Parallelism {
    fn default() -> Self {
        Self::from_cores(num_cpus::get())
    }
}

/// A fixed-size pool that runs detached jobs.
pub struct WorkerPool {
    pool: ThreadPool,
    workers: usize,
}

impl WorkerPool {
    /// Build a pool of `workers` threads named after `stage`.
    ///
    /// A panicking job is reported through `relay` instead of aborting the process.
    ///
    /// # Errors
    ///
    /// Returns an error if the threads cannot be spawned.
    pub fn new(stage: &'static str, workers: usize, relay: &RelayHandle) -> Result<Self> {
        let workers = workers.max(1);
        let panic_relay = relay.clone();
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(move |i| format!("s3access-{stage}-{i}"))
            .panic_handler(move |payload| {
                let what = payload
                    .downcast_ref::<&str>()
                    .map(ToString::to_string)
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                panic_relay.error(stage, format!("worker panicked: {what}"));
            })
            .build()
            .with_context(|| format!("build {stage} pool with {workers} worker(s)"))?;
        Ok(Self { pool, workers })
    }

    /// Queue a job. Returns immediately.
    pub fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.spawn(job);
    }

    #[must_use]
    pub const fn workers(&self) -> usize {
        self.workers
    }
}
