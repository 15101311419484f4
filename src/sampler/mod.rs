//! Background resource sampling.
//!
//! # Responsibilities
//! - Periodically read process memory, working-dir disk usage, and the
//!   live task count
//! - Emit each cycle as one batch of labeled gauges
//!
//! The loop runs for the process lifetime, decoupled from request
//! handling; it shares nothing with the handlers beyond read-only host
//! statistics. A failed stat read degrades that cycle to partial/zero
//! values and the loop continues.

pub mod stats;

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::config::SamplerConfig;
use crate::observability::metrics;

pub use stats::{ResourceSample, StatReader};

/// Application-identity label source, read at emission time.
pub const APP_LABEL_ENV: &str = "PROJECT_DOMAIN";

/// Instance/container-identity label source, read at emission time.
pub const INSTANCE_LABEL_ENV: &str = "HOSTNAME";

pub struct ResourceSampler {
    config: SamplerConfig,
    reader: StatReader,
}

impl ResourceSampler {
    pub fn new(config: SamplerConfig) -> Self {
        Self {
            config,
            reader: StatReader::new(),
        }
    }

    /// Run the sampling loop until shutdown. Never returns early on stat
    /// failures.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Resource sampler disabled");
            return;
        }

        tracing::info!(
            interval_secs = self.config.interval_secs,
            "Resource sampler starting"
        );

        let mut ticker = time::interval(Duration::from_secs(self.config.interval_secs));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sample_once();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Resource sampler received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    fn sample_once(&mut self) {
        let sample = self.reader.collect();
        let app = std::env::var(APP_LABEL_ENV).unwrap_or_default();
        let instance = std::env::var(INSTANCE_LABEL_ENV).unwrap_or_default();

        metrics::record_resource_usage(&sample, &app, &instance);

        tracing::debug!(
            memory_used_bytes = sample.memory_used_bytes,
            disk_used_bytes = sample.disk_used_bytes,
            disk_quota_bytes = sample.disk_quota_bytes,
            tasks_alive = sample.tasks_alive,
            "Resource sample emitted"
        );
    }
}
