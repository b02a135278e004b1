//! Logging setup and extraction counters

use std::sync::atomic::{AtomicU64, Ordering};

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, TelemetryConfig};

/// Install the global tracing subscriber. `RUST_LOG` overrides the configured filter.
pub fn init_tracing(config: &TelemetryConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match config.log_format {
        // The function runtime adds its own timestamps to every log line
        LogFormat::Json => builder
            .json()
            .with_current_span(false)
            .without_time()
            .with_target(false)
            .try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "Tracing subscriber already installed");
    }
}

/// Metrics handle for recording counters
#[derive(Debug, Default)]
pub struct Metrics {
    objects_extracted: AtomicU64,
    outputs_deleted: AtomicU64,
    rows_written: AtomicU64,
    cards_skipped: AtomicU64,
    events_ignored: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object_extracted(&self, rows: usize) {
        self.objects_extracted.fetch_add(1, Ordering::Relaxed);
        self.rows_written.fetch_add(rows as u64, Ordering::Relaxed);
        tracing::debug!(counter = "objects_extracted", rows, "Metric incremented");
    }

    pub fn output_deleted(&self) {
        self.outputs_deleted.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "outputs_deleted", "Metric incremented");
    }

    pub fn cards_skipped(&self, count: usize) {
        self.cards_skipped.fetch_add(count as u64, Ordering::Relaxed);
        tracing::debug!(counter = "cards_skipped", count, "Metric incremented");
    }

    pub fn event_ignored(&self) {
        self.events_ignored.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "events_ignored", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            objects_extracted: self.objects_extracted.load(Ordering::Relaxed),
            outputs_deleted: self.outputs_deleted.load(Ordering::Relaxed),
            rows_written: self.rows_written.load(Ordering::Relaxed),
            cards_skipped: self.cards_skipped.load(Ordering::Relaxed),
            events_ignored: self.events_ignored.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub objects_extracted: u64,
    pub outputs_deleted: u64,
    pub rows_written: u64,
    pub cards_skipped: u64,
    pub events_ignored: u64,
}
