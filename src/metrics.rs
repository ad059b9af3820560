//! Prometheus metrics for the Lyceum engine.

use prometheus::{Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Global metrics instance.
static METRICS: std::sync::OnceLock<Arc<Metrics>> = std::sync::OnceLock::new();

/// Get or initialize the global metrics instance.
pub fn get_metrics() -> Arc<Metrics> {
    METRICS.get_or_init(|| Arc::new(Metrics::new())).clone()
}

/// Latency buckets from 1ms to 2.5s; intake is lexical, nothing slow.
fn intake_latency_buckets() -> Vec<f64> {
    vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
}

/// All metrics for the engine.
pub struct Metrics {
    /// Prometheus registry for all metrics.
    pub registry: Registry,

    /// Total query submissions received (all outcomes).
    pub queries_submitted_total: IntCounter,
    /// Submissions accepted as new pending queries.
    pub queries_accepted_total: IntCounter,
    /// Submissions resolved against an existing answered query.
    pub queries_auto_answered_total: IntCounter,
    /// Submissions rejected by the moderation filter.
    pub queries_rejected_moderation_total: IntCounter,
    /// Submissions rejected as off-topic.
    pub queries_rejected_off_topic_total: IntCounter,
    /// Answer transitions applied (first answers and re-edits).
    pub queries_answered_total: IntCounter,
    /// Notifications created.
    pub notifications_created_total: IntCounter,
    /// Rating upserts applied.
    pub ratings_recorded_total: IntCounter,
    /// Cascade deletes executed (course, teacher, or student).
    pub cascade_deletes_total: IntCounter,

    /// Intake pipeline latency.
    pub intake_duration_seconds: Histogram,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let queries_submitted_total = IntCounter::new(
            "lyceum_queries_submitted_total",
            "Total query submissions received",
        )
        .expect("metric definition");
        let queries_accepted_total = IntCounter::new(
            "lyceum_queries_accepted_total",
            "Submissions accepted as new pending queries",
        )
        .expect("metric definition");
        let queries_auto_answered_total = IntCounter::new(
            "lyceum_queries_auto_answered_total",
            "Submissions resolved against an existing answered query",
        )
        .expect("metric definition");
        let queries_rejected_moderation_total = IntCounter::new(
            "lyceum_queries_rejected_moderation_total",
            "Submissions rejected by the moderation filter",
        )
        .expect("metric definition");
        let queries_rejected_off_topic_total = IntCounter::new(
            "lyceum_queries_rejected_off_topic_total",
            "Submissions rejected as off-topic",
        )
        .expect("metric definition");
        let queries_answered_total = IntCounter::new(
            "lyceum_queries_answered_total",
            "Answer transitions applied",
        )
        .expect("metric definition");
        let notifications_created_total = IntCounter::new(
            "lyceum_notifications_created_total",
            "Notifications created",
        )
        .expect("metric definition");
        let ratings_recorded_total =
            IntCounter::new("lyceum_ratings_recorded_total", "Rating upserts applied")
                .expect("metric definition");
        let cascade_deletes_total = IntCounter::new(
            "lyceum_cascade_deletes_total",
            "Cascade deletes executed",
        )
        .expect("metric definition");

        let intake_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "lyceum_intake_duration_seconds",
                "Intake pipeline latency in seconds",
            )
            .buckets(intake_latency_buckets()),
        )
        .expect("metric definition");

        for collector in [
            Box::new(queries_submitted_total.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(queries_accepted_total.clone()),
            Box::new(queries_auto_answered_total.clone()),
            Box::new(queries_rejected_moderation_total.clone()),
            Box::new(queries_rejected_off_topic_total.clone()),
            Box::new(queries_answered_total.clone()),
            Box::new(notifications_created_total.clone()),
            Box::new(ratings_recorded_total.clone()),
            Box::new(cascade_deletes_total.clone()),
            Box::new(intake_duration_seconds.clone()),
        ] {
            registry.register(collector).expect("metric registration");
        }

        Self {
            registry,
            queries_submitted_total,
            queries_accepted_total,
            queries_auto_answered_total,
            queries_rejected_moderation_total,
            queries_rejected_off_topic_total,
            queries_answered_total,
            notifications_created_total,
            ratings_recorded_total,
            cascade_deletes_total,
            intake_duration_seconds,
            start_time: Instant::now(),
        }
    }

    /// Render all metrics in the Prometheus text exposition format.
    pub fn export(&self) -> String {
        let encoder = TextEncoder::new();
        encoder
            .encode_to_string(&self.registry.gather())
            .unwrap_or_default()
    }

    /// Seconds since this process started serving.
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Health report returned by the health endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

impl HealthStatus {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: get_metrics().uptime_seconds(),
        }
    }
}
