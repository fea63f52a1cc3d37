//! Prometheus metrics for the ingestion worker.

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use clipdrop_models::Stage;

/// Install the recorder and serve `/metrics` on `port`.
///
/// Must be called from inside the tokio runtime.
pub fn init_metrics(port: u16) -> Result<(), BuildError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new().with_http_listener(addr).install()
}

/// Metric names as constants for consistency.
pub mod names {
    pub const ITEMS_ENQUEUED_TOTAL: &str = "clipdrop_items_enqueued_total";
    pub const ITEMS_COMPLETED_TOTAL: &str = "clipdrop_items_completed_total";
    pub const ITEMS_FAILED_TOTAL: &str = "clipdrop_items_failed_total";
    pub const QUEUE_LENGTH: &str = "clipdrop_queue_length";
    pub const STAGE_DURATION_SECONDS: &str = "clipdrop_stage_duration_seconds";
    pub const ITEM_DURATION_SECONDS: &str = "clipdrop_item_duration_seconds";
}

pub fn record_item_enqueued() {
    counter!(names::ITEMS_ENQUEUED_TOTAL).increment(1);
}

pub fn record_item_completed(category: &str, duration_secs: f64) {
    counter!(names::ITEMS_COMPLETED_TOTAL, "category" => category.to_string()).increment(1);
    histogram!(names::ITEM_DURATION_SECONDS, "outcome" => "completed").record(duration_secs);
}

pub fn record_item_failed(stage: Option<Stage>, kind: &str, duration_secs: f64) {
    let stage = stage.map(|s| s.as_str()).unwrap_or("unknown");
    counter!(
        names::ITEMS_FAILED_TOTAL,
        "stage" => stage,
        "kind" => kind.to_string()
    )
    .increment(1);
    histogram!(names::ITEM_DURATION_SECONDS, "outcome" => "failed").record(duration_secs);
}

pub fn record_stage_duration(stage: Stage, duration_secs: f64) {
    histogram!(names::STAGE_DURATION_SECONDS, "stage" => stage.as_str()).record(duration_secs);
}

pub fn set_queue_length(len: usize) {
    gauge!(names::QUEUE_LENGTH).set(len as f64);
}
