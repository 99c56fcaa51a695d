//! Metrics and observability utilities
//!
//! Provides recording helpers with standardized naming conventions.
//! Exporter wiring is left to the deployment; this module only feeds the
//! `metrics` facade.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};

/// Metrics prefix for all DocHub metrics
pub const METRICS_PREFIX: &str = "dochub";

/// Register all metric descriptions
pub fn register_metrics() {
    // Sync metrics
    describe_counter!(
        format!("{}_syncs_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of source syncs started"
    );

    describe_counter!(
        format!("{}_sync_files_failed_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of per-file failures across syncs"
    );

    describe_histogram!(
        format!("{}_sync_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "End-to-end sync duration in seconds"
    );

    // Embedding metrics
    describe_counter!(
        format!("{}_embeddings_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of chunk embeddings generated"
    );

    describe_histogram!(
        format!("{}_embedding_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Per-document embed pipeline duration in seconds"
    );

    // Search metrics
    describe_counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of search queries"
    );

    describe_histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Search query latency in seconds"
    );

    describe_gauge!(
        format!("{}_search_results_count", METRICS_PREFIX),
        Unit::Count,
        "Number of results returned from the last search"
    );

    // Chat metrics
    describe_counter!(
        format!("{}_chat_messages_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of chat messages processed"
    );

    describe_histogram!(
        format!("{}_chat_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Chat send latency in seconds"
    );
}

/// Record a completed sync
pub fn record_sync(duration_secs: f64, files_failed: usize) {
    counter!(format!("{}_syncs_total", METRICS_PREFIX)).increment(1);
    counter!(format!("{}_sync_files_failed_total", METRICS_PREFIX))
        .increment(files_failed as u64);
    histogram!(format!("{}_sync_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

/// Record a document embed pipeline run
pub fn record_embedding(duration_secs: f64, chunks: usize) {
    counter!(format!("{}_embeddings_total", METRICS_PREFIX)).increment(chunks as u64);
    histogram!(format!("{}_embedding_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

/// Record a search query
pub fn record_search(duration_secs: f64, results: usize) {
    counter!(format!("{}_search_queries_total", METRICS_PREFIX)).increment(1);
    histogram!(format!("{}_search_duration_seconds", METRICS_PREFIX)).record(duration_secs);
    gauge!(format!("{}_search_results_count", METRICS_PREFIX)).set(results as f64);
}

/// Record a chat send
pub fn record_chat(duration_secs: f64) {
    counter!(format!("{}_chat_messages_total", METRICS_PREFIX)).increment(1);
    histogram!(format!("{}_chat_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}
