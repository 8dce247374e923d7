//! Metrics collection.
//!
//! # Metrics
//! - `krauter_queries_total` (counter): executed queries by backend, outcome
//! - `krauter_query_duration_seconds` (histogram): query latency by backend
//! - `krauter_requests_total` (counter): finalized requests by outcome
//!
//! # Design Decisions
//! - Thin wrappers over the `metrics` facade; a recorder is the embedder's choice
//! - Labels are static strings to keep cardinality bounded

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

static ENABLED: AtomicBool = AtomicBool::new(true);

/// Turn recording on or off process-wide.
pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Record one executed query.
pub fn record_query(backend: &'static str, ok: bool, start: Instant) {
    if !is_enabled() {
        return;
    }
    let outcome = if ok { "ok" } else { "error" };
    ::metrics::counter!("krauter_queries_total", "backend" => backend, "outcome" => outcome)
        .increment(1);
    ::metrics::histogram!("krauter_query_duration_seconds", "backend" => backend)
        .record(start.elapsed().as_secs_f64());
}

/// Record how a request left the router: `sent`, `result`, `error` or `forwarded`.
pub fn record_request(outcome: &'static str) {
    if !is_enabled() {
        return;
    }
    ::metrics::counter!("krauter_requests_total", "outcome" => outcome).increment(1);
}
