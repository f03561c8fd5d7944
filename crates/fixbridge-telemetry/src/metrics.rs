//! Prometheus metrics for the fixbridge pipeline.
//!
//! Covers the three scheduler loops:
//! - Dispatch: orders handed to the transport, send failures, session state
//! - Flush: buffered reports, batch writes, persistence failures
//! - Notify: fan-out counts per scope, subscriber count
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.
//! These panics only occur during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_int_counter, register_int_gauge, CounterVec, Encoder,
    IntCounter, IntGauge, TextEncoder,
};

use crate::error::{TelemetryError, TelemetryResult};

/// Total orders handed to the transport.
/// Labels: kind (new/replace/cancel)
pub static ORDERS_DISPATCHED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fixbridge_orders_dispatched_total",
        "Total orders handed to the venue transport",
        &["kind"]
    )
    .unwrap()
});

/// Total transport send failures.
/// Labels: kind (new/replace/cancel)
pub static DISPATCH_SEND_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fixbridge_dispatch_send_failures_total",
        "Total transport send failures during dispatch",
        &["kind"]
    )
    .unwrap()
});

/// Venue session state (1 = up, 0 = down).
pub static SESSION_UP: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("fixbridge_session_up", "Venue session state (1=up)").unwrap()
});

/// Total orders accepted at the HTTP intake.
/// Labels: kind (new/replace/cancel)
pub static ORDERS_ACCEPTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fixbridge_orders_accepted_total",
        "Total orders accepted at the HTTP intake",
        &["kind"]
    )
    .unwrap()
});

/// Total execution reports added to the intake buffer.
pub static REPORTS_BUFFERED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "fixbridge_reports_buffered_total",
        "Total execution reports added to the intake buffer"
    )
    .unwrap()
});

/// Current intake buffer depth.
pub static REPORT_BUFFER_DEPTH: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "fixbridge_report_buffer_depth",
        "Execution reports currently buffered awaiting flush"
    )
    .unwrap()
});

/// Total report batches durably written.
pub static REPORT_BATCHES_FLUSHED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "fixbridge_report_batches_flushed_total",
        "Total report batches durably written"
    )
    .unwrap()
});

/// Total individual reports durably written.
pub static REPORTS_FLUSHED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "fixbridge_reports_flushed_total",
        "Total execution reports durably written"
    )
    .unwrap()
});

/// Total failed flush attempts.
pub static FLUSH_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "fixbridge_flush_failures_total",
        "Total failed report batch writes"
    )
    .unwrap()
});

/// Total notifications emitted.
/// Labels: scope (broadcast/group)
pub static NOTIFICATIONS_SENT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fixbridge_notifications_sent_total",
        "Total report notifications emitted",
        &["scope"]
    )
    .unwrap()
});

/// Total failed notification emits.
/// Labels: scope (broadcast/group)
pub static NOTIFICATION_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "fixbridge_notification_failures_total",
        "Total failed report notification emits",
        &["scope"]
    )
    .unwrap()
});

/// Currently connected WebSocket subscribers.
pub static SUBSCRIBERS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "fixbridge_subscribers",
        "Currently connected WebSocket subscribers"
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record an order handed to the transport.
    pub fn order_dispatched(kind: &str) {
        ORDERS_DISPATCHED_TOTAL.with_label_values(&[kind]).inc();
    }

    /// Record a transport send failure.
    pub fn dispatch_send_failure(kind: &str) {
        DISPATCH_SEND_FAILURES_TOTAL
            .with_label_values(&[kind])
            .inc();
    }

    /// Record the venue session state.
    pub fn session_state(up: bool) {
        SESSION_UP.set(if up { 1 } else { 0 });
    }

    /// Record an order accepted at intake.
    pub fn order_accepted(kind: &str) {
        ORDERS_ACCEPTED_TOTAL.with_label_values(&[kind]).inc();
    }

    /// Record a report added to the intake buffer.
    pub fn report_buffered(depth: usize) {
        REPORTS_BUFFERED_TOTAL.inc();
        REPORT_BUFFER_DEPTH.set(depth as i64);
    }

    /// Record the buffer depth after a drain or restore.
    pub fn buffer_depth(depth: usize) {
        REPORT_BUFFER_DEPTH.set(depth as i64);
    }

    /// Record a successful batch flush.
    pub fn batch_flushed(count: usize) {
        REPORT_BATCHES_FLUSHED_TOTAL.inc();
        REPORTS_FLUSHED_TOTAL.inc_by(count as u64);
    }

    /// Record a failed flush attempt.
    pub fn flush_failed() {
        FLUSH_FAILURES_TOTAL.inc();
    }

    /// Record a notification emit.
    pub fn notification_sent(scope: &str) {
        NOTIFICATIONS_SENT_TOTAL.with_label_values(&[scope]).inc();
    }

    /// Record a failed notification emit.
    pub fn notification_failed(scope: &str) {
        NOTIFICATION_FAILURES_TOTAL
            .with_label_values(&[scope])
            .inc();
    }

    /// Record a subscriber connect.
    pub fn subscriber_connected() {
        SUBSCRIBERS.inc();
    }

    /// Record a subscriber disconnect.
    pub fn subscriber_disconnected() {
        SUBSCRIBERS.dec();
    }

    /// Encode every registered metric in Prometheus text exposition format.
    pub fn gather() -> TelemetryResult<String> {
        let metric_families = prometheus::gather();
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_includes_registered_metrics() {
        Metrics::order_dispatched("new");
        Metrics::batch_flushed(3);
        Metrics::session_state(true);

        let text = Metrics::gather().unwrap();
        assert!(text.contains("fixbridge_orders_dispatched_total"));
        assert!(text.contains("fixbridge_report_batches_flushed_total"));
        assert!(text.contains("fixbridge_session_up"));
    }

    #[test]
    fn test_buffer_depth_gauge_moves_both_ways() {
        Metrics::buffer_depth(7);
        assert_eq!(REPORT_BUFFER_DEPTH.get(), 7);
        Metrics::buffer_depth(0);
        assert_eq!(REPORT_BUFFER_DEPTH.get(), 0);
    }
}
