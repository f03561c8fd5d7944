//! The batch flush scheduler.

use std::sync::Arc;

use fixbridge_store::{DynReportStore, ReportStore};
use fixbridge_telemetry::Metrics;
use tokio::time::{timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::buffer::ReportBuffer;
use crate::config::FlushConfig;

/// Drains the intake buffer into the report store.
///
/// A flush fires when the buffered count reaches the threshold or the flush
/// timeout elapses, whichever comes first. Drain and persist are
/// transactional against loss: a failed persist restores the drained
/// snapshot into the buffer, and the flush timer only resets on success, so
/// the next eligible cycle retries with a fresh drain that includes the
/// restored reports.
pub struct FlushScheduler {
    config: FlushConfig,
    buffer: Arc<ReportBuffer>,
    reports: DynReportStore,
    shutdown: CancellationToken,
}

impl FlushScheduler {
    pub fn new(
        config: FlushConfig,
        buffer: Arc<ReportBuffer>,
        reports: DynReportStore,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config,
            buffer,
            reports,
            shutdown,
        }
    }

    /// Runs until cancellation, then performs one final best-effort flush
    /// of whatever remains buffered.
    pub async fn run(self) {
        info!(
            batch_threshold = self.config.batch_threshold,
            flush_timeout_ms = self.config.flush_timeout_ms,
            "Flush scheduler started"
        );

        let mut last_flush = Instant::now();

        loop {
            tokio::select! {
                () = tokio::time::sleep(self.config.poll_interval()) => {}
                () = self.shutdown.cancelled() => break,
            }

            if !self.flush_due(last_flush) {
                continue;
            }
            if self.flush_once().await {
                last_flush = Instant::now();
            }
        }

        if !self.flush_once().await {
            error!("Final flush failed, restored reports are lost at exit");
        }
        info!("Flush scheduler stopped");
    }

    /// True when either flush condition holds.
    fn flush_due(&self, last_flush: Instant) -> bool {
        self.buffer.len() >= self.config.batch_threshold
            || last_flush.elapsed() >= self.config.flush_timeout()
    }

    /// Drains and persists one snapshot. Returns true when the flush timer
    /// should reset: a successful persist, or an empty drain (nothing to
    /// flush; resetting avoids a hot loop once the timeout has elapsed on
    /// an empty buffer).
    async fn flush_once(&self) -> bool {
        let batch = self.buffer.drain_all();
        if batch.is_empty() {
            return true;
        }
        let count = batch.len();

        match timeout(
            self.config.op_timeout(),
            self.reports.persist_batch(batch.clone()),
        )
        .await
        {
            Ok(Ok(())) => {
                debug!(count, "Report batch flushed");
                Metrics::batch_flushed(count);
                Metrics::buffer_depth(self.buffer.len());
                true
            }
            Ok(Err(e)) => {
                warn!(count, error = %e, "Batch persist failed, restoring snapshot");
                Metrics::flush_failed();
                self.buffer.restore(batch);
                false
            }
            Err(_) => {
                warn!(count, "Batch persist timed out, restoring snapshot");
                Metrics::flush_failed();
                self.buffer.restore(batch);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fixbridge_core::{ExecutionReport, InboundReport};
    use fixbridge_store::{
        BoxFuture, MemoryReportStore, ReportStore, StoreError, StoreResult,
    };
    use std::time::Duration;

    fn sample_report(exec_id: &str) -> ExecutionReport {
        let inbound = InboundReport {
            exec_id: Some(exec_id.to_string()),
            ..InboundReport::default()
        };
        ExecutionReport::from_inbound(inbound, Utc::now())
    }

    fn scheduler_with(
        config: FlushConfig,
        reports: DynReportStore,
    ) -> (FlushScheduler, Arc<ReportBuffer>, CancellationToken) {
        let buffer = Arc::new(ReportBuffer::new());
        let shutdown = CancellationToken::new();
        let scheduler = FlushScheduler::new(config, buffer.clone(), reports, shutdown.clone());
        (scheduler, buffer, shutdown)
    }

    /// Store that refuses every batch write.
    struct FailingReportStore;

    impl ReportStore for FailingReportStore {
        fn persist_batch(
            &self,
            _reports: Vec<ExecutionReport>,
        ) -> BoxFuture<'_, StoreResult<()>> {
            Box::pin(async { Err(StoreError::Unavailable("db offline".to_string())) })
        }

        fn fetch_unnotified(
            &self,
            _limit: usize,
        ) -> BoxFuture<'_, StoreResult<Vec<ExecutionReport>>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn mark_notified(&self, id: i64) -> BoxFuture<'_, StoreResult<()>> {
            Box::pin(async move { Err(StoreError::NotFound(id)) })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_threshold_triggers_before_timeout() {
        let config = FlushConfig {
            batch_threshold: 3,
            flush_timeout_ms: 60_000,
            ..FlushConfig::default()
        };
        let store = Arc::new(MemoryReportStore::new());
        let (scheduler, buffer, _shutdown) = scheduler_with(config, store.clone());

        let last_flush = Instant::now();
        buffer.add(sample_report("e1"));
        buffer.add(sample_report("e2"));
        assert!(!scheduler.flush_due(last_flush), "below threshold, timer fresh");

        buffer.add(sample_report("e3"));
        assert!(scheduler.flush_due(last_flush), "threshold reached");

        assert!(scheduler.flush_once().await);
        assert_eq!(store.len(), 3);
        assert!(buffer.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_flushes_partial_batch() {
        let config = FlushConfig {
            batch_threshold: 10,
            flush_timeout_ms: 60_000,
            ..FlushConfig::default()
        };
        let store = Arc::new(MemoryReportStore::new());
        let (scheduler, buffer, _shutdown) = scheduler_with(config, store.clone());

        let last_flush = Instant::now();
        for i in 0..5 {
            buffer.add(sample_report(&format!("e{i}")));
        }
        assert!(!scheduler.flush_due(last_flush));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(scheduler.flush_due(last_flush), "timeout elapsed with 5 buffered");

        assert!(scheduler.flush_once().await);
        assert_eq!(store.len(), 5, "exactly the 5 buffered reports persisted");
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_drain_resets_timer() {
        let store = Arc::new(MemoryReportStore::new());
        let (scheduler, _buffer, _shutdown) =
            scheduler_with(FlushConfig::default(), store.clone());

        let last_flush = Instant::now();
        tokio::time::advance(Duration::from_secs(600)).await;
        assert!(scheduler.flush_due(last_flush));
        assert!(scheduler.flush_once().await, "empty drain still resets the timer");
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_failed_persist_restores_snapshot() {
        let (scheduler, buffer, _shutdown) =
            scheduler_with(FlushConfig::default(), Arc::new(FailingReportStore));

        buffer.add(sample_report("e1"));
        buffer.add(sample_report("e2"));

        assert!(!scheduler.flush_once().await, "timer must not reset on failure");
        assert_eq!(buffer.len(), 2, "snapshot restored for the next drain");
    }

    #[tokio::test]
    async fn test_restored_reports_persist_on_retry() {
        struct FlakyStore {
            inner: MemoryReportStore,
            failures_left: parking_lot::Mutex<usize>,
        }

        impl ReportStore for FlakyStore {
            fn persist_batch(
                &self,
                reports: Vec<ExecutionReport>,
            ) -> BoxFuture<'_, StoreResult<()>> {
                Box::pin(async move {
                    {
                        let mut left = self.failures_left.lock();
                        if *left > 0 {
                            *left -= 1;
                            return Err(StoreError::Unavailable("transient".to_string()));
                        }
                    }
                    self.inner.persist_batch(reports).await
                })
            }

            fn fetch_unnotified(
                &self,
                limit: usize,
            ) -> BoxFuture<'_, StoreResult<Vec<ExecutionReport>>> {
                self.inner.fetch_unnotified(limit)
            }

            fn mark_notified(&self, id: i64) -> BoxFuture<'_, StoreResult<()>> {
                self.inner.mark_notified(id)
            }
        }

        let store = Arc::new(FlakyStore {
            inner: MemoryReportStore::new(),
            failures_left: parking_lot::Mutex::new(1),
        });
        let (scheduler, buffer, _shutdown) =
            scheduler_with(FlushConfig::default(), store.clone());

        buffer.add(sample_report("e1"));
        assert!(!scheduler.flush_once().await);
        assert!(scheduler.flush_once().await, "retry flushes the restored report");
        assert_eq!(store.inner.len(), 1);
    }

    #[tokio::test]
    async fn test_final_flush_on_cancellation() {
        let config = FlushConfig {
            batch_threshold: 100,
            flush_timeout_ms: 60_000,
            poll_interval_ms: 10,
            ..FlushConfig::default()
        };
        let store = Arc::new(MemoryReportStore::new());
        let (scheduler, buffer, shutdown) = scheduler_with(config, store.clone());

        buffer.add(sample_report("e1"));
        buffer.add(sample_report("e2"));
        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(1), scheduler.run())
            .await
            .expect("scheduler should exit promptly");

        assert_eq!(store.len(), 2, "remaining reports flushed at shutdown");
    }
}
