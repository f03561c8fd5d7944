//! The notification scheduler loop.

use std::sync::Arc;

use fixbridge_core::ExecutionReport;
use fixbridge_store::{DynReportStore, ReportStore};
use fixbridge_telemetry::Metrics;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::NotifyConfig;
use crate::hub::Fanout;
use crate::notice::ReportNotice;

/// Polls the report store for unnotified rows and fans each one out.
///
/// Delivery is at-most-once: the hub is fire-and-forget with no
/// acknowledgment, so a row is marked notified regardless of emit outcome
/// and an emit failure never blocks the rest of the batch.
pub struct NotificationScheduler {
    config: NotifyConfig,
    reports: DynReportStore,
    fanout: Arc<dyn Fanout>,
    shutdown: CancellationToken,
}

impl NotificationScheduler {
    pub fn new(
        config: NotifyConfig,
        reports: DynReportStore,
        fanout: Arc<dyn Fanout>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config,
            reports,
            fanout,
            shutdown,
        }
    }

    /// Runs until cancellation. Sleeps the poll delay only after a cycle
    /// that processed nothing; a non-empty batch loops immediately.
    pub async fn run(self) {
        info!(
            batch_threshold = self.config.batch_threshold,
            poll_delay_ms = self.config.poll_delay_ms,
            "Notification scheduler started"
        );

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            let processed = self.run_cycle().await;

            if processed == 0 {
                tokio::select! {
                    () = tokio::time::sleep(self.config.poll_delay()) => {}
                    () = self.shutdown.cancelled() => break,
                }
            }
        }

        info!("Notification scheduler stopped");
    }

    /// One cycle: fetch a batch of unnotified rows and fan each out.
    /// Returns the number of rows processed.
    async fn run_cycle(&self) -> usize {
        let batch = match timeout(
            self.config.op_timeout(),
            self.reports.fetch_unnotified(self.config.batch_threshold),
        )
        .await
        {
            Ok(Ok(batch)) => batch,
            Ok(Err(e)) => {
                warn!(error = %e, "Unnotified-report fetch failed, retrying next cycle");
                return 0;
            }
            Err(_) => {
                warn!("Unnotified-report fetch timed out, retrying next cycle");
                return 0;
            }
        };

        let mut processed = 0usize;
        for report in &batch {
            if self.shutdown.is_cancelled() {
                // Unprocessed rows stay unnotified for the next instance.
                break;
            }
            self.notify_one(report).await;
            processed += 1;
        }
        processed
    }

    /// Emits the broadcast notice, then the targeted notice when the report
    /// is attributed, then flips the notified flag.
    async fn notify_one(&self, report: &ExecutionReport) {
        match self.fanout.broadcast_all(&ReportNotice::broadcast(report)) {
            Ok(()) => Metrics::notification_sent("broadcast"),
            Err(e) => {
                warn!(report_id = report.id, error = %e, "Broadcast emit failed");
                Metrics::notification_failed("broadcast");
            }
        }

        match &report.client {
            Some(client) => {
                match self.fanout.send_to_group(client, &ReportNotice::targeted(report)) {
                    Ok(()) => Metrics::notification_sent("group"),
                    Err(e) => {
                        warn!(
                            report_id = report.id,
                            %client,
                            error = %e,
                            "Targeted emit failed"
                        );
                        Metrics::notification_failed("group");
                    }
                }
            }
            None => {
                debug!(
                    report_id = report.id,
                    exec_id = %report.exec_id,
                    "Unattributed report, targeted notice skipped"
                );
            }
        }

        // Marked regardless of emit outcome; a store failure here leaves
        // the row unnotified and it is re-emitted next cycle.
        match timeout(self.config.op_timeout(), self.reports.mark_notified(report.id)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(report_id = report.id, error = %e, "Failed to mark report notified");
            }
            Err(_) => {
                warn!(report_id = report.id, "Mark-notified timed out");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fixbridge_core::{ClientId, InboundReport};
    use fixbridge_store::{MemoryReportStore, ReportStore};
    use parking_lot::Mutex;
    use std::time::Duration;

    fn sample_report(exec_id: &str, client: Option<&str>) -> ExecutionReport {
        let inbound = InboundReport {
            exec_id: Some(exec_id.to_string()),
            client_order_id: Some(format!("ord-{exec_id}")),
            ..InboundReport::default()
        };
        let mut report = ExecutionReport::from_inbound(inbound, Utc::now());
        report.client = client.map(ClientId::from);
        report
    }

    /// Records emissions; optionally fails targeted sends.
    #[derive(Default)]
    struct RecordingFanout {
        broadcasts: Mutex<Vec<ReportNotice>>,
        targeted: Mutex<Vec<(ClientId, ReportNotice)>>,
        fail_targeted: bool,
    }

    impl Fanout for RecordingFanout {
        fn broadcast_all(&self, notice: &ReportNotice) -> crate::ApiResult<()> {
            self.broadcasts.lock().push(notice.clone());
            Ok(())
        }

        fn send_to_group(
            &self,
            identity: &ClientId,
            notice: &ReportNotice,
        ) -> crate::ApiResult<()> {
            if self.fail_targeted {
                return Err(crate::ApiError::Unauthorized("injected".to_string()));
            }
            self.targeted.lock().push((identity.clone(), notice.clone()));
            Ok(())
        }
    }

    fn scheduler_with(
        fanout: Arc<RecordingFanout>,
        store: Arc<MemoryReportStore>,
    ) -> NotificationScheduler {
        NotificationScheduler::new(
            NotifyConfig::default(),
            store,
            fanout,
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn test_each_report_notified_exactly_once() {
        let store = Arc::new(MemoryReportStore::new());
        store
            .persist_batch(vec![
                sample_report("e1", Some("acme")),
                sample_report("e2", Some("globex")),
            ])
            .await
            .unwrap();
        let fanout = Arc::new(RecordingFanout::default());
        let scheduler = scheduler_with(fanout.clone(), store.clone());

        assert_eq!(scheduler.run_cycle().await, 2);
        // No unnotified rows remain; a second cycle re-delivers nothing.
        assert_eq!(scheduler.run_cycle().await, 0);

        assert_eq!(fanout.broadcasts.lock().len(), 2);
        let targeted = fanout.targeted.lock();
        assert_eq!(targeted.len(), 2);
        assert_eq!(targeted[0].0, ClientId::from("acme"));
        assert_eq!(targeted[1].0, ClientId::from("globex"));
    }

    #[tokio::test]
    async fn test_unattributed_report_broadcasts_only() {
        let store = Arc::new(MemoryReportStore::new());
        store
            .persist_batch(vec![sample_report("e1", None)])
            .await
            .unwrap();
        let fanout = Arc::new(RecordingFanout::default());
        let scheduler = scheduler_with(fanout.clone(), store.clone());

        assert_eq!(scheduler.run_cycle().await, 1);

        assert_eq!(fanout.broadcasts.lock().len(), 1);
        assert!(fanout.targeted.lock().is_empty());
        assert!(store.fetch_unnotified(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_targeted_failure_does_not_block_batch() {
        let store = Arc::new(MemoryReportStore::new());
        store
            .persist_batch(vec![
                sample_report("e1", Some("acme")),
                sample_report("e2", Some("acme")),
            ])
            .await
            .unwrap();
        let fanout = Arc::new(RecordingFanout {
            fail_targeted: true,
            ..RecordingFanout::default()
        });
        let scheduler = scheduler_with(fanout.clone(), store.clone());

        assert_eq!(scheduler.run_cycle().await, 2);

        // Broadcasts went out, targeted failed, every row still flipped.
        assert_eq!(fanout.broadcasts.lock().len(), 2);
        assert!(store.fetch_unnotified(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cycle_respects_batch_threshold() {
        let store = Arc::new(MemoryReportStore::new());
        let rows: Vec<ExecutionReport> = (0..5)
            .map(|i| sample_report(&format!("e{i}"), None))
            .collect();
        store.persist_batch(rows).await.unwrap();

        let fanout = Arc::new(RecordingFanout::default());
        let scheduler = NotificationScheduler::new(
            NotifyConfig {
                batch_threshold: 3,
                ..NotifyConfig::default()
            },
            store.clone(),
            fanout.clone(),
            CancellationToken::new(),
        );

        assert_eq!(scheduler.run_cycle().await, 3);
        assert_eq!(scheduler.run_cycle().await, 2);
    }

    #[tokio::test]
    async fn test_run_exits_on_cancellation() {
        let store = Arc::new(MemoryReportStore::new());
        let fanout = Arc::new(RecordingFanout::default());
        let shutdown = CancellationToken::new();
        let scheduler = NotificationScheduler::new(
            NotifyConfig {
                poll_delay_ms: 5,
                ..NotifyConfig::default()
            },
            store,
            fanout,
            shutdown.clone(),
        );

        let handle = tokio::spawn(scheduler.run());
        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler should stop within one poll delay")
            .unwrap();
    }
}
