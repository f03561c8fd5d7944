//! Pipeline construction and application lifecycle.

use std::sync::Arc;

use fixbridge_api::{run_server, ApiState, Fanout, Hub, NotificationScheduler};
use fixbridge_dispatch::DispatchScheduler;
use fixbridge_reports::{run_ingest, FlushScheduler, ReportBuffer};
use fixbridge_store::{DynOrderStore, DynReportStore, MemoryOrderStore, MemoryReportStore};
use fixbridge_transport::{DynTransport, LoopbackTransport, SessionGate};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::AppResult;

/// The running pipeline: stores, hub and session gate shared with the API,
/// plus the spawned scheduler tasks.
///
/// Everything mutable that the schedulers share goes through the stores,
/// the intake buffer and the session gate; the buffer is constructed here
/// once and injected into its producer and consumer.
pub struct Pipeline {
    pub orders: DynOrderStore,
    pub reports: DynReportStore,
    pub hub: Arc<Hub>,
    pub session: Arc<SessionGate>,
    pub shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Pipeline {
    /// Wires the reference deployment: in-memory stores and the loopback
    /// venue, with every scheduler spawned on one shared token.
    pub fn start(config: &AppConfig) -> Self {
        let shutdown = CancellationToken::new();
        let orders: DynOrderStore = Arc::new(MemoryOrderStore::new());
        let reports: DynReportStore = Arc::new(MemoryReportStore::new());
        let buffer = Arc::new(ReportBuffer::new());
        let session = Arc::new(SessionGate::new());
        let hub = Arc::new(Hub::new(config.api.channel_capacity));

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let transport: DynTransport = Arc::new(LoopbackTransport::new(
            config.loopback.clone(),
            inbound_tx,
            session.clone(),
        ));

        let mut tasks = Vec::new();

        tasks.push(tokio::spawn(
            DispatchScheduler::new(
                config.dispatch.clone(),
                orders.clone(),
                transport,
                session.clone(),
                shutdown.clone(),
            )
            .run(),
        ));

        tasks.push(tokio::spawn(run_ingest(
            inbound_rx,
            orders.clone(),
            buffer.clone(),
            config.flush.op_timeout(),
            shutdown.clone(),
        )));

        tasks.push(tokio::spawn(
            FlushScheduler::new(
                config.flush.clone(),
                buffer,
                reports.clone(),
                shutdown.clone(),
            )
            .run(),
        ));

        let fanout: Arc<dyn Fanout> = hub.clone();
        tasks.push(tokio::spawn(
            NotificationScheduler::new(
                config.notify.clone(),
                reports.clone(),
                fanout,
                shutdown.clone(),
            )
            .run(),
        ));

        info!("Pipeline started");
        Self {
            orders,
            reports,
            hub,
            session,
            shutdown,
            tasks,
        }
    }

    /// Cancels every scheduler and waits for them to finish their final
    /// work (the flusher's last flush, the ingest drain).
    pub async fn stop(self) {
        self.shutdown.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Pipeline task panicked during shutdown");
            }
        }
        info!("Pipeline stopped");
    }
}

/// The single-process reference deployment.
pub struct Application {
    config: AppConfig,
}

impl Application {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Runs the pipeline and the API server until Ctrl-C.
    pub async fn run(self) -> AppResult<()> {
        let pipeline = Pipeline::start(&self.config);

        let api_state = ApiState::new(pipeline.orders.clone(), pipeline.hub.clone());
        let server = tokio::spawn(run_server(
            api_state,
            self.config.api.clone(),
            pipeline.shutdown.clone(),
        ));

        tokio::signal::ctrl_c().await?;
        info!("Shutdown signal received");

        pipeline.stop().await;
        match server.await {
            Ok(result) => result?,
            Err(e) => warn!(error = %e, "API server task panicked"),
        }

        Ok(())
    }
}
