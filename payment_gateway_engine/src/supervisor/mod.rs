//! # Task supervisor
//!
//! The [`TaskSupervisor`] turns transaction events into payment worker lifecycles:
//!
//! ```text
//!   ProcessedTransaction ─► dispatch ─► GatewayDirectory ─► WorkerPool job: register ─► start ─► remove
//!   CancelledTransaction ─► cancel   ─► WorkerRegistry   ─► stop(CancelledTransaction) ─► remove
//!   shutdown ─► refuse new dispatches ─► stop(Shutdown) every registered worker ─► drain the pool
//! ```
//!
//! Workers are registered before they start and removed once `start` has returned, so the registry only ever holds
//! workers that are running or about to run. A worker that panics is failed and removed like any other.
mod pool;
mod registry;

use std::{
    panic::AssertUnwindSafe,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use futures_util::{future::join_all, FutureExt};
use log::*;
use pgw_common::{CancelledTransaction, ProcessedTransaction, TransactionId};
pub use pool::{Job, WorkerPool};
pub use registry::WorkerRegistry;
use tokio_util::sync::CancellationToken;

use crate::{
    config::{SupervisorConfig, WorkerConfig},
    errors::{ConfigError, DispatchError, WorkerError},
    gateway::GatewayDirectory,
    publisher::SharedPublisher,
    worker::{PaymentWorker, StopReason, WorkerState},
};

pub struct TaskSupervisor {
    config: SupervisorConfig,
    worker_config: Arc<WorkerConfig>,
    directory: GatewayDirectory,
    publisher: SharedPublisher,
    registry: Arc<WorkerRegistry>,
    pool: WorkerPool,
    shutdown: CancellationToken,
    shutdown_started: AtomicBool,
}

impl std::fmt::Debug for TaskSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TaskSupervisor({:?}, {:?})", self.directory, self.pool)
    }
}

impl TaskSupervisor {
    /// Creates the supervisor and its worker pool. Must be called from within a tokio runtime.
    pub fn new(
        config: SupervisorConfig,
        directory: GatewayDirectory,
        publisher: SharedPublisher,
    ) -> Result<Self, ConfigError> {
        config.pool.validate()?;
        let pool = WorkerPool::new(config.pool.clone());
        let worker_config = Arc::new(config.worker.clone());
        info!("🧭️ Task supervisor ready. Serving payment methods: {directory:?}");
        Ok(Self {
            config,
            worker_config,
            directory,
            publisher,
            registry: Arc::new(WorkerRegistry::new()),
            pool,
            shutdown: CancellationToken::new(),
            shutdown_started: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Starts settling the transaction in `event` on a pool worker.
    ///
    /// Returns once the job has been queued. This waits for room if the pool's queue is full. An error means no
    /// worker was created for the transaction and no outcome will be published for it.
    pub async fn dispatch(&self, event: &ProcessedTransaction) -> Result<(), DispatchError> {
        if self.shutdown.is_cancelled() {
            warn!("🧭️ Transaction {} arrived after shutdown began. It will not be processed.", event.transaction_id());
            return Err(DispatchError::ShuttingDown);
        }
        let gateway = self.directory.resolve(event).map_err(|e| {
            warn!("🧭️ Dropping transaction {}. {e}", event.transaction_id());
            e
        })?;
        let worker = Arc::new(PaymentWorker::new(
            Arc::clone(&self.worker_config),
            gateway,
            Arc::clone(&self.publisher),
            self.shutdown.clone(),
        ));
        let job = run_worker(Arc::clone(&self.registry), worker);
        self.pool.submit(job.boxed()).await.map_err(|e| {
            warn!("🧭️ Could not queue transaction {}. {e}", event.transaction_id());
            DispatchError::from(e)
        })?;
        debug!("🧭️ Transaction {} queued for payment via '{}'", event.transaction_id(), event.payment_method());
        Ok(())
    }

    /// Stops the worker for the cancelled transaction, if there is one. Returns `true` if a worker was stopped.
    pub async fn cancel(&self, event: &CancelledTransaction) -> bool {
        let Some(worker) = self.registry.get(&event.transaction_id).await else {
            info!(
                "🧭️ Cancellation for transaction {} ignored. It is not being processed, or has already completed.",
                event.transaction_id
            );
            return false;
        };
        if let Err(e) = worker.stop(StopReason::CancelledTransaction).await {
            error!("🧭️ Transaction {} was cancelled, but {e}", event.transaction_id);
        }
        self.registry.remove(&worker).await;
        true
    }

    /// Refuses further dispatches, stops every running worker and waits for the pool to drain.
    pub async fn shutdown(&self) {
        if self.shutdown_started.swap(true, Ordering::SeqCst) {
            debug!("🧭️ Shutdown already in progress");
            self.pool.stop_and_wait().await;
            return;
        }
        self.shutdown.cancel();
        let workers = self.registry.snapshot().await;
        info!("🧭️ Shutting down. Stopping {} payment workers.", workers.len());
        let stops = workers.iter().map(|worker| async move {
            if let Err(e) = worker.stop(StopReason::Shutdown).await {
                error!("🧭️ Payment worker for transaction {} stopped, but {e}", worker.transaction_id());
            }
        });
        join_all(stops).await;
        self.pool.stop_and_wait().await;
        info!("🧭️ Task supervisor has shut down");
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub async fn active_transactions(&self) -> Vec<TransactionId> {
        self.registry.transaction_ids().await
    }

    pub async fn is_registered(&self, transaction_id: &TransactionId) -> bool {
        self.registry.contains(transaction_id).await
    }

    /// True when no worker is registered and no pool job is queued or running.
    pub async fn is_idle(&self) -> bool {
        self.pool.in_flight() == 0 && self.registry.is_empty().await
    }

    pub async fn wait_until_idle(&self, poll_period: Duration) {
        while !self.is_idle().await {
            tokio::time::sleep(poll_period).await;
        }
    }
}

async fn run_worker(registry: Arc<WorkerRegistry>, worker: Arc<PaymentWorker>) {
    if !registry.try_register(Arc::clone(&worker)).await {
        warn!(
            "🧭️ Transaction {} is already being processed. Ignoring the duplicate processed event.",
            worker.transaction_id()
        );
        return;
    }
    let Ok(result) = AssertUnwindSafe(worker.start()).catch_unwind().await else {
        error!("🧭️ Payment worker for transaction {} panicked. Failing the transaction.", worker.transaction_id());
        if let Err(e) = worker.abort().await {
            error!("🧭️ Could not fail transaction {} after its worker panicked. {e}", worker.transaction_id());
        }
        registry.remove(&worker).await;
        return;
    };
    match result {
        Ok(WorkerState::Succeeded) => debug!("🧭️ Payment worker for transaction {} succeeded", worker.transaction_id()),
        Ok(state) => debug!("🧭️ Payment worker for transaction {} finished as {state:?}", worker.transaction_id()),
        Err(WorkerError::Start(e)) => {
            warn!("🧭️ Payment for transaction {} could not be started. {e}", worker.transaction_id())
        },
        Err(e) => error!("🧭️ Payment worker for transaction {} failed. {e}", worker.transaction_id()),
    }
    registry.remove(&worker).await;
}
