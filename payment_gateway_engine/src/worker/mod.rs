//! # Payment worker
//!
//! A [`PaymentWorker`] owns the settlement of exactly one transaction. Its life looks like this:
//!
//! ```text
//!   Created ──create_payment──► Polling ──┬─► Succeeded
//!      │                                  ├─► Failed      (retries, deadline, gateway cancel, poll error, shutdown)
//!      └── create_payment error           └─► Cancelled   (user cancelled the transaction)
//!          (start error, no outcome)
//! ```
//!
//! While polling, the worker wakes on whichever comes first of the gateway's poll tick, the absolute processing
//! deadline, or a stop signal. Status checks run as supervised sub-tasks, so a slow rail never prevents the loop from
//! seeing a stop request; the loop always joins them before it returns.
//!
//! Every path to a terminal state goes through a single compare-and-swap on the `completed` flag. Whoever wins the
//! swap publishes the outcome; everyone else becomes a no-op. A status check that comes back after a cancellation or
//! deadline has already resolved the worker is dropped, so each transaction produces exactly one outcome.
mod outcome;

use std::sync::{
    atomic::{AtomicBool, AtomicU8, Ordering},
    Arc,
};

use log::*;
pub use outcome::{
    Resolution,
    StopReason,
    GATEWAY_CANCELLED,
    PROCESSING_TIME_EXPIRED,
    RETRIES_EXPIRED,
    SERVICE_SHUTDOWN,
    TRANSACTION_CANCELLED,
    WORKER_ABORTED,
};
use pgw_common::TransactionId;
use tokio::{
    task::{JoinError, JoinSet},
    time::{self, Duration, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::WorkerConfig,
    errors::WorkerError,
    gateway::{PaymentRef, PaymentStatus, SharedGateway},
    publisher::SharedPublisher,
};

/// Gateways that ask to be polled more often than this are polled at this rate.
pub const MIN_POLL_PERIOD: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    Created = 0,
    Polling = 1,
    Succeeded = 2,
    Failed = 3,
    Cancelled = 4,
}

impl WorkerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Created,
            1 => Self::Polling,
            2 => Self::Succeeded,
            3 => Self::Failed,
            _ => Self::Cancelled,
        }
    }
}

impl From<&Resolution> for WorkerState {
    fn from(resolution: &Resolution) -> Self {
        match resolution {
            Resolution::Succeeded => Self::Succeeded,
            Resolution::Failed(_) => Self::Failed,
            Resolution::Cancelled(_) => Self::Cancelled,
        }
    }
}

/// What a single status check amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CheckProgress {
    /// The rail has not settled the payment yet. Counts against the retry budget.
    Pending,
    /// This check moved the worker to a terminal state.
    Resolved,
    /// The worker had already been resolved by someone else; the result was discarded.
    Ignored,
}

pub struct PaymentWorker {
    config: Arc<WorkerConfig>,
    gateway: SharedGateway,
    publisher: SharedPublisher,
    transaction_id: TransactionId,
    completed: AtomicBool,
    started: AtomicBool,
    state: AtomicU8,
    /// Raised once the worker is resolved, to unwind the polling loop.
    stop: CancellationToken,
    /// Latched when `start` returns, whatever the outcome.
    exited: CancellationToken,
    /// Service-wide shutdown. Only consulted before a payment is created.
    shutdown: CancellationToken,
}

impl std::fmt::Debug for PaymentWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentWorker({}, {:?})", self.transaction_id, self.state())
    }
}

impl PaymentWorker {
    pub fn new(
        config: Arc<WorkerConfig>,
        gateway: SharedGateway,
        publisher: SharedPublisher,
        shutdown: CancellationToken,
    ) -> Self {
        let transaction_id = gateway.transaction_id().clone();
        Self {
            config,
            gateway,
            publisher,
            transaction_id,
            completed: AtomicBool::new(false),
            started: AtomicBool::new(false),
            state: AtomicU8::new(WorkerState::Created as u8),
            stop: CancellationToken::new(),
            exited: CancellationToken::new(),
            shutdown,
        }
    }

    pub fn transaction_id(&self) -> &TransactionId {
        &self.transaction_id
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// True once any path has claimed the right to publish this worker's outcome.
    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }

    /// True once [`Self::start`] has returned.
    pub fn has_exited(&self) -> bool {
        self.exited.is_cancelled()
    }

    /// Creates the payment and watches it until it reaches a terminal state.
    ///
    /// Returns the final state of the worker. If the gateway refuses to create the payment, a
    /// [`WorkerError::Start`] is returned and no outcome is published. If the outcome could not be published, a
    /// [`WorkerError::Publish`] is returned; the worker is terminal either way.
    pub async fn start(self: &Arc<Self>) -> Result<WorkerState, WorkerError> {
        let _exit_guard = self.exited.clone().drop_guard();
        self.started.store(true, Ordering::SeqCst);
        debug!("💳️ Starting payment worker for transaction {}", self.transaction_id);
        if self.is_completed() {
            debug!("💳️ Transaction {} was stopped before its worker started", self.transaction_id);
            return Ok(self.state());
        }
        if self.shutdown.is_cancelled() {
            info!("💳️ Transaction {} was accepted after shutdown began. It will not be started.", self.transaction_id);
            self.resolve(Resolution::from_stop(StopReason::Shutdown)).await?;
            return Ok(self.state());
        }
        let payment = self.gateway.create_payment().await.map_err(|e| {
            warn!("💳️ Could not create a payment for transaction {}. {e}", self.transaction_id);
            WorkerError::Start(e)
        })?;
        if self.stop.is_cancelled() {
            debug!(
                "💳️ Transaction {} was stopped while payment [{payment}] was being created. Not polling.",
                self.transaction_id
            );
            return Ok(self.state());
        }
        self.process_payment(payment).await
    }

    async fn process_payment(self: &Arc<Self>, payment: PaymentRef) -> Result<WorkerState, WorkerError> {
        let _ = self.state.compare_exchange(
            WorkerState::Created as u8,
            WorkerState::Polling as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        let mut period = self.gateway.timeout();
        if period < MIN_POLL_PERIOD {
            warn!(
                "💳️ The gateway for transaction {} asked for a poll interval of {}µs. Polling every {}ms instead.",
                self.transaction_id,
                period.as_micros(),
                MIN_POLL_PERIOD.as_millis()
            );
            period = MIN_POLL_PERIOD;
        }
        let budget = self.gateway.retries();
        debug!(
            "💳️ Polling payment [{payment}] for transaction {} every {}ms, at most {budget} times",
            self.transaction_id,
            period.as_millis()
        );
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let deadline = time::sleep(self.config.payment_processing_time);
        tokio::pin!(deadline);

        let mut retries = 0u32;
        let mut checks = JoinSet::new();
        let mut result = Ok(());
        loop {
            tokio::select! {
                biased;
                _ = self.stop.cancelled() => break,
                Some(joined) = checks.join_next(), if !checks.is_empty() => {
                    match self.check_joined(joined).await {
                        Ok(CheckProgress::Pending) => {
                            retries += 1;
                            debug!(
                                "💳️ Payment [{payment}] for transaction {} is still pending ({retries}/{budget})",
                                self.transaction_id
                            );
                        },
                        Ok(_) => {},
                        Err(e) => result = Err(e),
                    }
                },
                _ = &mut deadline => {
                    result = self.resolve(Resolution::failed(PROCESSING_TIME_EXPIRED)).await.map(|_| ());
                    break;
                },
                _ = ticker.tick() => {
                    if !checks.is_empty() {
                        trace!("💳️ A status check for transaction {} is still running. Skipping tick.", self.transaction_id);
                        continue;
                    }
                    if retries >= budget {
                        result = self.resolve(Resolution::failed(RETRIES_EXPIRED)).await.map(|_| ());
                        break;
                    }
                    checks.spawn(Arc::clone(self).check_payment(payment.clone()));
                },
            }
        }
        // Let any in-flight status check reach its end before reporting that the worker has exited
        while let Some(joined) = checks.join_next().await {
            if let Err(e) = self.check_joined(joined).await {
                result = result.and(Err(e));
            }
        }
        result?;
        debug!("💳️ Payment worker for transaction {} exited as {:?}", self.transaction_id, self.state());
        Ok(self.state())
    }

    async fn check_payment(self: Arc<Self>, payment: PaymentRef) -> Result<CheckProgress, WorkerError> {
        if self.is_completed() {
            return Ok(CheckProgress::Ignored);
        }
        let status = match self.gateway.check_status(&payment).await {
            Ok(status) => status,
            Err(e) => {
                let reason = format!("failed to check payment status: {e}");
                return self.resolve_with(Resolution::Failed(reason)).await;
            },
        };
        if self.is_completed() {
            debug!(
                "💳️ Payment [{payment}] reported {status} after transaction {} had already been resolved. Ignoring.",
                self.transaction_id
            );
            return Ok(CheckProgress::Ignored);
        }
        match status {
            PaymentStatus::Succeeded => self.resolve_with(Resolution::Succeeded).await,
            PaymentStatus::Cancelled => self.resolve_with(Resolution::failed(GATEWAY_CANCELLED)).await,
            PaymentStatus::Pending | PaymentStatus::Undefined => Ok(CheckProgress::Pending),
        }
    }

    async fn check_joined(
        &self,
        joined: Result<Result<CheckProgress, WorkerError>, JoinError>,
    ) -> Result<CheckProgress, WorkerError> {
        match joined {
            Ok(progress) => progress,
            Err(e) => {
                error!("💳️ Status check for transaction {} did not complete. {e}", self.transaction_id);
                self.resolve_with(Resolution::Failed(format!("failed to check payment status: {e}"))).await
            },
        }
    }

    async fn resolve_with(&self, resolution: Resolution) -> Result<CheckProgress, WorkerError> {
        let won = self.resolve(resolution).await?;
        Ok(if won { CheckProgress::Resolved } else { CheckProgress::Ignored })
    }

    /// Moves the worker to its terminal state and publishes the outcome, unless something else got there first.
    ///
    /// Returns `Ok(true)` if this call published the outcome.
    async fn resolve(&self, resolution: Resolution) -> Result<bool, WorkerError> {
        if self.completed.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            trace!("💳️ Transaction {} is already resolved. Discarding {resolution}.", self.transaction_id);
            return Ok(false);
        }
        self.state.store(WorkerState::from(&resolution) as u8, Ordering::SeqCst);
        info!("💳️ Transaction {} {resolution}", self.transaction_id);
        let published = self.publish(&resolution).await;
        self.stop.cancel();
        published.map(|_| true)
    }

    async fn publish(&self, resolution: &Resolution) -> Result<(), WorkerError> {
        let message = resolution.to_message(&self.transaction_id, &self.config)?;
        self.publisher.publish(message).await.map_err(|e| {
            error!("💳️ Could not publish the outcome of transaction {}. {e}", self.transaction_id);
            WorkerError::Publish(e)
        })
    }

    /// Asks the worker to stop and waits until its `start` call has returned.
    ///
    /// The first call resolves the worker (cancelled for [`StopReason::CancelledTransaction`], failed for
    /// [`StopReason::Shutdown`]) and publishes that outcome, unless the worker already reached a terminal state on
    /// its own. Further calls are no-ops. A status check that is in flight is allowed to finish first. If `start` has
    /// not been called yet, this returns as soon as the outcome is published and a later `start` does nothing.
    pub async fn stop(&self, reason: StopReason) -> Result<(), WorkerError> {
        match reason {
            StopReason::CancelledTransaction => {
                debug!("💳️ Transaction {} was cancelled by the user", self.transaction_id)
            },
            StopReason::Shutdown => debug!("💳️ Payment worker for transaction {} is shutting down", self.transaction_id),
            StopReason::Undefined => {
                warn!("💳️ Payment worker for transaction {} stopped for no stated reason", self.transaction_id)
            },
        }
        let result = self.resolve(Resolution::from_stop(reason)).await;
        self.stop.cancel();
        if self.started.load(Ordering::SeqCst) {
            self.exited.cancelled().await;
        }
        result.map(|_| ())
    }

    /// Fails a worker whose `start` future was torn down without resolving it, e.g. because it panicked.
    pub(crate) async fn abort(&self) -> Result<(), WorkerError> {
        self.resolve(Resolution::failed(WORKER_ABORTED)).await.map(|_| ())
    }
}
