use std::time::Duration;

use crate::errors::ConfigError;

pub const DEFAULT_PAYMENT_PROCESSING_TIME: Duration = Duration::from_secs(30);
pub const DEFAULT_SUCCEEDED_TRANSACTION_TOPIC: &str = "transaction.succeeded";
pub const DEFAULT_FAILED_TRANSACTION_TOPIC: &str = "transaction.failed";
pub const DEFAULT_MONITOR_PROCESS_TOPIC: &str = "monitor.process";
pub const DEFAULT_SERVICE_NAME: &str = "payment_gateway";

pub const DEFAULT_PROCESSED_TRANSACTION_TOPIC: &str = "transaction.processed";
pub const DEFAULT_CANCELLED_TRANSACTION_TOPIC: &str = "transaction.cancelled";

pub const DEFAULT_POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_POOL_MIN_WORKERS: usize = 0;
pub const DEFAULT_POOL_MAX_WORKERS: usize = 100;
pub const DEFAULT_POOL_TASK_CAPACITY: usize = 1000;

pub const DEFAULT_STUB_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_STUB_RETRIES: u32 = 10;

//-------------------------------------------------  WorkerConfig  -----------------------------------------------------
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Absolute time budget for a payment, measured from the moment polling starts. When it runs out the payment is
    /// failed regardless of how many status checks remain.
    pub payment_processing_time: Duration,
    /// The topic the monitor forwards successful outcomes to.
    pub succeeded_transaction_topic: String,
    /// The topic the monitor forwards failed and cancelled outcomes to.
    pub failed_transaction_topic: String,
    /// The topic outcomes are actually published on. The monitor routes them onward.
    pub monitor_process_topic: String,
    /// Marker attached to every outcome so the monitor knows where it came from.
    pub service_name: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            payment_processing_time: DEFAULT_PAYMENT_PROCESSING_TIME,
            succeeded_transaction_topic: DEFAULT_SUCCEEDED_TRANSACTION_TOPIC.to_string(),
            failed_transaction_topic: DEFAULT_FAILED_TRANSACTION_TOPIC.to_string(),
            monitor_process_topic: DEFAULT_MONITOR_PROCESS_TOPIC.to_string(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
        }
    }
}

impl WorkerConfig {
    pub fn with_processing_time(mut self, processing_time: Duration) -> Self {
        self.payment_processing_time = processing_time;
        self
    }
}

//-------------------------------------------------  PoolConfig  -------------------------------------------------------
/// Sizing of the pool that runs payment workers.
///
/// Every worker holds its slot for its whole polling lifetime, which is seconds to minutes rather than milliseconds.
/// `max_workers` is therefore the number of payments that can be settled concurrently, and `task_capacity` the
/// number that can wait for a slot before new dispatches start blocking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    pub min_workers: usize,
    pub max_workers: usize,
    pub task_capacity: usize,
    /// Workers above `min_workers` exit after being idle for this long.
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_workers: DEFAULT_POOL_MIN_WORKERS,
            max_workers: DEFAULT_POOL_MAX_WORKERS,
            task_capacity: DEFAULT_POOL_TASK_CAPACITY,
            idle_timeout: DEFAULT_POOL_IDLE_TIMEOUT,
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers == 0 {
            return Err(ConfigError::InvalidPool("max_workers must be at least 1".into()));
        }
        if self.min_workers > self.max_workers {
            return Err(ConfigError::InvalidPool(format!(
                "min_workers ({}) cannot exceed max_workers ({})",
                self.min_workers, self.max_workers
            )));
        }
        if self.task_capacity == 0 {
            return Err(ConfigError::InvalidPool("task_capacity must be at least 1".into()));
        }
        Ok(())
    }
}

//-------------------------------------------------  SupervisorConfig  -------------------------------------------------
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SupervisorConfig {
    pub pool: PoolConfig,
    pub worker: WorkerConfig,
    pub topics: InboundTopics,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundTopics {
    pub processed_transaction_topic: String,
    pub cancelled_transaction_topic: String,
}

impl Default for InboundTopics {
    fn default() -> Self {
        Self {
            processed_transaction_topic: DEFAULT_PROCESSED_TRANSACTION_TOPIC.to_string(),
            cancelled_transaction_topic: DEFAULT_CANCELLED_TRANSACTION_TOPIC.to_string(),
        }
    }
}

//-------------------------------------------------  StubGatewayConfig  ------------------------------------------------
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StubGatewayConfig {
    pub timeout: Duration,
    pub retries: u32,
}

impl Default for StubGatewayConfig {
    fn default() -> Self {
        Self { timeout: DEFAULT_STUB_TIMEOUT, retries: DEFAULT_STUB_RETRIES }
    }
}
