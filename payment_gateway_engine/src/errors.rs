use pgw_common::TransactionId;
use thiserror::Error;

/// Errors raised by [`crate::gateway::PaymentGateway`] implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("Could not construct the payment gateway. {0}")]
    Construction(String),
    #[error("Could not create the payment. {0}")]
    CreatePayment(String),
    #[error("Could not check the payment status. {0}")]
    CheckStatus(String),
}

/// Errors raised while handing an outcome to the outbound transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    #[error("Could not encode the outcome message. {0}")]
    Encode(String),
    #[error("The outbound channel has been closed")]
    Closed,
    #[error("The transport rejected the message. {0}")]
    Transport(String),
}

impl From<serde_json::Error> for PublishError {
    fn from(e: serde_json::Error) -> Self {
        Self::Encode(e.to_string())
    }
}

/// Errors returned by [`crate::PaymentWorker::start`] and [`crate::PaymentWorker::stop`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkerError {
    /// The gateway refused to create the payment. The worker never started polling and published nothing.
    #[error("Failed to start the payment worker. {0}")]
    Start(GatewayError),
    /// The worker reached a terminal state but the outcome could not be published.
    #[error("Failed to publish the payment outcome. {0}")]
    Publish(#[from] PublishError),
}

/// Reasons a processed transaction event did not result in a payment worker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Cannot handle the '{method}' payment method (transaction {transaction_id})")]
    UnknownPaymentMethod { transaction_id: TransactionId, method: String },
    #[error("Could not create the '{method}' gateway for transaction {transaction_id}. {source}")]
    GatewayConstruction { transaction_id: TransactionId, method: String, source: GatewayError },
    #[error("The supervisor is shutting down and no longer accepts transactions")]
    ShuttingDown,
    #[error("The worker pool is closed")]
    PoolClosed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("The worker pool is closed")]
    Closed,
}

impl From<PoolError> for DispatchError {
    fn from(e: PoolError) -> Self {
        match e {
            PoolError::Closed => Self::PoolClosed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid worker pool configuration. {0}")]
    InvalidPool(String),
}
