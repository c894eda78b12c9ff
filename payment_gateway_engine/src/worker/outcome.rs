use std::fmt::Display;

use pgw_common::{FailedTransaction, ProcessEnvelope, SucceededTransaction, TransactionId};

use crate::{config::WorkerConfig, errors::PublishError, publisher::OutboundMessage};

pub const RETRIES_EXPIRED: &str = "payment status retries expired";
pub const PROCESSING_TIME_EXPIRED: &str = "payment processing time expired";
pub const GATEWAY_CANCELLED: &str = "payment gateway cancelled the transaction";
pub const TRANSACTION_CANCELLED: &str = "transaction cancelled by the user";
pub const SERVICE_SHUTDOWN: &str = "payment gateway service is shutting down";
pub const WORKER_ABORTED: &str = "payment worker stopped unexpectedly";

/// Why a worker was asked to stop from the outside.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StopReason {
    #[default]
    Undefined,
    CancelledTransaction,
    Shutdown,
}

impl StopReason {
    pub fn failure_reason(&self) -> &'static str {
        match self {
            Self::CancelledTransaction => TRANSACTION_CANCELLED,
            Self::Shutdown | Self::Undefined => SERVICE_SHUTDOWN,
        }
    }
}

impl Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::CancelledTransaction => f.write_str("cancelled transaction"),
            Self::Shutdown => f.write_str("shutdown"),
        }
    }
}

/// The terminal result of a payment worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Succeeded,
    Failed(String),
    Cancelled(String),
}

impl Resolution {
    pub fn failed<S: Into<String>>(reason: S) -> Self {
        Self::Failed(reason.into())
    }

    pub fn from_stop(reason: StopReason) -> Self {
        match reason {
            StopReason::CancelledTransaction => Self::Cancelled(reason.failure_reason().to_string()),
            _ => Self::Failed(reason.failure_reason().to_string()),
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Succeeded => None,
            Self::Failed(reason) | Self::Cancelled(reason) => Some(reason.as_str()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Builds the message the monitor will route to the succeeded or failed topic.
    pub fn to_message(&self, transaction_id: &TransactionId, config: &WorkerConfig) -> Result<OutboundMessage, PublishError> {
        let payload = match self {
            Self::Succeeded => ProcessEnvelope::new(
                config.service_name.as_str(),
                config.succeeded_transaction_topic.as_str(),
                serde_json::to_value(SucceededTransaction { transaction_id: transaction_id.clone() })?,
            ),
            Self::Failed(reason) | Self::Cancelled(reason) => ProcessEnvelope::new(
                config.service_name.as_str(),
                config.failed_transaction_topic.as_str(),
                serde_json::to_value(FailedTransaction { transaction_id: transaction_id.clone(), reason: reason.clone() })?,
            ),
        }
        .encode()?;
        Ok(OutboundMessage::new(config.monitor_process_topic.as_str(), payload))
    }
}

impl Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Succeeded => f.write_str("succeeded"),
            Self::Failed(reason) => write!(f, "failed ({reason})"),
            Self::Cancelled(reason) => write!(f, "cancelled ({reason})"),
        }
    }
}
