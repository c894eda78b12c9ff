//! The capability contract for external settlement rails.
//!
//! A [`PaymentGateway`] is created per transaction. It knows how to submit the payment to its rail, how to ask the
//! rail whether the payment has settled, and how often and how many times it is worth asking. The supervisor looks
//! up which gateway to use from the transaction's payment method via the [`GatewayDirectory`].
mod directory;
mod stub;

use std::{fmt::Display, sync::Arc, time::Duration};

use async_trait::async_trait;
pub use directory::{GatewayDirectory, GatewayFactory};
use pgw_common::{ProcessedTransaction, TransactionId, TransactionUser};
pub use stub::StubGateway;

use crate::errors::GatewayError;

/// Status of a payment as reported by the settlement rail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PaymentStatus {
    #[default]
    Undefined,
    Pending,
    Succeeded,
    Cancelled,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Undefined => f.write_str("Undefined"),
            Self::Pending => f.write_str("Pending"),
            Self::Succeeded => f.write_str("Succeeded"),
            Self::Cancelled => f.write_str("Cancelled"),
        }
    }
}

/// The rail's reference for a payment that has been created, e.g. a pending transaction hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PaymentRef(String);

impl PaymentRef {
    pub fn new<S: Into<String>>(reference: S) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PaymentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything a gateway factory needs to know about the transaction it will settle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionInfo {
    pub transaction_id: TransactionId,
    pub value: String,
    pub currency: String,
    pub sender: TransactionUser,
    pub receiver: TransactionUser,
}

impl From<&ProcessedTransaction> for TransactionInfo {
    fn from(event: &ProcessedTransaction) -> Self {
        Self {
            transaction_id: event.transaction.transaction_id.clone(),
            value: event.transaction.value.clone(),
            currency: event.transaction.currency.clone(),
            sender: event.sender.clone(),
            receiver: event.receiver.clone(),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Submits the payment to the rail and returns the rail's reference for it.
    async fn create_payment(&self) -> Result<PaymentRef, GatewayError>;

    /// Asks the rail for the current status of a payment created by [`Self::create_payment`].
    ///
    /// A payment that has not settled yet should be reported as [`PaymentStatus::Pending`]. Errors are reserved for
    /// failures to talk to the rail at all.
    async fn check_status(&self, payment: &PaymentRef) -> Result<PaymentStatus, GatewayError>;

    /// The transaction this gateway instance was created for.
    fn transaction_id(&self) -> &TransactionId;

    /// Interval between two status checks.
    fn timeout(&self) -> Duration;

    /// Maximum number of status checks before the payment is given up on.
    fn retries(&self) -> u32;
}

pub type SharedGateway = Arc<dyn PaymentGateway>;
