//! Wire types shared between the payment gateway engine and the service binary.
//!
//! Everything in here is plain data: identifiers, the inbound transaction events, and the outcome messages the
//! payment gateway hands back to the rest of the system. The JSON shapes match what the transaction service
//! publishes and what the monitor service routes onward.
mod events;
mod helpers;
mod outcomes;
mod transaction_id;

pub use events::{CancelledTransaction, DecodeError, ProcessedTransaction, Transaction, TransactionUser};
pub use helpers::{parse_boolean_flag, parse_duration_ms};
pub use outcomes::{FailedTransaction, ProcessEnvelope, SucceededTransaction};
pub use transaction_id::TransactionId;
