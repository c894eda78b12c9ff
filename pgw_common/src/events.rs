use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::TransactionId;

#[derive(Debug, Error)]
#[error("Could not decode {kind} payload. {source}")]
pub struct DecodeError {
    pub kind: &'static str,
    #[source]
    pub source: serde_json::Error,
}

/// The transaction part of a processed transaction event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: TransactionId,
    pub value: String,
    pub currency: String,
    pub payment_method: String,
}

/// A participant of a transaction: the user and the wallet funds move from or to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionUser {
    pub user_id: String,
    pub wallet_id: String,
}

/// Published by the transaction service once a transaction has been accepted and should be settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedTransaction {
    pub transaction: Transaction,
    pub sender: TransactionUser,
    pub receiver: TransactionUser,
}

impl ProcessedTransaction {
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        serde_json::from_slice(data).map_err(|source| DecodeError { kind: "processed transaction", source })
    }

    pub fn transaction_id(&self) -> &TransactionId {
        &self.transaction.transaction_id
    }

    pub fn payment_method(&self) -> &str {
        self.transaction.payment_method.as_str()
    }
}

/// Published by the transaction service when a user cancels a transaction that may still be settling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelledTransaction {
    pub transaction_id: TransactionId,
}

impl CancelledTransaction {
    pub fn new<T: Into<TransactionId>>(transaction_id: T) -> Self {
        Self { transaction_id: transaction_id.into() }
    }

    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        serde_json::from_slice(data).map_err(|source| DecodeError { kind: "cancelled transaction", source })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn decode_processed_transaction() {
        let json = br#"{
            "transaction": {"transaction_id": "T1", "value": "100", "currency": "ALGO", "payment_method": "algorand"},
            "sender": {"user_id": "alice", "wallet_id": "wA"},
            "receiver": {"user_id": "bob", "wallet_id": "wB"}
        }"#;
        let tx = ProcessedTransaction::decode(json).unwrap();
        assert_eq!(tx.transaction_id().as_str(), "T1");
        assert_eq!(tx.payment_method(), "algorand");
        assert_eq!(tx.sender.wallet_id, "wA");
        assert_eq!(tx.receiver.user_id, "bob");
    }

    #[test]
    fn decode_cancelled_transaction() {
        let tx = CancelledTransaction::decode(br#"{"transaction_id": "T2"}"#).unwrap();
        assert_eq!(tx, CancelledTransaction::new("T2"));
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        let err = ProcessedTransaction::decode(b"{not json").unwrap_err();
        assert_eq!(err.kind, "processed transaction");
        let err = CancelledTransaction::decode(br#"{"id": "T2"}"#).unwrap_err();
        assert!(err.to_string().starts_with("Could not decode cancelled transaction payload."));
    }
}
