use serde::{Deserialize, Serialize};

use crate::TransactionId;

/// Payload sent on the succeeded topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SucceededTransaction {
    pub transaction_id: TransactionId,
}

/// Payload sent on the failed topic. `reason` is a human-readable explanation of why settlement did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedTransaction {
    pub transaction_id: TransactionId,
    pub reason: String,
}

/// Routing wrapper understood by the monitor service.
///
/// Outcomes are not published to their final topic directly. They go to the monitor's process topic, tagged with
/// the originating service (`from`) and the topic the monitor should forward the payload to (`to_topic`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessEnvelope<T> {
    pub from: String,
    pub to_topic: String,
    pub payload: T,
}

impl<T: Serialize> ProcessEnvelope<T> {
    pub fn new<S1: Into<String>, S2: Into<String>>(from: S1, to_topic: S2, payload: T) -> Self {
        Self { from: from.into(), to_topic: to_topic.into(), payload }
    }

    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
