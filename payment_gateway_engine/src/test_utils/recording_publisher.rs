use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    errors::PublishError,
    publisher::{OutboundMessage, OutcomePublisher},
};

/// An outcome as the monitor would see it.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedOutcome {
    pub topic: String,
    pub from: String,
    pub to_topic: String,
    pub transaction_id: String,
    pub reason: Option<String>,
}

/// Keeps every published message in memory. Can be told to reject messages to simulate a broker outage.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    messages: Mutex<Vec<OutboundMessage>>,
    failing: AtomicBool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.messages.lock().expect("publisher lock poisoned").clone()
    }

    pub fn outcomes(&self) -> Vec<PublishedOutcome> {
        self.messages().iter().filter_map(decode).collect()
    }

    pub fn outcomes_for(&self, transaction_id: &str) -> Vec<PublishedOutcome> {
        self.outcomes().into_iter().filter(|o| o.transaction_id == transaction_id).collect()
    }
}

fn decode(message: &OutboundMessage) -> Option<PublishedOutcome> {
    let value: Value = serde_json::from_slice(&message.payload).ok()?;
    Some(PublishedOutcome {
        topic: message.topic.clone(),
        from: value["from"].as_str()?.to_string(),
        to_topic: value["to_topic"].as_str()?.to_string(),
        transaction_id: value["payload"]["transaction_id"].as_str()?.to_string(),
        reason: value["payload"]["reason"].as_str().map(String::from),
    })
}

#[async_trait]
impl OutcomePublisher for RecordingPublisher {
    async fn publish(&self, message: OutboundMessage) -> Result<(), PublishError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PublishError::Transport("broker unavailable".into()));
        }
        self.messages.lock().expect("publisher lock poisoned").push(message);
        Ok(())
    }
}
