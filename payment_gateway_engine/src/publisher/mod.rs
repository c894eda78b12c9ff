//! Outbound side of the payment gateway: where workers send their outcomes.
//!
//! The engine does not know about the message broker. It hands each outcome to an [`OutcomePublisher`] as a topic
//! and an encoded payload. [`OutboundChannel`] is an in-process implementation that lets a transport drain the
//! messages from a queue.
mod channel;

use std::sync::Arc;

use async_trait::async_trait;
pub use channel::{ChannelPublisher, OutboundChannel, OutboundHandler};

use crate::errors::PublishError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl OutboundMessage {
    pub fn new<S: Into<String>>(topic: S, payload: Vec<u8>) -> Self {
        Self { topic: topic.into(), payload }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OutcomePublisher: Send + Sync {
    /// Hands `message` to the transport. Implementations must not retry internally; failures are reported back to
    /// the worker that produced the outcome.
    async fn publish(&self, message: OutboundMessage) -> Result<(), PublishError>;
}

pub type SharedPublisher = Arc<dyn OutcomePublisher>;
