//! Inbound side of the payment gateway.
//!
//! The transport hands every message it receives to a [`TransactionRouter`], which decodes it according to its topic
//! and forwards it to the [`TaskSupervisor`]. Whatever happens, the message is acknowledged: a malformed or
//! unroutable message would fail the same way on every redelivery.
use std::sync::Arc;

use log::*;
use pgw_common::{CancelledTransaction, ProcessedTransaction};

use crate::{config::InboundTopics, supervisor::TaskSupervisor};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl InboundMessage {
    pub fn new<S: Into<String>>(topic: S, payload: Vec<u8>) -> Self {
        Self { topic: topic.into(), payload }
    }
}

/// What the transport should do with a message once it has been routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// Commit the message; it must not be delivered again.
    Acknowledged,
}

/// What the router made of a message. Returned alongside the [`Ack`] so transports and tests can report on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    Dispatched,
    DispatchRejected,
    Cancelled,
    NothingToCancel,
    Malformed,
    UnknownTopic,
}

#[derive(Debug, Clone)]
pub struct TransactionRouter {
    supervisor: Arc<TaskSupervisor>,
    topics: InboundTopics,
}

impl TransactionRouter {
    pub fn new(supervisor: Arc<TaskSupervisor>) -> Self {
        let topics = supervisor.config().topics.clone();
        Self { supervisor, topics }
    }

    pub fn supervisor(&self) -> &Arc<TaskSupervisor> {
        &self.supervisor
    }

    pub async fn route(&self, message: &InboundMessage) -> Ack {
        let outcome = self.route_message(message).await;
        trace!("📨️ Message on '{}' routed: {outcome:?}", message.topic);
        Ack::Acknowledged
    }

    pub async fn route_message(&self, message: &InboundMessage) -> RouteOutcome {
        let topic = message.topic.as_str();
        if topic == self.topics.processed_transaction_topic {
            match ProcessedTransaction::decode(&message.payload) {
                Ok(event) => match self.supervisor.dispatch(&event).await {
                    Ok(()) => RouteOutcome::Dispatched,
                    Err(e) => {
                        info!("📨️ Processed transaction {} was not dispatched. {e}", event.transaction_id());
                        RouteOutcome::DispatchRejected
                    },
                },
                Err(e) => {
                    warn!("📨️ Discarding malformed message on '{topic}'. {e}");
                    RouteOutcome::Malformed
                },
            }
        } else if topic == self.topics.cancelled_transaction_topic {
            match CancelledTransaction::decode(&message.payload) {
                Ok(event) if self.supervisor.cancel(&event).await => RouteOutcome::Cancelled,
                Ok(_) => RouteOutcome::NothingToCancel,
                Err(e) => {
                    warn!("📨️ Discarding malformed message on '{topic}'. {e}");
                    RouteOutcome::Malformed
                },
            }
        } else {
            warn!("📨️ Discarding message on unexpected topic '{topic}'");
            RouteOutcome::UnknownTopic
        }
    }
}
