use std::{future::Future, pin::Pin, sync::Arc};

use async_trait::async_trait;
use log::*;
use tokio::sync::mpsc;

use crate::{
    errors::PublishError,
    publisher::{OutboundMessage, OutcomePublisher},
};

pub type OutboundHandler = Arc<dyn Fn(OutboundMessage) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// A bounded queue of outbound messages.
///
/// Workers publish through [`ChannelPublisher`]s obtained from [`Self::subscribe`]; the transport consumes the
/// queue with [`Self::run`], which returns once every publisher has been dropped and the queue is empty.
pub struct OutboundChannel {
    receiver: mpsc::Receiver<OutboundMessage>,
    sender: mpsc::Sender<OutboundMessage>,
}

impl OutboundChannel {
    pub fn new(buffer_size: usize) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size);
        Self { receiver, sender }
    }

    pub fn subscribe(&self) -> ChannelPublisher {
        ChannelPublisher { sender: self.sender.clone() }
    }

    pub async fn run(mut self, handler: OutboundHandler) {
        debug!("📤️ Starting outbound message handler");
        // drop the internal sender so that when the last publisher is dropped, the handler shuts down by itself
        drop(self.sender);
        let mut count = 0u64;
        while let Some(message) = self.receiver.recv().await {
            trace!("📤️ Handling message for {}", message.topic);
            (handler)(message).await;
            count += 1;
        }
        debug!("📤️ Outbound message handler has shut down after {count} messages");
    }
}

#[derive(Clone)]
pub struct ChannelPublisher {
    sender: mpsc::Sender<OutboundMessage>,
}

#[async_trait]
impl OutcomePublisher for ChannelPublisher {
    async fn publish(&self, message: OutboundMessage) -> Result<(), PublishError> {
        self.sender.send(message).await.map_err(|e| {
            error!("📤️ Failed to queue message for {}: the outbound channel is closed", e.0.topic);
            PublishError::Closed
        })
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn drains_until_publishers_are_dropped() {
        let _ = env_logger::try_init();
        let count = Arc::new(AtomicUsize::new(0));
        let c2 = count.clone();
        let handler: OutboundHandler = Arc::new(move |msg| {
            let count = count.clone();
            Box::pin(async move {
                assert_eq!(msg.topic, "monitor.process");
                count.fetch_add(msg.payload.len(), Ordering::SeqCst);
            })
        });
        let channel = OutboundChannel::new(1);
        let p1 = channel.subscribe();
        let p2 = channel.subscribe();
        let runner = tokio::spawn(channel.run(handler));
        for _ in 0..3 {
            p1.publish(OutboundMessage::new("monitor.process", vec![1])).await.unwrap();
            p2.publish(OutboundMessage::new("monitor.process", vec![1, 2])).await.unwrap();
        }
        drop(p1);
        drop(p2);
        runner.await.unwrap();
        assert_eq!(c2.load(Ordering::SeqCst), 9);
    }

    #[tokio::test]
    async fn publishing_to_a_closed_channel_fails() {
        let channel = OutboundChannel::new(1);
        let publisher = channel.subscribe();
        drop(channel);
        let err = publisher.publish(OutboundMessage::new("t", vec![])).await.unwrap_err();
        assert_eq!(err, PublishError::Closed);
    }
}
