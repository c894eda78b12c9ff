//! Newline-delimited JSON transport.
//!
//! Every line carries one message: `{"topic": "...", "payload": <JSON>}`. Inbound lines are decoded into
//! [`InboundMessage`]s and handed to the [`TransactionRouter`]; outbound messages are written in the same shape.
use std::sync::Arc;

use log::*;
use payment_gateway_engine::{InboundMessage, OutboundHandler, OutboundMessage, TransactionRouter};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};

use crate::errors::ServerError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub topic: String,
    pub payload: Value,
}

impl From<WireMessage> for InboundMessage {
    fn from(message: WireMessage) -> Self {
        InboundMessage::new(message.topic, message.payload.to_string().into_bytes())
    }
}

impl From<&OutboundMessage> for WireMessage {
    fn from(message: &OutboundMessage) -> Self {
        let payload = serde_json::from_slice(&message.payload)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&message.payload).into_owned()));
        Self { topic: message.topic.clone(), payload }
    }
}

/// Routes every line of `reader` until it is exhausted. Returns the number of messages routed.
///
/// Lines that are not wire messages are logged and skipped, the same way the router treats malformed payloads.
pub async fn read_messages<R>(reader: R, router: &TransactionRouter) -> Result<usize, ServerError>
where R: AsyncBufRead + Unpin {
    let mut lines = reader.lines();
    let mut count = 0;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<WireMessage>(line) {
            Ok(message) => {
                trace!("📨️ Received message on '{}'", message.topic);
                router.route(&message.into()).await;
                count += 1;
            },
            Err(e) => warn!("📨️ Skipping a line that is not a valid message. {e}"),
        }
    }
    debug!("📨️ Inbound stream closed after {count} messages");
    Ok(count)
}

/// An outbound handler that writes each message to `writer` as one line of JSON.
pub fn line_writer<W>(writer: W) -> OutboundHandler
where W: AsyncWrite + Unpin + Send + 'static {
    let writer = Arc::new(Mutex::new(writer));
    Arc::new(move |message| {
        let writer = Arc::clone(&writer);
        Box::pin(async move {
            let wire = WireMessage::from(&message);
            let mut line = match serde_json::to_vec(&wire) {
                Ok(line) => line,
                Err(e) => {
                    error!("📨️ Could not encode the message for {}. {e}", message.topic);
                    return;
                },
            };
            line.push(b'\n');
            let mut writer = writer.lock().await;
            if let Err(e) = write_line(&mut *writer, &line).await {
                error!("📨️ Could not write the message for {}. {e}", message.topic);
            }
        })
    })
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &[u8]) -> std::io::Result<()> {
    writer.write_all(line).await?;
    writer.flush().await
}
