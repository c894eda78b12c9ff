//! # Payment gateway server
//! Runs the payment gateway engine as a service. It is responsible for:
//! Reading `transaction.processed` and `transaction.cancelled` messages from the inbound transport.
//! Settling each processed transaction through the gateway for its payment method.
//! Writing the outcome of every payment to the outbound transport, via the monitor topic.
//!
//! ## Transport
//! Messages are exchanged as newline-delimited JSON objects of the form `{"topic": "...", "payload": {...}}`.
//! Inbound messages are read from stdin and outcomes are written to stdout. See [transport](transport/index.html).
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.

pub mod cli;
pub mod config;
pub mod errors;
pub mod server;
pub mod transport;
