//! Payment Gateway Engine
//!
//! The engine settles transactions on external payment rails. Every transaction that the transaction service marks
//! as processed gets its own [`PaymentWorker`], which creates the payment on the rail chosen by the transaction's
//! payment method and polls the rail until the payment settles, fails, runs out of time or is cancelled. Exactly
//! one outcome is published for every worker that gets as far as creating its payment.
//!
//! The library is made up of:
//! 1. The payment gateway capability ([`mod@gateway`]). Each settlement rail implements [`PaymentGateway`] and is
//!    registered in a [`GatewayDirectory`] under the payment method names it serves. A [`StubGateway`] that settles
//!    every payment immediately is provided for test deployments.
//! 2. The [`PaymentWorker`] state machine ([`mod@worker`]).
//! 3. The [`TaskSupervisor`] ([`mod@supervisor`]), which runs workers on a bounded [`WorkerPool`], keeps track of
//!    them in a [`WorkerRegistry`], routes cancellations to them and drains them on shutdown.
//! 4. The edges: a [`TransactionRouter`] that decodes inbound messages, and the [`OutcomePublisher`] contract that
//!    outcomes leave through.
pub mod config;
pub mod errors;
pub mod gateway;
pub mod ingress;
pub mod publisher;
pub mod supervisor;
pub mod worker;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use config::{InboundTopics, PoolConfig, StubGatewayConfig, SupervisorConfig, WorkerConfig};
pub use errors::{ConfigError, DispatchError, GatewayError, PoolError, PublishError, WorkerError};
pub use gateway::{
    GatewayDirectory,
    GatewayFactory,
    PaymentGateway,
    PaymentRef,
    PaymentStatus,
    SharedGateway,
    StubGateway,
    TransactionInfo,
};
pub use ingress::{Ack, InboundMessage, RouteOutcome, TransactionRouter};
pub use pgw_common::TransactionId;
pub use publisher::{ChannelPublisher, OutboundChannel, OutboundHandler, OutboundMessage, OutcomePublisher, SharedPublisher};
pub use supervisor::{TaskSupervisor, WorkerPool, WorkerRegistry};
pub use worker::{PaymentWorker, Resolution, StopReason, WorkerState};
