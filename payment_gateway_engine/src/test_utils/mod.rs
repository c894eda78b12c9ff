//! Deterministic collaborators for exercising workers and the supervisor without a real rail or broker.
mod recording_publisher;
mod scripted_gateway;

pub use recording_publisher::{PublishedOutcome, RecordingPublisher};
pub use scripted_gateway::{GatewayScript, ScriptBook, ScriptedGateway};

pub fn init_test_logging() {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
}
