use std::time::Duration;

use cucumber::{then, when};
use payment_gateway_engine::{Ack, InboundMessage, TransactionId};

use crate::cucumber::SupervisionWorld;

const SUCCEEDED_TOPIC: &str = "transaction.succeeded";
const FAILED_TOPIC: &str = "transaction.failed";

fn processed_message(id: &str, method: &str) -> InboundMessage {
    let body = serde_json::json!({
        "transaction": {"transaction_id": id, "value": "25", "currency": "ALGO", "payment_method": method},
        "sender": {"user_id": "alice", "wallet_id": "wallet-alice"},
        "receiver": {"user_id": "bob", "wallet_id": "wallet-bob"}
    });
    InboundMessage::new("transaction.processed", body.to_string().into_bytes())
}

#[when(expr = "transaction {word} is processed with payment method '{word}'")]
async fn transaction_processed(world: &mut SupervisionWorld, id: String, method: String) {
    let message = processed_message(&id, &method);
    let ack = world.system().router.route(&message).await;
    assert_eq!(ack, Ack::Acknowledged);
}

#[when(expr = "transaction {word} is cancelled")]
async fn transaction_cancelled(world: &mut SupervisionWorld, id: String) {
    let body = serde_json::json!({ "transaction_id": id });
    let message = InboundMessage::new("transaction.cancelled", body.to_string().into_bytes());
    let ack = world.system().router.route(&message).await;
    assert_eq!(ack, Ack::Acknowledged);
}

#[when(expr = "a malformed message arrives on '{word}'")]
async fn malformed_message(world: &mut SupervisionWorld, topic: String) {
    let message = InboundMessage::new(topic, b"{\"transaction\": 42".to_vec());
    let ack = world.system().router.route(&message).await;
    assert_eq!(ack, Ack::Acknowledged);
}

#[when(expr = "I pause for {int}ms")]
async fn pause(_world: &mut SupervisionWorld, ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[when("all payments have finished")]
async fn wait_for_idle(world: &mut SupervisionWorld) {
    let supervisor = world.system().supervisor.clone();
    tokio::time::timeout(Duration::from_secs(10), supervisor.wait_until_idle(Duration::from_millis(5)))
        .await
        .expect("Payments did not finish in time");
}

#[when("the service shuts down")]
async fn shut_down(world: &mut SupervisionWorld) {
    world.system().supervisor.shutdown().await;
}

#[then(expr = "exactly one outcome for {word} is published on the succeeded topic")]
async fn one_success(world: &mut SupervisionWorld, id: String) {
    let outcomes = world.system().publisher.outcomes_for(&id);
    assert_eq!(outcomes.len(), 1, "outcomes for {id}: {outcomes:?}");
    assert_eq!(outcomes[0].to_topic, SUCCEEDED_TOPIC);
    assert_eq!(outcomes[0].reason, None);
}

#[then(expr = "exactly one outcome for {word} is published on the failed topic with reason {string}")]
async fn one_failure(world: &mut SupervisionWorld, id: String, reason: String) {
    let outcomes = world.system().publisher.outcomes_for(&id);
    assert_eq!(outcomes.len(), 1, "outcomes for {id}: {outcomes:?}");
    assert_eq!(outcomes[0].to_topic, FAILED_TOPIC);
    assert_eq!(outcomes[0].reason.as_deref(), Some(reason.as_str()));
}

#[then(expr = "exactly one outcome for {word} is published")]
async fn one_outcome(world: &mut SupervisionWorld, id: String) {
    let outcomes = world.system().publisher.outcomes_for(&id);
    assert_eq!(outcomes.len(), 1, "outcomes for {id}: {outcomes:?}");
}

#[then(expr = "no outcome is published for {word}")]
async fn no_outcome(world: &mut SupervisionWorld, id: String) {
    let outcomes = world.system().publisher.outcomes_for(&id);
    assert!(outcomes.is_empty(), "outcomes for {id}: {outcomes:?}");
}

#[then("no outcome is published at all")]
async fn nothing_published(world: &mut SupervisionWorld) {
    assert!(world.system().publisher.messages().is_empty());
}

#[then(expr = "transaction {word} is not registered")]
async fn not_registered(world: &mut SupervisionWorld, id: String) {
    assert!(!world.system().supervisor.is_registered(&TransactionId::from(id)).await);
}

#[then(expr = "transaction {word} is registered")]
async fn registered(world: &mut SupervisionWorld, id: String) {
    assert!(world.system().supervisor.is_registered(&TransactionId::from(id)).await);
}

#[then(expr = "the gateway for {word} was checked {int} times")]
async fn checked_times(world: &mut SupervisionWorld, id: String, times: usize) {
    let gateway = world.system().book.gateway(&id).expect("No gateway was created for the transaction");
    assert_eq!(gateway.check_calls(), times);
}

#[then(expr = "the gateway for {word} was checked at most {int} times")]
async fn checked_at_most(world: &mut SupervisionWorld, id: String, times: usize) {
    let gateway = world.system().book.gateway(&id).expect("No gateway was created for the transaction");
    assert!(gateway.check_calls() <= times, "checked {} times", gateway.check_calls());
}

#[then(expr = "no gateway was created for {word}")]
async fn no_gateway(world: &mut SupervisionWorld, id: String) {
    assert!(world.system().book.gateway(&id).is_none());
}

#[then("the supervisor is idle")]
async fn idle(world: &mut SupervisionWorld) {
    assert!(world.system().supervisor.is_idle().await);
}
