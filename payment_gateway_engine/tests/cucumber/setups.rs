use std::time::Duration;

use cucumber::given;
use payment_gateway_engine::{test_utils::GatewayScript, PaymentStatus};

use crate::cucumber::SupervisionWorld;

#[given(expr = "a payment gateway for '{word}' that settles after {int} pending checks")]
async fn settling_gateway(world: &mut SupervisionWorld, method: String, pending: usize) {
    world.scripts.push((method, GatewayScript::succeeds_after(pending)));
}

#[given(expr = "a payment gateway for '{word}' that never settles")]
async fn pending_gateway(world: &mut SupervisionWorld, method: String) {
    world.scripts.push((method, GatewayScript::always(PaymentStatus::Pending)));
}

#[given(expr = "a payment gateway for '{word}' that cancels every payment")]
async fn cancelling_gateway(world: &mut SupervisionWorld, method: String) {
    world.scripts.push((method, GatewayScript::always(PaymentStatus::Cancelled)));
}

#[given(expr = "a payment gateway for '{word}' that rejects new payments")]
async fn rejecting_gateway(world: &mut SupervisionWorld, method: String) {
    world.scripts.push((method, GatewayScript::rejecting_creation("payment rejected by the rail")));
}

#[given(expr = "a payment gateway for '{word}' that answers status checks after {int}ms")]
async fn slow_gateway(world: &mut SupervisionWorld, method: String, delay: u64) {
    let script = GatewayScript::succeeds_after(0).with_check_delay(Duration::from_millis(delay));
    world.scripts.push((method, script));
}

#[given(expr = "gateways poll every {int}ms at most {int} times")]
async fn poll_timing(world: &mut SupervisionWorld, period: u64, retries: u32) {
    world.poll_period = Duration::from_millis(period);
    world.retries = retries;
}

#[given(expr = "the payment processing time is {int}ms")]
async fn processing_time(world: &mut SupervisionWorld, millis: u64) {
    world.processing_time = Duration::from_millis(millis);
}

#[given(expr = "the pool runs at most {int} workers")]
async fn pool_size(world: &mut SupervisionWorld, max_workers: usize) {
    world.max_workers = max_workers;
}
