use std::time::Duration;

use async_trait::async_trait;
use log::*;
use pgw_common::TransactionId;

use crate::{
    config::StubGatewayConfig,
    errors::GatewayError,
    gateway::{PaymentGateway, PaymentRef, PaymentStatus, TransactionInfo},
};

pub const STUB_PAYMENT_REFERENCE: &str = "test";

/// A gateway that settles every payment on the first status check.
///
/// This is what test deployments register in place of a real settlement rail.
#[derive(Debug, Clone)]
pub struct StubGateway {
    info: TransactionInfo,
    config: StubGatewayConfig,
}

impl StubGateway {
    pub fn new(info: TransactionInfo, config: StubGatewayConfig) -> Self {
        Self { info, config }
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_payment(&self) -> Result<PaymentRef, GatewayError> {
        debug!(
            "🧪️ Stub payment of {} {} created for transaction {}",
            self.info.value, self.info.currency, self.info.transaction_id
        );
        Ok(PaymentRef::new(STUB_PAYMENT_REFERENCE))
    }

    async fn check_status(&self, _payment: &PaymentRef) -> Result<PaymentStatus, GatewayError> {
        Ok(PaymentStatus::Succeeded)
    }

    fn transaction_id(&self) -> &TransactionId {
        &self.info.transaction_id
    }

    fn timeout(&self) -> Duration {
        self.config.timeout
    }

    fn retries(&self) -> u32 {
        self.config.retries
    }
}
