use std::{collections::HashMap, fmt::Debug, sync::Arc};

use log::*;
use pgw_common::ProcessedTransaction;

use crate::{
    config::StubGatewayConfig,
    errors::{DispatchError, GatewayError},
    gateway::{SharedGateway, StubGateway, TransactionInfo},
};

/// Builds the gateway that will settle one transaction.
pub type GatewayFactory = Arc<dyn Fn(TransactionInfo) -> Result<SharedGateway, GatewayError> + Send + Sync>;

/// Maps payment method names to the factories that build gateways for them.
#[derive(Clone, Default)]
pub struct GatewayDirectory {
    factories: HashMap<String, GatewayFactory>,
}

impl Debug for GatewayDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut methods = self.methods();
        methods.sort_unstable();
        write!(f, "GatewayDirectory({})", methods.join(", "))
    }
}

impl GatewayDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` for `method`, replacing any factory previously registered for it.
    pub fn register<F>(&mut self, method: &str, factory: F) -> &mut Self
    where F: Fn(TransactionInfo) -> Result<SharedGateway, GatewayError> + Send + Sync + 'static {
        if self.factories.insert(method.to_string(), Arc::new(factory)).is_some() {
            warn!("💳️ The gateway factory for '{method}' has been replaced");
        }
        self
    }

    /// Serves `method` with the [`StubGateway`].
    pub fn register_stub(&mut self, method: &str, config: StubGatewayConfig) -> &mut Self {
        self.register(method, move |info| Ok(Arc::new(StubGateway::new(info, config)) as SharedGateway))
    }

    pub fn methods(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn supports(&self, method: &str) -> bool {
        self.factories.contains_key(method)
    }

    /// Builds the gateway for the payment method named in `event`.
    pub fn resolve(&self, event: &ProcessedTransaction) -> Result<SharedGateway, DispatchError> {
        let method = event.payment_method();
        let factory = self.factories.get(method).ok_or_else(|| DispatchError::UnknownPaymentMethod {
            transaction_id: event.transaction_id().clone(),
            method: method.to_string(),
        })?;
        (factory)(TransactionInfo::from(event)).map_err(|source| DispatchError::GatewayConstruction {
            transaction_id: event.transaction_id().clone(),
            method: method.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod test {
    use pgw_common::{Transaction, TransactionUser};

    use super::*;

    fn event(method: &str) -> ProcessedTransaction {
        ProcessedTransaction {
            transaction: Transaction {
                transaction_id: "T3".into(),
                value: "5".into(),
                currency: "ALGO".into(),
                payment_method: method.into(),
            },
            sender: TransactionUser::default(),
            receiver: TransactionUser::default(),
        }
    }

    #[test]
    fn resolves_registered_methods() {
        let mut directory = GatewayDirectory::new();
        directory.register_stub("algorand", StubGatewayConfig::default());
        assert!(directory.supports("algorand"));
        let gateway = directory.resolve(&event("algorand")).unwrap();
        assert_eq!(gateway.transaction_id().as_str(), "T3");
    }

    #[test]
    fn unknown_method_is_a_dispatch_error() {
        let directory = GatewayDirectory::new();
        let err = directory.resolve(&event("unknown")).err().unwrap();
        assert_eq!(
            err,
            DispatchError::UnknownPaymentMethod { transaction_id: "T3".into(), method: "unknown".into() }
        );
    }

    #[test]
    fn factory_failures_are_reported() {
        let mut directory = GatewayDirectory::new();
        directory.register("broken", |_| Err(GatewayError::Construction("no node configured".into())));
        let err = directory.resolve(&event("broken")).err().unwrap();
        assert!(matches!(err, DispatchError::GatewayConstruction { ref method, .. } if method == "broken"));
        assert_eq!(format!("{directory:?}"), "GatewayDirectory(broken)");
    }
}
