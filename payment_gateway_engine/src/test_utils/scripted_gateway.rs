use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use pgw_common::TransactionId;

use crate::{
    errors::GatewayError,
    gateway::{GatewayDirectory, PaymentGateway, PaymentRef, PaymentStatus, SharedGateway},
};

/// How a [`ScriptedGateway`] behaves.
#[derive(Debug, Clone)]
pub struct GatewayScript {
    pub payment_ref: Result<PaymentRef, GatewayError>,
    /// Answers to successive status checks. Once exhausted, `then` is returned forever.
    pub statuses: VecDeque<Result<PaymentStatus, GatewayError>>,
    pub then: Result<PaymentStatus, GatewayError>,
    pub create_delay: Duration,
    pub check_delay: Duration,
    pub timeout: Duration,
    pub retries: u32,
}

impl Default for GatewayScript {
    fn default() -> Self {
        Self {
            payment_ref: Ok(PaymentRef::new("P1")),
            statuses: VecDeque::new(),
            then: Ok(PaymentStatus::Pending),
            create_delay: Duration::ZERO,
            check_delay: Duration::ZERO,
            timeout: Duration::from_millis(20),
            retries: 10,
        }
    }
}

impl GatewayScript {
    pub fn succeeds_after(pending: usize) -> Self {
        let mut statuses = VecDeque::new();
        statuses.extend((0..pending).map(|_| Ok(PaymentStatus::Pending)));
        statuses.push_back(Ok(PaymentStatus::Succeeded));
        Self { statuses, ..Default::default() }
    }

    pub fn always(status: PaymentStatus) -> Self {
        Self { then: Ok(status), ..Default::default() }
    }

    pub fn failing_checks(detail: &str) -> Self {
        Self { then: Err(GatewayError::CheckStatus(detail.to_string())), ..Default::default() }
    }

    pub fn rejecting_creation(detail: &str) -> Self {
        Self { payment_ref: Err(GatewayError::CreatePayment(detail.to_string())), ..Default::default() }
    }

    pub fn with_payment_ref(mut self, reference: &str) -> Self {
        self.payment_ref = Ok(PaymentRef::new(reference));
        self
    }

    pub fn with_timing(mut self, timeout: Duration, retries: u32) -> Self {
        self.timeout = timeout;
        self.retries = retries;
        self
    }

    pub fn with_check_delay(mut self, delay: Duration) -> Self {
        self.check_delay = delay;
        self
    }

    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = delay;
        self
    }
}

/// A gateway that follows a [`GatewayScript`] and counts how it was called.
#[derive(Debug)]
pub struct ScriptedGateway {
    transaction_id: TransactionId,
    script: GatewayScript,
    statuses: Mutex<VecDeque<Result<PaymentStatus, GatewayError>>>,
    create_calls: AtomicUsize,
    check_calls: AtomicUsize,
    checked_refs: Mutex<Vec<PaymentRef>>,
}

impl ScriptedGateway {
    pub fn new<T: Into<TransactionId>>(transaction_id: T, script: GatewayScript) -> Self {
        let statuses = Mutex::new(script.statuses.clone());
        Self {
            transaction_id: transaction_id.into(),
            script,
            statuses,
            create_calls: AtomicUsize::new(0),
            check_calls: AtomicUsize::new(0),
            checked_refs: Mutex::new(Vec::new()),
        }
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn check_calls(&self) -> usize {
        self.check_calls.load(Ordering::SeqCst)
    }

    pub fn checked_refs(&self) -> Vec<PaymentRef> {
        self.checked_refs.lock().expect("checked_refs lock poisoned").clone()
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn create_payment(&self) -> Result<PaymentRef, GatewayError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if !self.script.create_delay.is_zero() {
            tokio::time::sleep(self.script.create_delay).await;
        }
        self.script.payment_ref.clone()
    }

    async fn check_status(&self, payment: &PaymentRef) -> Result<PaymentStatus, GatewayError> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        self.checked_refs.lock().expect("checked_refs lock poisoned").push(payment.clone());
        if !self.script.check_delay.is_zero() {
            tokio::time::sleep(self.script.check_delay).await;
        }
        let next = self.statuses.lock().expect("statuses lock poisoned").pop_front();
        next.unwrap_or_else(|| self.script.then.clone())
    }

    fn transaction_id(&self) -> &TransactionId {
        &self.transaction_id
    }

    fn timeout(&self) -> Duration {
        self.script.timeout
    }

    fn retries(&self) -> u32 {
        self.script.retries
    }
}

/// Registers scripted gateways in a [`GatewayDirectory`] and keeps hold of every gateway it builds, so tests can
/// see how each transaction's gateway was used.
#[derive(Debug, Clone, Default)]
pub struct ScriptBook {
    created: Arc<Mutex<HashMap<TransactionId, Arc<ScriptedGateway>>>>,
}

impl ScriptBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, directory: &mut GatewayDirectory, method: &str, script: GatewayScript) {
        let created = Arc::clone(&self.created);
        directory.register(method, move |info| {
            let gateway = Arc::new(ScriptedGateway::new(info.transaction_id.clone(), script.clone()));
            created.lock().expect("script book lock poisoned").insert(info.transaction_id, Arc::clone(&gateway));
            Ok(gateway as SharedGateway)
        });
    }

    pub fn gateway(&self, transaction_id: &str) -> Option<Arc<ScriptedGateway>> {
        self.created.lock().expect("script book lock poisoned").get(&TransactionId::from(transaction_id)).cloned()
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().expect("script book lock poisoned").len()
    }
}
