use std::{collections::HashMap, sync::Arc};

use pgw_common::TransactionId;
use tokio::sync::RwLock;

use crate::worker::PaymentWorker;

/// The set of payment workers currently running, keyed by transaction id.
///
/// At most one worker is registered per transaction. Removal is by identity, so a worker that has finished can never
/// evict a different worker registered under the same id afterwards.
#[derive(Debug, Default)]
pub struct WorkerRegistry {
    workers: RwLock<HashMap<TransactionId, Arc<PaymentWorker>>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the worker unless one is already registered for its transaction. Returns `true` if it was added.
    pub async fn try_register(&self, worker: Arc<PaymentWorker>) -> bool {
        let mut workers = self.workers.write().await;
        if workers.contains_key(worker.transaction_id()) {
            return false;
        }
        workers.insert(worker.transaction_id().clone(), worker);
        true
    }

    pub async fn get(&self, transaction_id: &TransactionId) -> Option<Arc<PaymentWorker>> {
        self.workers.read().await.get(transaction_id).cloned()
    }

    /// Removes `worker` if it is the one registered under its transaction id. Returns `true` if it was removed.
    pub async fn remove(&self, worker: &Arc<PaymentWorker>) -> bool {
        let mut workers = self.workers.write().await;
        match workers.get(worker.transaction_id()) {
            Some(current) if Arc::ptr_eq(current, worker) => {
                workers.remove(worker.transaction_id());
                true
            },
            _ => false,
        }
    }

    pub async fn contains(&self, transaction_id: &TransactionId) -> bool {
        self.workers.read().await.contains_key(transaction_id)
    }

    pub async fn len(&self) -> usize {
        self.workers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.workers.read().await.is_empty()
    }

    /// The registered workers, sorted by transaction id.
    pub async fn snapshot(&self) -> Vec<Arc<PaymentWorker>> {
        let workers = self.workers.read().await;
        let mut result = workers.values().cloned().collect::<Vec<_>>();
        result.sort_unstable_by(|a, b| a.transaction_id().as_str().cmp(b.transaction_id().as_str()));
        result
    }

    pub async fn transaction_ids(&self) -> Vec<TransactionId> {
        self.snapshot().await.iter().map(|w| w.transaction_id().clone()).collect()
    }
}
