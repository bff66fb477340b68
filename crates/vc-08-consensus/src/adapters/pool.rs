use crate::ports::TransactionPool;
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{Hash, Transaction};
use std::collections::{HashSet, VecDeque};

#[derive(Default)]
struct PoolInner {
    queue: VecDeque<(Hash, Transaction)>,
    ids: HashSet<Hash>,
}

/// FIFO transaction pool, de-duplicated by transaction id.
#[derive(Default)]
pub struct InMemoryTransactionPool {
    inner: Mutex<PoolInner>,
}

impl InMemoryTransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a transaction. Returns `false` if it is already pending.
    pub fn submit(&self, tx: Transaction) -> bool {
        let id = tx.id();
        let mut inner = self.inner.lock();
        if !inner.ids.insert(id) {
            return false;
        }
        inner.queue.push_back((id, tx));
        true
    }

    pub fn len(&self) -> usize {
        self.inner.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TransactionPool for InMemoryTransactionPool {
    async fn pending_transactions(&self, max: usize) -> Vec<Transaction> {
        self.inner
            .lock()
            .queue
            .iter()
            .take(max)
            .map(|(_, tx)| tx.clone())
            .collect()
    }

    async fn remove(&self, ids: &[Hash]) {
        let mut inner = self.inner.lock();
        let removed: HashSet<Hash> = ids.iter().filter(|id| inner.ids.remove(*id)).copied().collect();
        if !removed.is_empty() {
            inner.queue.retain(|(id, _)| !removed.contains(id));
        }
    }
}
