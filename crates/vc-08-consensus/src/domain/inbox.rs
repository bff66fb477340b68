//! # Inbox
//!
//! Verified peer input waiting for the next tick. Each sender has its own
//! quota, so one validator flooding the engine exhausts only its own share,
//! and re-deliveries of an item already queued are absorbed without using
//! any quota.

use shared_types::{Hash, ValidatorId};
use std::collections::{HashMap, HashSet, VecDeque};

/// Why an item was not queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboxRejection {
    /// The inbox holds `capacity` items.
    Full { capacity: usize },
    /// The sender already has `quota` items queued.
    QuotaExceeded { quota: usize },
}

/// Bounded queue with per-sender quotas and de-duplication.
#[derive(Debug)]
pub struct Inbox<T> {
    items: VecDeque<T>,
    per_sender: HashMap<ValidatorId, usize>,
    queued: HashSet<(ValidatorId, Hash)>,
    capacity: usize,
    quota: usize,
}

impl<T> Inbox<T> {
    pub fn new(capacity: usize, quota: usize) -> Self {
        Self {
            items: VecDeque::new(),
            per_sender: HashMap::new(),
            queued: HashSet::new(),
            capacity,
            quota: quota.min(capacity),
        }
    }

    /// Queue `item` from `sender`, identified by `key`. Returns `Ok(false)`
    /// when the same `(sender, key)` is already waiting.
    pub fn push(&mut self, sender: ValidatorId, key: Hash, item: T) -> Result<bool, InboxRejection> {
        if self.queued.contains(&(sender, key)) {
            return Ok(false);
        }
        if self.items.len() >= self.capacity {
            return Err(InboxRejection::Full {
                capacity: self.capacity,
            });
        }
        let used = self.per_sender.entry(sender).or_default();
        if *used >= self.quota {
            return Err(InboxRejection::QuotaExceeded { quota: self.quota });
        }
        *used += 1;
        self.queued.insert((sender, key));
        self.items.push_back(item);
        Ok(true)
    }

    /// Take everything queued and reset the quotas.
    pub fn drain(&mut self) -> Vec<T> {
        self.per_sender.clear();
        self.queued.clear();
        self.items.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items queued by `sender`.
    pub fn queued_from(&self, sender: &ValidatorId) -> usize {
        self.per_sender.get(sender).copied().unwrap_or(0)
    }
}
