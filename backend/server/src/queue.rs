use std::collections::{HashMap, VecDeque, hash_map::Entry};

use protocol::id::ConnId;

use crate::signature::Signature;

/// One FIFO wait-list per signature. Empty lists are dropped.
#[derive(Default)]
pub struct MatchQueues {
    queues: HashMap<Signature, VecDeque<ConnId>>,
}

impl MatchQueues {
    pub fn enqueue(&mut self, signature: &Signature, id: ConnId) {
        self.queues
            .entry(signature.clone())
            .or_default()
            .push_back(id);
    }

    pub fn dequeue_next(&mut self, signature: &Signature) -> Option<ConnId> {
        let Entry::Occupied(mut entry) = self.queues.entry(signature.clone()) else {
            return None;
        };

        let id = entry.get_mut().pop_front();
        if entry.get().is_empty() {
            entry.remove();
        }

        id
    }

    pub fn remove(&mut self, signature: &Signature, id: ConnId) {
        let Entry::Occupied(mut entry) = self.queues.entry(signature.clone()) else {
            return;
        };

        entry.get_mut().retain(|queued| *queued != id);
        if entry.get().is_empty() {
            entry.remove();
        }
    }

    pub fn contains(&self, signature: &Signature, id: ConnId) -> bool {
        self.queues
            .get(signature)
            .is_some_and(|queue| queue.contains(&id))
    }

    #[cfg(test)]
    pub fn waiting(&self, signature: &Signature) -> Vec<ConnId> {
        self.queues
            .get(signature)
            .map(|queue| queue.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of non-empty queues.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.queues.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}
