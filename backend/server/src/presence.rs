use std::sync::atomic::{AtomicUsize, Ordering};

/// Count of open sessions, regardless of pairing state.
#[derive(Default)]
pub struct Presence {
    online: AtomicUsize,
}

impl Presence {
    pub fn increment(&self) -> usize {
        self.online.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Clamps at zero so a doubled terminate cannot underflow.
    pub fn decrement(&self) -> usize {
        let previous = self
            .online
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)))
            .unwrap_or_default();

        previous.saturating_sub(1)
    }

    pub fn current(&self) -> usize {
        self.online.load(Ordering::SeqCst)
    }
}
