//! # Fallback
//!
//! Every search that does not match right away arms a delayed check. The
//! check carries the connection id, the signature and the search number it
//! was armed for, and acts only if all three still describe the connection
//! when it fires:
//!
//! - still `Searching` under the same signature and search number
//! - still present in that queue
//!
//! Anything else (matched, cancelled, searched again, disconnected) makes the
//! fire a no-op. Nothing ever cancels the timer itself.
use std::{sync::Arc, time::Duration};

use protocol::{events::ServerEvent, id::ConnId};
use tokio::time::sleep;
use tracing::debug;

use crate::{pairing::Matchmaker, registry::Pairing, signature::Signature};

pub const DEFAULT_DELAY_MS: u64 = 3000;
pub const DEFAULT_MESSAGE: &str = "Ingen online med dine filtre lige nu. Viser demo.";

#[derive(Debug, Clone)]
pub struct FallbackConfig {
    pub delay: Duration,
    pub message: String,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
            message: DEFAULT_MESSAGE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSearch {
    pub id: ConnId,
    pub signature: Signature,
    pub search: u64,
}

pub fn arm(matchmaker: Arc<Matchmaker>, pending: PendingSearch) {
    tokio::spawn(async move {
        sleep(matchmaker.fallback.delay).await;
        matchmaker.expire(&pending).await;
    });
}

impl Matchmaker {
    /// Ends `pending` with a `partner-dummy` if it is still the live search. Returns whether it did.
    pub async fn expire(&self, pending: &PendingSearch) -> bool {
        let mut inner = self.inner.lock().await;
        let inner = &mut *inner;

        let Some(connection) = inner.registry.get_mut(pending.id) else {
            return false;
        };

        let current = matches!(
            &connection.pairing,
            Pairing::Searching { signature, search }
                if *signature == pending.signature && *search == pending.search
        );
        if !current || !inner.queues.contains(&pending.signature, pending.id) {
            debug!("Stale fallback for {} ignored", pending.id);
            return false;
        }

        inner.queues.remove(&pending.signature, pending.id);
        connection.pairing = Pairing::Idle;
        connection.notify(ServerEvent::PartnerDummy {
            message: self.fallback.message.clone(),
        });

        debug!("No match for {} under {}", pending.id, pending.signature);
        true
    }
}
