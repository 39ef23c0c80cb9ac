//! # Pairing
//!
//! Lifecycle of every connection and the matchmaking that links them.
//!
//! ## States
//! - `Idle`: connected, not looking
//! - `Searching`: waiting in exactly one queue, the one for its signature
//! - `Paired`: linked to a partner that is linked back
//!
//! ## Transitions
//! - any -> `Searching` on `find-partner`, a current partner gets `partner-left`
//! - `Searching` -> `Paired` when the queue yields a peer, both get `partner-found`
//! - `Searching` -> `Idle` when the fallback fires, `partner-dummy`
//! - `Paired` -> `Idle` when the partner leaves or disconnects
//!
//! ## Locking
//!
//! Registry and queues sit behind one mutex. Every transition, including the
//! notifications it sends, happens while holding it, so two searches cannot
//! take the same waiting peer and a disconnect cannot slip between the two
//! halves of a pairing. Notifications go through unbounded channels and never
//! wait on a socket under the lock.
use std::sync::Arc;

use protocol::{
    events::{Filters, ServerEvent},
    id::ConnId,
};
use tokio::sync::{Mutex, mpsc::UnboundedSender};
use tracing::{debug, info, warn};

use crate::{
    fallback::{self, FallbackConfig, PendingSearch},
    presence::Presence,
    queue::MatchQueues,
    registry::{Pairing, Registry},
    signature::{Signature, normalize},
};

#[derive(Default)]
pub(crate) struct Inner {
    pub(crate) registry: Registry,
    pub(crate) queues: MatchQueues,
}

pub struct Matchmaker {
    pub(crate) inner: Mutex<Inner>,
    pub(crate) fallback: FallbackConfig,
    presence: Presence,
}

impl Matchmaker {
    pub fn new(fallback: FallbackConfig) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner::default()),
            fallback,
            presence: Presence::default(),
        })
    }

    pub fn presence(&self) -> &Presence {
        &self.presence
    }

    /// Registers a new session and greets it with its id.
    pub async fn connect(&self, tx: UnboundedSender<ServerEvent>) -> ConnId {
        let id = ConnId::new();

        let mut inner = self.inner.lock().await;
        inner.registry.insert(id, tx);
        let online = self.presence.increment();
        inner.registry.notify(id, ServerEvent::Connected { id });
        drop(inner);

        info!("Session {id} connected, online: {online}");

        id
    }

    pub async fn disconnect(&self, id: ConnId) {
        let mut inner = self.inner.lock().await;

        let Some(connection) = inner.registry.remove(id) else {
            warn!("Session {id} disconnected twice");
            return;
        };
        release(&mut inner, id, connection.pairing, ServerEvent::PartnerDisconnected);
        drop(inner);

        let online = self.presence.decrement();
        info!("Session {id} disconnected, online: {online}");
    }

    /// Starts a search, replacing whatever the connection was doing before.
    pub async fn find_partner(self: &Arc<Self>, id: ConnId, filters: &Filters) {
        let signature = normalize(filters);

        let mut inner = self.inner.lock().await;

        let Some(connection) = inner.registry.get_mut(id) else {
            return;
        };
        connection.searches += 1;
        let search = connection.searches;
        let previous = std::mem::replace(&mut connection.pairing, Pairing::Idle);
        release(&mut inner, id, previous, ServerEvent::PartnerLeft);

        if let Some(peer) = take_peer(&mut inner, id, &signature) {
            link(&mut inner, id, peer);
            debug!("Paired {id} with {peer} under {signature}");
            return;
        }

        inner.queues.enqueue(&signature, id);
        if let Some(connection) = inner.registry.get_mut(id) {
            connection.pairing = Pairing::Searching {
                signature: signature.clone(),
                search,
            };
        }
        drop(inner);

        debug!("Session {id} waiting under {signature}");
        fallback::arm(
            self.clone(),
            PendingSearch {
                id,
                signature,
                search,
            },
        );
    }

    /// Stops searching or leaves the current partner. The partner is told `partner-left`.
    pub async fn leave(&self, id: ConnId) {
        let mut inner = self.inner.lock().await;

        let Some(connection) = inner.registry.get_mut(id) else {
            return;
        };
        let previous = std::mem::replace(&mut connection.pairing, Pairing::Idle);
        release(&mut inner, id, previous, ServerEvent::PartnerLeft);

        debug!("Session {id} left");
    }

    #[cfg(test)]
    pub async fn pairing(&self, id: ConnId) -> Option<Pairing> {
        let inner = self.inner.lock().await;
        inner.registry.get(id).map(|c| c.pairing.clone())
    }

    #[cfg(test)]
    pub async fn waiting(&self, signature: &Signature) -> Vec<ConnId> {
        let inner = self.inner.lock().await;
        inner.queues.waiting(signature)
    }
}

/// Undoes `previous` for `id`: leaves its queue or unlinks its partner.
fn release(inner: &mut Inner, id: ConnId, previous: Pairing, notice: ServerEvent) {
    match previous {
        Pairing::Idle => {}
        Pairing::Searching { signature, .. } => inner.queues.remove(&signature, id),
        Pairing::Paired { partner } => {
            let Some(other) = inner.registry.get_mut(partner) else {
                return;
            };
            if other.partner() == Some(id) {
                other.pairing = Pairing::Idle;
                other.notify(notice);
                debug!("Unlinked {partner} from {id}");
            }
        }
    }
}

/// Pops waiting peers until one is live, searching under `signature` and not `id` itself.
fn take_peer(inner: &mut Inner, id: ConnId, signature: &Signature) -> Option<ConnId> {
    while let Some(peer) = inner.queues.dequeue_next(signature) {
        if peer == id {
            warn!("Discarding self entry for {id} under {signature}");
            continue;
        }

        let searching = inner.registry.get(peer).is_some_and(|c| {
            matches!(&c.pairing, Pairing::Searching { signature: s, .. } if s == signature)
        });
        if searching {
            return Some(peer);
        }

        warn!("Discarding stale entry {peer} under {signature}");
    }

    None
}

fn link(inner: &mut Inner, id: ConnId, peer: ConnId) {
    for (this, other) in [(id, peer), (peer, id)] {
        if let Some(connection) = inner.registry.get_mut(this) {
            connection.pairing = Pairing::Paired { partner: other };
        }
    }

    inner.registry.notify(id, ServerEvent::PartnerFound { id: peer });
    inner.registry.notify(peer, ServerEvent::PartnerFound { id });
}
