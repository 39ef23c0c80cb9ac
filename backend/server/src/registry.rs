use std::collections::HashMap;

use protocol::{events::ServerEvent, id::ConnId};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::signature::Signature;

/// Where a connection is in the pairing lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pairing {
    Idle,
    /// `search` numbers the request so a fallback armed by an older search can tell it is stale.
    Searching { signature: Signature, search: u64 },
    Paired { partner: ConnId },
}

/// Per-connection record. Lives apart from the socket, which only sees the outbound channel.
pub struct Connection {
    tx: UnboundedSender<ServerEvent>,
    pub pairing: Pairing,
    pub searches: u64,
}

impl Connection {
    pub fn partner(&self) -> Option<ConnId> {
        match self.pairing {
            Pairing::Paired { partner } => Some(partner),
            _ => None,
        }
    }

    /// A closed receiver means the session is going away, disconnect will clean up.
    pub fn notify(&self, event: ServerEvent) {
        if let Err(e) = self.tx.send(event) {
            debug!("Dropping {} for closed session", e.0.name());
        }
    }
}

#[derive(Default)]
pub struct Registry {
    connections: HashMap<ConnId, Connection>,
}

impl Registry {
    pub fn insert(&mut self, id: ConnId, tx: UnboundedSender<ServerEvent>) {
        self.connections.insert(
            id,
            Connection {
                tx,
                pairing: Pairing::Idle,
                searches: 0,
            },
        );
    }

    pub fn remove(&mut self, id: ConnId) -> Option<Connection> {
        self.connections.remove(&id)
    }

    pub fn get(&self, id: ConnId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    pub fn get_mut(&mut self, id: ConnId) -> Option<&mut Connection> {
        self.connections.get_mut(&id)
    }

    /// Sends to `id` if it is still live. Returns whether it resolved.
    pub fn notify(&self, id: ConnId, event: ServerEvent) -> bool {
        match self.connections.get(&id) {
            Some(connection) => {
                connection.notify(event);
                true
            }
            None => false,
        }
    }
}
