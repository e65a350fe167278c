use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};

use crate::error::ChatError;
use crate::types::ConnectionId;

/// Outbound queue of one admitted connection, drained by its writer task.
pub type Outbox = mpsc::UnboundedSender<Arc<str>>;

/// Registry entry for an admitted connection.
#[derive(Debug)]
pub struct Peer {
    pub nickname: String,
    outbox: Outbox,
}

/// Point-in-time view of one entry, handed to the broadcast engine.
#[derive(Debug, Clone)]
pub struct Recipient {
    pub id: ConnectionId,
    pub nickname: String,
    pub outbox: Outbox,
}

/// The set of admitted connections.
///
/// Every operation takes the lock for the in-memory update only; nothing
/// here awaits I/O while holding it. Callers never see the map itself.
#[derive(Debug)]
pub struct Registry {
    capacity: usize,
    reserved: HashSet<String>,
    peers: Mutex<HashMap<ConnectionId, Peer>>,
}

impl Registry {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            reserved: HashSet::new(),
            peers: Mutex::new(HashMap::new()),
        }
    }

    /// Nicknames no peer may take, such as the hub operator's own.
    pub fn with_reserved<I, S>(capacity: usize, reserved: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            capacity,
            reserved: reserved.into_iter().map(Into::into).collect(),
            peers: Mutex::new(HashMap::new()),
        }
    }

    /// Admit a connection under `nickname`. Uniqueness and capacity are
    /// checked and the entry inserted under one lock acquisition.
    pub async fn admit(
        &self,
        id: ConnectionId,
        nickname: &str,
        outbox: Outbox,
    ) -> Result<(), ChatError> {
        let mut peers = self.peers.lock().await;

        if self.reserved.contains(nickname) || peers.values().any(|p| p.nickname == nickname) {
            return Err(ChatError::NicknameTaken(nickname.to_string()));
        }
        if peers.len() >= self.capacity {
            return Err(ChatError::CapacityExceeded {
                capacity: self.capacity,
            });
        }

        peers.insert(
            id,
            Peer {
                nickname: nickname.to_string(),
                outbox,
            },
        );
        Ok(())
    }

    /// Remove an entry. Removing an absent id is a no-op.
    pub async fn remove(&self, id: ConnectionId) -> Option<Peer> {
        self.peers.lock().await.remove(&id)
    }

    pub async fn contains(&self, nickname: &str) -> bool {
        if self.reserved.contains(nickname) {
            return true;
        }
        self.peers
            .lock()
            .await
            .values()
            .any(|p| p.nickname == nickname)
    }

    pub async fn snapshot(&self) -> Vec<Recipient> {
        self.peers
            .lock()
            .await
            .iter()
            .map(|(&id, peer)| Recipient {
                id,
                nickname: peer.nickname.clone(),
                outbox: peer.outbox.clone(),
            })
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.peers.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.peers.lock().await.is_empty()
    }

    pub async fn is_full(&self) -> bool {
        self.peers.lock().await.len() >= self.capacity
    }

    /// Admitted nicknames, sorted.
    pub async fn nicknames(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .peers
            .lock()
            .await
            .values()
            .map(|p| p.nickname.clone())
            .collect();
        names.sort();
        names
    }
}
