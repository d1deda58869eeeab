//! Core neighbor table implementation.

use std::collections::HashMap;

use time::OffsetDateTime;
use tracing::info;

use crate::core::message::{Message, NeighborStatus, Payload, PeerEntry, PeerKey, Response};

/// The outcome of applying a single entry during a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeEffect {
    /// The key wasn't known and has been added.
    Added,
    /// The key was known and its status has been overwritten.
    Updated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighborMeta {
    pub status: NeighborStatus,
    /// The time the status was last written.
    pub updated_at: OffsetDateTime,
}

impl NeighborMeta {
    fn new(status: NeighborStatus) -> Self {
        Self {
            status,
            updated_at: OffsetDateTime::now_utc(),
        }
    }
}

/// The core neighbor table data structure.
///
/// Entries are never removed, a key's status is only ever overwritten.
#[derive(Debug, Clone, Default)]
pub struct NeighborTable {
    // Maps peer keys to their liveness metadata.
    peer_list: HashMap<PeerKey, NeighborMeta>,
    // Peer keys in insertion order, snapshots are returned in this order.
    order: Vec<PeerKey>,
}

impl NeighborTable {
    /// Creates a new, empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of known neighbors.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Returns the status of a neighbor, if it is known.
    pub fn get(&self, key: &PeerKey) -> Option<NeighborStatus> {
        self.peer_list.get(key).map(|meta| meta.status)
    }

    /// Returns the neighbor's metadata, if it is known.
    pub fn meta(&self, key: &PeerKey) -> Option<&NeighborMeta> {
        self.peer_list.get(key)
    }

    /// Sets or overwrites the status for a key, returning whether the key was added or updated.
    pub fn upsert(&mut self, key: PeerKey, status: NeighborStatus) -> MergeEffect {
        match self.peer_list.get_mut(&key) {
            Some(meta) => {
                *meta = NeighborMeta::new(status);
                MergeEffect::Updated
            }
            None => {
                self.order.push(key.clone());
                self.peer_list.insert(key, NeighborMeta::new(status));
                MergeEffect::Added
            }
        }
    }

    /// Inserts the key with the supplied status unless it is already known, returns `true` if it
    /// was inserted.
    pub fn insert_if_absent(&mut self, key: PeerKey, status: NeighborStatus) -> bool {
        if self.peer_list.contains_key(&key) {
            return false;
        }

        self.upsert(key, status);
        true
    }

    /// Returns a copy of the table in insertion order.
    pub fn snapshot(&self) -> Vec<(PeerKey, NeighborStatus)> {
        self.order
            .iter()
            .filter_map(|key| self.get(key).map(|status| (key.clone(), status)))
            .collect()
    }

    /// Applies each entry unconditionally: absent keys are added with the reported status,
    /// present keys have their status overwritten, even if that downgrades them to offline.
    pub fn merge<I>(&mut self, entries: I) -> Vec<(PeerEntry, MergeEffect)>
    where
        I: IntoIterator<Item = PeerEntry>,
    {
        entries
            .into_iter()
            .map(|entry| {
                let effect = self.upsert(entry.key.clone(), entry.status);
                (entry, effect)
            })
            .collect()
    }

    // MESSAGE PROCESSING

    /// Applies a decoded message to the table. If it is a query, the reply to send back to the
    /// origin is returned.
    pub fn process_message(&mut self, message: Message) -> Option<Response> {
        let origin = message.origin;

        match message.payload {
            Payload::Hello => {
                self.process_status_change(origin, NeighborStatus::Online);
                None
            }
            Payload::GetPeers => Some(self.process_get_peers(origin)),
            Payload::PeerList(entries) => {
                self.process_peer_list(origin, entries);
                None
            }
            Payload::Bye => {
                self.process_status_change(origin, NeighborStatus::Offline);
                None
            }
        }
    }

    fn process_status_change(&mut self, origin: PeerKey, status: NeighborStatus) {
        match self.upsert(origin.clone(), status) {
            MergeEffect::Added => info!(peer = %origin, %status, "adding new peer"),
            MergeEffect::Updated => info!(peer = %origin, %status, "updating peer"),
        }
    }

    fn process_get_peers(&self, origin: PeerKey) -> Response {
        // The requester never gets its own entry back.
        let entries = self
            .snapshot()
            .into_iter()
            .filter(|(key, _)| key != &origin)
            .map(|(key, status)| PeerEntry::new(key, status))
            .collect();

        Response {
            destination: origin,
            payload: Payload::PeerList(entries),
        }
    }

    fn process_peer_list(&mut self, origin: PeerKey, entries: Vec<PeerEntry>) {
        info!(from = %origin, count = entries.len(), "received peer list");

        for (PeerEntry { key, status }, effect) in self.merge(entries) {
            match effect {
                MergeEffect::Added => info!(peer = %key, %status, "adding new peer"),
                MergeEffect::Updated => info!(peer = %key, %status, "updating known peer"),
            }
        }
    }
}
