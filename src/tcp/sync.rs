use std::sync::Arc;

use parking_lot::RwLock;

use crate::core::{
    message::{Message, NeighborStatus, PeerEntry, PeerKey, Response},
    neighbor_table::{MergeEffect, NeighborMeta, NeighborTable},
};

#[cfg_attr(doc_cfg, doc(cfg(feature = "sync")))]
#[derive(Debug, Default, Clone)]
/// A neighbor table implementation suitable for use in async contexts.
///
/// It wraps [`NeighborTable`] behind a single lock. Every operation holds the lock only for the
/// duration of the map access and returns owned data, no guard or live view ever escapes, so
/// callers can't hold the lock across network I/O.
pub struct SyncNeighborTable {
    table: Arc<RwLock<NeighborTable>>,
}

impl SyncNeighborTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.read().is_empty()
    }

    pub fn get(&self, key: &PeerKey) -> Option<NeighborStatus> {
        self.table.read().get(key)
    }

    pub fn meta(&self, key: &PeerKey) -> Option<NeighborMeta> {
        self.table.read().meta(key).copied()
    }

    pub fn upsert(&self, key: PeerKey, status: NeighborStatus) -> MergeEffect {
        self.table.write().upsert(key, status)
    }

    pub fn insert_if_absent(&self, key: PeerKey, status: NeighborStatus) -> bool {
        self.table.write().insert_if_absent(key, status)
    }

    /// Returns a point-in-time copy of the table in insertion order.
    pub fn snapshot(&self) -> Vec<(PeerKey, NeighborStatus)> {
        self.table.read().snapshot()
    }

    /// Returns a point-in-time copy of the table with metadata, in insertion order.
    pub fn snapshot_with_meta(&self) -> Vec<(PeerKey, NeighborMeta)> {
        let table_g = self.table.read();

        table_g
            .snapshot()
            .into_iter()
            .filter_map(|(key, _)| table_g.meta(&key).copied().map(|meta| (key, meta)))
            .collect()
    }

    /// Applies a decoded message under the lock, returning the reply to send once it is released.
    pub fn process_message(&self, message: Message) -> Option<Response> {
        self.table.write().process_message(message)
    }

    /// Merges the entries atomically with respect to the other operations.
    pub fn merge<I>(&self, entries: I) -> Vec<(PeerEntry, MergeEffect)>
    where
        I: IntoIterator<Item = PeerEntry>,
    {
        self.table.write().merge(entries)
    }
}
