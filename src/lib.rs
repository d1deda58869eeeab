//! A peer node for a flat, unstructured peer-to-peer overlay.
//!
//! Each node keeps a table of known neighbors and their last-known liveness, and keeps it loosely
//! synchronized with the rest of the overlay through a small text-based gossip protocol:
//!
//! - `HELLO` announces the sender as online.
//! - `GET_PEERS` asks for the recipient's neighbor list, answered with `PEER_LIST`.
//! - `PEER_LIST` carries a neighbor list, merged into the recipient's table unconditionally.
//! - `BYE` announces the sender is leaving.
//!
//! Liveness is inferred from the outcome of communication: a successful delivery marks the
//! destination online, a failed one marks it offline. There are no heartbeats and no retries.
//!
//! Each message is stamped with the sender's logical clock. The clock is a local event counter,
//! incremented once per message sent and once per message received, it is never merged with the
//! value carried by a remote message.

#![cfg_attr(doc_cfg, feature(doc_cfg))]

#[cfg(feature = "codec")]
#[cfg_attr(doc_cfg, doc(cfg(feature = "codec")))]
pub mod codec;
pub mod config;
pub mod error;
#[cfg(feature = "sync")]
#[cfg_attr(doc_cfg, doc(cfg(feature = "sync")))]
pub mod tcp;

mod core;

pub use crate::core::{
    clock::Clock,
    message,
    neighbor_table::{MergeEffect, NeighborMeta, NeighborTable},
};
