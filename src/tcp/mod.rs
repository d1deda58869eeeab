//! The TCP transport: a lock-guarded neighbor table and the node driving it.
//!
//! Every message is carried by its own connection. The sender writes the encoded line, closes its
//! write half and the receiver decodes exactly one message once it reaches the end of the stream.

mod node;
mod sync;

pub use node::{Node, SendOutcome};
pub use sync::SyncNeighborTable;
