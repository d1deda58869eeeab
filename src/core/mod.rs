//! Foundational and often-reused types.

pub mod clock;
pub mod message;
pub mod neighbor_table;
