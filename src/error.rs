//! Error types.

use std::{io, path::PathBuf};

use thiserror::Error;

/// A malformed or unacceptable message received from a peer.
///
/// Protocol errors never escape the connection they were read from: the message is logged and
/// discarded without touching the neighbor table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("empty message")]
    Empty,
    #[error("expected at least 3 tokens, got {0}")]
    TooFewTokens(usize),
    #[error("invalid clock value `{0}`")]
    InvalidClock(String),
    #[error("unknown message type `{0}`")]
    UnknownType(String),
    #[error("invalid peer count `{0}`")]
    InvalidCount(String),
    #[error("peer list declares {declared} entries but supplies {supplied}")]
    CountMismatch { declared: usize, supplied: usize },
    #[error("invalid peer list entry `{0}`")]
    InvalidEntry(String),
    #[error("invalid neighbor status `{0}`")]
    InvalidStatus(String),
    #[error("invalid peer key `{0}`, expected <address>:<port>")]
    InvalidPeerKey(String),
    #[error("message of {len} bytes exceeds the {max} byte limit")]
    MessageTooLarge { len: usize, max: usize },
    #[error("message is not valid UTF-8")]
    NotUtf8,
}

/// A fatal startup error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("couldn't read neighbor file {}: {source}", path.display())]
    SeedFile { path: PathBuf, source: io::Error },
    #[error("invalid entry on line {line} of neighbor file {}: {source}", path.display())]
    SeedEntry {
        path: PathBuf,
        line: usize,
        source: ProtocolError,
    },
    #[error("shared directory {} doesn't exist or can't be read", path.display())]
    SharedDirectory { path: PathBuf },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;
