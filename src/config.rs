//! Node configuration and startup checks.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use tracing::info;

use crate::{
    core::message::PeerKey,
    error::{ConfigError, ProtocolError, Result},
};

/// The default bound on connecting, sending and receiving a message.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// The default upper bound on the size of a single message, in bytes.
pub const MAX_MESSAGE_LEN: usize = 64 * 1024;

/// The runtime parameters of a node.
#[derive(Debug, Clone)]
pub struct Config {
    /// The endpoint this node listens on and advertises as its own identity. A port of `0`
    /// binds an ephemeral port, the identity then uses the port actually bound.
    pub local_key: PeerKey,
    /// Bounds connection establishment and message transfer, in both directions.
    pub timeout: Duration,
    /// The largest message accepted or sent, in bytes.
    pub max_message_len: usize,
    /// The maximum number of inbound connections handled concurrently, unbounded if `None`.
    pub max_connections: Option<usize>,
}

impl Config {
    pub fn new(local_key: PeerKey) -> Self {
        Self {
            local_key,
            timeout: DEFAULT_TIMEOUT,
            max_message_len: MAX_MESSAGE_LEN,
            max_connections: None,
        }
    }
}

/// Reads the neighbor seed file: one `<address>:<port>` per line, blank lines are skipped.
pub fn load_seed_file(path: impl AsRef<Path>) -> Result<Vec<PeerKey>> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::SeedFile {
        path: path.to_owned(),
        source,
    })?;

    let mut keys = Vec::new();
    for (i, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let key = line
            .parse::<PeerKey>()
            .map_err(|source: ProtocolError| ConfigError::SeedEntry {
                path: path.to_owned(),
                line: i + 1,
                source,
            })?;
        keys.push(key);
    }

    info!(path = %path.display(), count = keys.len(), "loaded neighbor seed file");

    Ok(keys)
}

/// Checks the shared directory exists and can be listed.
pub fn validate_shared_dir(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let invalid = || ConfigError::SharedDirectory {
        path: path.to_owned(),
    };

    if !path.is_dir() {
        return Err(invalid().into());
    }
    fs::read_dir(path).map_err(|_| invalid())?;

    Ok(path.to_owned())
}
