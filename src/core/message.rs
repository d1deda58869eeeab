//! Protocol message types.
//!
//! Every message is a single line of space-separated ASCII tokens:
//!
//! ```text
//! <originAddress>:<originPort> <clock> <TYPE> [<arg1> <arg2> ...]
//! ```
//!
//! Encoding goes through [`Display`](fmt::Display), decoding through [`FromStr`].

use std::{fmt, str::FromStr};

use crate::error::ProtocolError;

/// The value of a node's logical clock.
pub type ClockValue = u64;

/// The unique identifier of a neighbor, in the form `<address>:<port>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerKey {
    key: String,
    port: u16,
}

impl PeerKey {
    /// Creates a key from its parts.
    pub fn new(address: &str, port: u16) -> Result<Self, ProtocolError> {
        format!("{address}:{port}").parse()
    }

    /// Returns the host part of the key.
    pub fn address(&self) -> &str {
        self.key
            .rsplit_once(':')
            .map(|(address, _)| address)
            .unwrap_or_default()
    }

    /// Returns the port part of the key.
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl FromStr for PeerKey {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ProtocolError::InvalidPeerKey(s.to_owned());

        let (address, port) = s.rsplit_once(':').ok_or_else(invalid)?;
        if address.is_empty() || s.chars().any(char::is_whitespace) {
            return Err(invalid());
        }
        let port = port.parse::<u16>().map_err(|_| invalid())?;

        Ok(Self {
            key: s.to_owned(),
            port,
        })
    }
}

impl fmt::Display for PeerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// The last-known liveness of a neighbor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NeighborStatus {
    Online,
    Offline,
}

impl NeighborStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NeighborStatus::Online => "ONLINE",
            NeighborStatus::Offline => "OFFLINE",
        }
    }
}

impl FromStr for NeighborStatus {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ONLINE" => Ok(NeighborStatus::Online),
            "OFFLINE" => Ok(NeighborStatus::Offline),
            _ => Err(ProtocolError::InvalidStatus(s.to_owned())),
        }
    }
}

impl fmt::Display for NeighborStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The wire name of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Hello,
    GetPeers,
    PeerList,
    Bye,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Hello => "HELLO",
            MessageType::GetPeers => "GET_PEERS",
            MessageType::PeerList => "PEER_LIST",
            MessageType::Bye => "BYE",
        }
    }
}

impl FromStr for MessageType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HELLO" => Ok(MessageType::Hello),
            "GET_PEERS" => Ok(MessageType::GetPeers),
            "PEER_LIST" => Ok(MessageType::PeerList),
            "BYE" => Ok(MessageType::Bye),
            _ => Err(ProtocolError::UnknownType(s.to_owned())),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single neighbor reported in a PEER_LIST message, `<address>:<port>:<status>:<extra>` on
/// the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerEntry {
    pub key: PeerKey,
    pub status: NeighborStatus,
}

impl PeerEntry {
    pub fn new(key: PeerKey, status: NeighborStatus) -> Self {
        Self { key, status }
    }
}

impl FromStr for PeerEntry {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Split from the right: the key itself contains a separator.
        let mut parts = s.rsplitn(3, ':');
        let (_extra, status, key) = match (parts.next(), parts.next(), parts.next()) {
            (Some(extra), Some(status), Some(key)) => (extra, status, key),
            _ => return Err(ProtocolError::InvalidEntry(s.to_owned())),
        };

        Ok(Self {
            key: key.parse()?,
            status: status.parse()?,
        })
    }
}

impl fmt::Display for PeerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The trailing field is reserved and always zero.
        write!(f, "{}:{}:0", self.key, self.status)
    }
}

/// The type-specific content of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Announces the sender as online.
    Hello,
    /// Asks the recipient for its neighbor list, answered with PEER_LIST.
    GetPeers,
    /// The recipient's neighbors, minus the requester.
    PeerList(Vec<PeerEntry>),
    /// Announces the sender is leaving.
    Bye,
}

impl Payload {
    pub fn message_type(&self) -> MessageType {
        match self {
            Payload::Hello => MessageType::Hello,
            Payload::GetPeers => MessageType::GetPeers,
            Payload::PeerList(_) => MessageType::PeerList,
            Payload::Bye => MessageType::Bye,
        }
    }
}

/// A reply produced while processing a message, sent once the neighbor table is released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub destination: PeerKey,
    pub payload: Payload,
}

/// A protocol message, built for a single send and discarded afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub origin: PeerKey,
    pub clock: ClockValue,
    pub payload: Payload,
}

impl Message {
    pub fn new(origin: PeerKey, clock: ClockValue, payload: Payload) -> Self {
        Self {
            origin,
            clock,
            payload,
        }
    }

    pub fn message_type(&self) -> MessageType {
        self.payload.message_type()
    }
}

impl FromStr for Message {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = s.split_whitespace().collect();

        if tokens.is_empty() {
            return Err(ProtocolError::Empty);
        }

        if tokens.len() < 3 {
            return Err(ProtocolError::TooFewTokens(tokens.len()));
        }

        let origin = tokens[0].parse()?;
        let clock = tokens[1]
            .parse::<ClockValue>()
            .map_err(|_| ProtocolError::InvalidClock(tokens[1].to_owned()))?;

        let payload = match tokens[2].parse::<MessageType>()? {
            MessageType::Hello => Payload::Hello,
            MessageType::GetPeers => Payload::GetPeers,
            MessageType::Bye => Payload::Bye,
            MessageType::PeerList => {
                let count = tokens
                    .get(3)
                    .ok_or_else(|| ProtocolError::InvalidCount(String::new()))?;
                let declared: usize = count
                    .parse()
                    .map_err(|_| ProtocolError::InvalidCount((*count).to_owned()))?;

                let entries = &tokens[4..];
                if entries.len() != declared {
                    return Err(ProtocolError::CountMismatch {
                        declared,
                        supplied: entries.len(),
                    });
                }

                Payload::PeerList(
                    entries
                        .iter()
                        .map(|entry| entry.parse())
                        .collect::<Result<_, _>>()?,
                )
            }
        };

        Ok(Self {
            origin,
            clock,
            payload,
        })
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.origin, self.clock, self.message_type())?;

        if let Payload::PeerList(entries) = &self.payload {
            write!(f, " {}", entries.len())?;
            for entry in entries {
                write!(f, " {entry}")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> PeerKey {
        s.parse().unwrap()
    }

    #[test]
    fn peer_key() {
        let k = key("127.0.0.1:6000");
        assert_eq!(k.address(), "127.0.0.1");
        assert_eq!(k.port(), 6000);
        assert_eq!(k.to_string(), "127.0.0.1:6000");
        assert_eq!(PeerKey::new("localhost", 1).unwrap(), key("localhost:1"));
    }

    #[test]
    fn peer_key_invalid() {
        for s in ["", "127.0.0.1", ":6000", "127.0.0.1:", "127.0.0.1:70000", "a b:1"] {
            assert_eq!(
                s.parse::<PeerKey>(),
                Err(ProtocolError::InvalidPeerKey(s.to_owned()))
            );
        }
    }

    #[test]
    fn encode_simple() {
        let origin = key("127.0.0.1:6000");
        assert_eq!(
            Message::new(origin.clone(), 1, Payload::Hello).to_string(),
            "127.0.0.1:6000 1 HELLO"
        );
        assert_eq!(
            Message::new(origin.clone(), 2, Payload::GetPeers).to_string(),
            "127.0.0.1:6000 2 GET_PEERS"
        );
        assert_eq!(
            Message::new(origin, 3, Payload::Bye).to_string(),
            "127.0.0.1:6000 3 BYE"
        );
    }

    #[test]
    fn encode_peer_list() {
        let message = Message::new(
            key("127.0.0.1:6001"),
            7,
            Payload::PeerList(vec![
                PeerEntry::new(key("127.0.0.1:6002"), NeighborStatus::Online),
                PeerEntry::new(key("127.0.0.1:6003"), NeighborStatus::Offline),
            ]),
        );

        assert_eq!(
            message.to_string(),
            "127.0.0.1:6001 7 PEER_LIST 2 127.0.0.1:6002:ONLINE:0 127.0.0.1:6003:OFFLINE:0"
        );
    }

    #[test]
    fn encode_empty_peer_list() {
        let message = Message::new(key("127.0.0.1:6001"), 1, Payload::PeerList(vec![]));
        assert_eq!(message.to_string(), "127.0.0.1:6001 1 PEER_LIST 0");
        assert_eq!(message.to_string().parse::<Message>().unwrap(), message);
    }

    #[test]
    fn decode_peer_list() {
        let message: Message = "127.0.0.1:6001 4 PEER_LIST 1 127.0.0.1:6002:ONLINE:0"
            .parse()
            .unwrap();

        assert_eq!(message.origin, key("127.0.0.1:6001"));
        assert_eq!(message.clock, 4);
        assert_eq!(
            message.payload,
            Payload::PeerList(vec![PeerEntry::new(
                key("127.0.0.1:6002"),
                NeighborStatus::Online
            )])
        );
    }

    #[test]
    fn decode_ignores_surrounding_whitespace_and_trailing_args() {
        let message: Message = "  127.0.0.1:6000   9 HELLO extra\n".parse().unwrap();
        assert_eq!(message, Message::new(key("127.0.0.1:6000"), 9, Payload::Hello));
    }

    #[test]
    fn decode_too_few_tokens() {
        assert_eq!("".parse::<Message>(), Err(ProtocolError::Empty));
        assert_eq!(
            "127.0.0.1:6000 1".parse::<Message>(),
            Err(ProtocolError::TooFewTokens(2))
        );
        assert_eq!(
            "127.0.0.1:6000 1 PEER_LIST".parse::<Message>(),
            Err(ProtocolError::InvalidCount(String::new()))
        );
    }

    #[test]
    fn decode_unknown_type() {
        assert_eq!(
            "127.0.0.1:6000 1 SEARCH".parse::<Message>(),
            Err(ProtocolError::UnknownType("SEARCH".to_owned()))
        );
    }

    #[test]
    fn decode_invalid_clock() {
        assert_eq!(
            "127.0.0.1:6000 -1 HELLO".parse::<Message>(),
            Err(ProtocolError::InvalidClock("-1".to_owned()))
        );
    }

    #[test]
    fn decode_count_mismatch() {
        assert_eq!(
            "127.0.0.1:6001 1 PEER_LIST 2 127.0.0.1:6002:ONLINE:0".parse::<Message>(),
            Err(ProtocolError::CountMismatch {
                declared: 2,
                supplied: 1
            })
        );
        assert_eq!(
            "127.0.0.1:6001 1 PEER_LIST 0 127.0.0.1:6002:ONLINE:0".parse::<Message>(),
            Err(ProtocolError::CountMismatch {
                declared: 0,
                supplied: 1
            })
        );
        assert_eq!(
            "127.0.0.1:6001 1 PEER_LIST x".parse::<Message>(),
            Err(ProtocolError::InvalidCount("x".to_owned()))
        );
    }

    #[test]
    fn decode_bad_entries() {
        assert_eq!(
            "127.0.0.1:6001 1 PEER_LIST 1 garbage".parse::<Message>(),
            Err(ProtocolError::InvalidEntry("garbage".to_owned()))
        );
        assert_eq!(
            "127.0.0.1:6001 1 PEER_LIST 1 127.0.0.1:6002:AWAY:0".parse::<Message>(),
            Err(ProtocolError::InvalidStatus("AWAY".to_owned()))
        );
        assert_eq!(
            "127.0.0.1:6001 1 PEER_LIST 1 host:ONLINE:0".parse::<Message>(),
            Err(ProtocolError::InvalidPeerKey("host".to_owned()))
        );
    }

    #[test]
    fn message_type() {
        assert_eq!(Payload::Hello.message_type().as_str(), "HELLO");
        assert_eq!(Payload::GetPeers.message_type().as_str(), "GET_PEERS");
        assert_eq!(Payload::PeerList(vec![]).message_type().as_str(), "PEER_LIST");
        assert_eq!(Payload::Bye.message_type().as_str(), "BYE");
    }
}
