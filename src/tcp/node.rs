use std::{io, net::SocketAddr, sync::Arc};

use bytes::BytesMut;
use parking_lot::Mutex;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::Semaphore,
    task::JoinHandle,
    time::timeout,
};
use tokio_util::codec::{Decoder, Encoder};
use tracing::*;

use crate::{
    codec::MessageCodec,
    config::Config,
    core::{
        clock::Clock,
        message::{self, Message, MessageType, NeighborStatus, Payload, PeerKey, Response},
    },
    error::Error,
    tcp::SyncNeighborTable,
};

/// The result of a single delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The message was written and the connection closed cleanly.
    Delivered,
    /// The connection couldn't be established or the write failed, the destination has been
    /// marked offline.
    Failed,
}

impl SendOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, SendOutcome::Delivered)
    }
}

/// A peer node: a listener dispatching inbound messages and a sender for outbound ones, sharing
/// a neighbor table and a logical clock.
///
/// Every message travels over its own short-lived TCP connection. Clones share the same state.
#[derive(Debug, Clone)]
pub struct Node {
    config: Arc<Config>,
    listening_addr: SocketAddr,
    neighbors: SyncNeighborTable,
    clock: Clock,
    accept_task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Node {
    /// Binds the listener to the configured identity and starts accepting connections.
    pub async fn new(mut config: Config) -> io::Result<Self> {
        let listener =
            TcpListener::bind((config.local_key.address(), config.local_key.port())).await?;
        let listening_addr = listener.local_addr()?;

        // Advertise the port actually bound if an ephemeral one was requested.
        if config.local_key.port() == 0 {
            config.local_key = PeerKey::new(config.local_key.address(), listening_addr.port())
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        }

        let node = Self {
            config: Arc::new(config),
            listening_addr,
            neighbors: SyncNeighborTable::new(),
            clock: Clock::new(),
            accept_task: Default::default(),
        };

        let task = tokio::spawn(node.clone().accept_loop(listener));
        *node.accept_task.lock() = Some(task);

        info!(local = %node.local_key(), addr = %listening_addr, "listening for peers");

        Ok(node)
    }

    /// Returns this node's identity.
    pub fn local_key(&self) -> &PeerKey {
        &self.config.local_key
    }

    pub fn listening_addr(&self) -> SocketAddr {
        self.listening_addr
    }

    /// Returns the current value of the logical clock.
    pub fn clock(&self) -> message::ClockValue {
        self.clock.value()
    }

    pub fn neighbors(&self) -> &SyncNeighborTable {
        &self.neighbors
    }

    /// Returns a point-in-time copy of the neighbor table.
    pub fn snapshot(&self) -> Vec<(PeerKey, NeighborStatus)> {
        self.neighbors.snapshot()
    }

    /// Adds a seed neighbor as offline, an already known neighbor keeps its status.
    pub fn add_peer_from_seed(&self, key: PeerKey) -> bool {
        let inserted = self
            .neighbors
            .insert_if_absent(key.clone(), NeighborStatus::Offline);

        if inserted {
            info!(peer = %key, status = %NeighborStatus::Offline, "adding new peer");
        }

        inserted
    }

    /// Stops accepting connections. Connections already accepted run to completion.
    pub fn shut_down(&self) {
        if let Some(task) = self.accept_task.lock().take() {
            task.abort();
        }
    }

    // SENDING

    /// Sends a single message to the destination and updates its status from the outcome.
    ///
    /// Failures never propagate: they mark the destination offline and are reported through the
    /// returned [`SendOutcome`] only. A delivered BYE leaves the destination's status untouched.
    pub async fn send_to(&self, destination: &PeerKey, payload: Payload) -> SendOutcome {
        let clock = self.clock.tick();
        let message_type = payload.message_type();
        let message = Message::new(self.local_key().clone(), clock, payload);

        debug!(%clock, "forwarding \"{message}\" to {destination}");

        let result = match timeout(self.config.timeout, self.write_message(destination, message))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(Error::Io(io::ErrorKind::TimedOut.into())),
        };

        match result {
            Ok(()) => {
                if message_type != MessageType::Bye {
                    self.neighbors
                        .upsert(destination.clone(), NeighborStatus::Online);
                    info!(peer = %destination, status = %NeighborStatus::Online, "updating peer");
                }

                SendOutcome::Delivered
            }
            Err(e) => {
                warn!(peer = %destination, %message_type, "couldn't deliver message: {e}");
                self.neighbors
                    .upsert(destination.clone(), NeighborStatus::Offline);
                info!(peer = %destination, status = %NeighborStatus::Offline, "updating peer");

                SendOutcome::Failed
            }
        }
    }

    /// Sends the payload to every known neighbor, one after the other.
    pub async fn broadcast_to_all(&self, payload: Payload) -> Vec<(PeerKey, SendOutcome)> {
        let destinations = self.snapshot().into_iter().map(|(key, _)| key).collect();
        self.send_to_each(destinations, payload).await
    }

    /// Sends the payload to every neighbor currently holding the supplied status.
    pub async fn broadcast_to_status(
        &self,
        status: NeighborStatus,
        payload: Payload,
    ) -> Vec<(PeerKey, SendOutcome)> {
        let destinations = self
            .snapshot()
            .into_iter()
            .filter(|(_, s)| *s == status)
            .map(|(key, _)| key)
            .collect();

        self.send_to_each(destinations, payload).await
    }

    async fn send_to_each(
        &self,
        destinations: Vec<PeerKey>,
        payload: Payload,
    ) -> Vec<(PeerKey, SendOutcome)> {
        let mut outcomes = Vec::with_capacity(destinations.len());
        for destination in destinations {
            let outcome = self.send_to(&destination, payload.clone()).await;
            outcomes.push((destination, outcome));
        }

        outcomes
    }

    async fn write_message(&self, destination: &PeerKey, message: Message) -> Result<(), Error> {
        let mut codec = MessageCodec::with_max_len(self.config.max_message_len);
        let mut buf = BytesMut::new();
        codec.encode(message, &mut buf)?;

        let mut stream = TcpStream::connect((destination.address(), destination.port())).await?;
        stream.write_all(&buf).await?;
        // Closing the write half marks the end of the message.
        stream.shutdown().await?;

        Ok(())
    }

    // RECEIVING

    async fn accept_loop(self, listener: TcpListener) {
        let permits = self
            .config
            .max_connections
            .map(|max| Arc::new(Semaphore::new(max)));

        loop {
            let (stream, addr) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("couldn't accept a connection: {e}");
                    continue;
                }
            };

            let permit = match &permits {
                Some(semaphore) => match semaphore.clone().try_acquire_owned() {
                    Ok(permit) => Some(permit),
                    Err(_) => {
                        warn!(%addr, "connection limit reached, dropping the connection");
                        continue;
                    }
                },
                None => None,
            };

            let node = self.clone();
            tokio::spawn(async move {
                node.handle_connection(stream, addr).await;
                drop(permit);
            });
        }
    }

    /// Reads one message from the connection, applies it and sends the reply if there is one.
    async fn handle_connection(&self, mut stream: TcpStream, addr: SocketAddr) {
        let message = match timeout(self.config.timeout, self.read_message(&mut stream)).await {
            Ok(Ok(Some(message))) => message,
            Ok(Ok(None)) => {
                debug!(%addr, "connection closed without a message");
                return;
            }
            Ok(Err(e)) => {
                warn!(%addr, "dropping message: {e}");
                return;
            }
            Err(_) => {
                warn!(%addr, "timed out waiting for a message");
                return;
            }
        };

        let clock = self.clock.tick();
        debug!(%clock, "received \"{message}\"");

        // The table's lock is released before the reply goes out.
        let response = self.neighbors.process_message(message);

        if let Some(Response {
            destination,
            payload,
        }) = response
        {
            self.send_to(&destination, payload).await;
        }
    }

    async fn read_message(&self, stream: &mut TcpStream) -> Result<Option<Message>, Error> {
        let mut codec = MessageCodec::with_max_len(self.config.max_message_len);
        let mut buf = BytesMut::with_capacity(1024);

        loop {
            if stream.read_buf(&mut buf).await? == 0 {
                return codec.decode_eof(&mut buf);
            }

            // Only fails once the message outgrows the limit.
            codec.decode(&mut buf)?;
        }
    }
}
