use std::net::SocketAddr;

use murmur::{config::Config, message::PeerKey, tcp::Node};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpSocket, TcpStream},
};
use tracing_subscriber::{fmt, EnvFilter};

#[allow(dead_code)]
pub fn enable_tracing() {
    fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
}

/// Starts a node listening on an ephemeral local port.
pub async fn start_node() -> Node {
    start_node_with(|_| {}).await
}

#[allow(dead_code)]
pub async fn start_node_with(configure: impl FnOnce(&mut Config)) -> Node {
    let mut config = Config::new("127.0.0.1:0".parse().unwrap());
    configure(&mut config);

    Node::new(config).await.unwrap()
}

/// Returns a key nothing is listening on, connecting to it is refused.
#[allow(dead_code)]
pub fn unreachable_key() -> PeerKey {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    PeerKey::new("127.0.0.1", port).unwrap()
}

/// Writes raw bytes to the address over a single connection and closes it.
#[allow(dead_code)]
pub async fn send_raw(addr: SocketAddr, data: &str) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(data.as_bytes()).await.unwrap();
    stream.shutdown().await.unwrap();
}

/// A bare listener standing in for a peer, it records what is sent to it.
#[allow(dead_code)]
pub struct RawPeer {
    pub key: PeerKey,
    listener: TcpListener,
}

#[allow(dead_code)]
impl RawPeer {
    pub async fn new() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        Self {
            key: PeerKey::new("127.0.0.1", port).unwrap(),
            listener,
        }
    }

    /// Accepts the next connection and reads it to the end.
    pub async fn receive(&self) -> String {
        let (mut stream, _) = self.listener.accept().await.unwrap();
        let mut buf = String::new();
        stream.read_to_string(&mut buf).await.unwrap();

        buf
    }
}

/// A listener that never accepts and whose backlog is already full, connecting to it stalls.
#[allow(dead_code)]
pub struct StalledPeer {
    pub key: PeerKey,
    _listener: TcpListener,
    _queued: TcpStream,
}

#[allow(dead_code)]
impl StalledPeer {
    pub async fn new() -> Self {
        let socket = TcpSocket::new_v4().unwrap();
        socket.bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let listener = socket.listen(0).unwrap();
        let addr = listener.local_addr().unwrap();

        // Occupies the only backlog slot.
        let queued = TcpStream::connect(addr).await.unwrap();

        Self {
            key: PeerKey::new("127.0.0.1", addr.port()).unwrap(),
            _listener: listener,
            _queued: queued,
        }
    }
}
