//! Client connection tracking with a singleton policy.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Hold at most one client connection at a time
//! - Close an evicted or finished connection exactly once
//! - Count the bytes read from the held connection
//!
//! # Design Decisions
//! - The held connection is owned by value; closing it means dropping it,
//!   so a descriptor cannot be closed twice or outlive its removal
//! - Eviction closes the old connection before the new one is stored

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use tokio::net::TcpStream;

use crate::observability::metrics;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique connection identifier, shown as `conn-N` in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Take the next id. Ids are never reused within a process.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// An accepted client socket plus the bytes read from it so far.
#[derive(Debug)]
pub struct ClientConnection {
    id: ConnectionId,
    stream: TcpStream,
    peer_addr: SocketAddr,
    bytes_read: u64,
}

impl ClientConnection {
    pub fn new(stream: TcpStream, peer_addr: SocketAddr) -> Self {
        Self {
            id: ConnectionId::next(),
            stream,
            peer_addr,
            bytes_read: 0,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Total bytes read since acceptance. Never decreases.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Register interest in read readiness; used by the readiness wait.
    pub fn poll_read_ready(&self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.stream.poll_read_ready(cx)
    }

    /// Release the descriptor.
    fn close(self) -> ClosedConnection {
        let summary = ClosedConnection {
            id: self.id,
            peer_addr: self.peer_addr,
            bytes_read: self.bytes_read,
        };
        drop(self.stream);
        summary
    }
}

/// What is left of a connection after its descriptor has been closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosedConnection {
    pub id: ConnectionId,
    pub peer_addr: SocketAddr,
    pub bytes_read: u64,
}

/// Result of reading from the held connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `bytes_read > 0` bytes were placed at the front of the caller's buffer.
    Data { bytes_read: usize },
    /// End of stream or read error. The caller should `remove` the connection.
    Closed,
    /// Readiness was stale; nothing was read and the connection stays open.
    WouldBlock,
}

/// Holds zero or one client connection.
#[derive(Debug, Default)]
pub struct ConnectionSet {
    held: Option<ClientConnection>,
}

impl ConnectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `connection` as the only tracked connection, closing any
    /// previously held one first. Returns the evicted connection's summary.
    pub fn accept(&mut self, connection: ClientConnection) -> Option<ClosedConnection> {
        let evicted = self.held.take().map(|old| {
            let closed = old.close();
            tracing::info!(
                connection_id = %closed.id,
                peer_addr = %closed.peer_addr,
                total_bytes = closed.bytes_read,
                superseded_by = %connection.id(),
                "Superseded connection closed"
            );
            metrics::record_eviction();
            closed
        });
        self.held = Some(connection);
        evicted
    }

    pub fn current(&self) -> Option<&ClientConnection> {
        self.held.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_none()
    }

    pub fn len(&self) -> usize {
        usize::from(self.held.is_some())
    }

    /// Close and forget the held connection if it is `id`. Stale ids are ignored.
    pub fn remove(&mut self, id: ConnectionId) -> Option<ClosedConnection> {
        if self.held.as_ref().map(ClientConnection::id) != Some(id) {
            return None;
        }
        let closed = self.held.take()?.close();
        tracing::info!(
            connection_id = %closed.id,
            peer_addr = %closed.peer_addr,
            total_bytes = closed.bytes_read,
            "Connection closed"
        );
        metrics::record_close();
        Some(closed)
    }

    /// Read whatever is available from connection `id` into `buf` without
    /// blocking. Only meaningful once the connection has been reported
    /// readable.
    pub fn read_from(&mut self, id: ConnectionId, buf: &mut [u8]) -> ReadOutcome {
        let Some(conn) = self.held.as_mut().filter(|conn| conn.id == id) else {
            return ReadOutcome::WouldBlock;
        };

        match conn.stream.try_read(buf) {
            Ok(0) => ReadOutcome::Closed,
            Ok(n) => {
                conn.bytes_read += n as u64;
                ReadOutcome::Data { bytes_read: n }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => ReadOutcome::WouldBlock,
            Err(e) => {
                tracing::debug!(connection_id = %id, error = %e, "Read failed");
                ReadOutcome::Closed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    /// Returns the client side and the accepted server side.
    async fn pair(listener: &TcpListener) -> (TcpStream, ClientConnection) {
        let client = TcpStream::connect(listener.local_addr().unwrap())
            .await
            .unwrap();
        let (stream, peer) = listener.accept().await.unwrap();
        (client, ClientConnection::new(stream, peer))
    }

    async fn read_when_ready(set: &mut ConnectionSet, id: ConnectionId) -> ReadOutcome {
        let mut buf = [0u8; 64];
        loop {
            std::future::poll_fn(|cx| set.current().unwrap().poll_read_ready(cx))
                .await
                .unwrap();
            match set.read_from(id, &mut buf) {
                ReadOutcome::WouldBlock => continue,
                outcome => return outcome,
            }
        }
    }

    #[test]
    fn ids_are_distinct_and_labelled() {
        let first = ConnectionId::next();
        let second = ConnectionId::next();
        assert_ne!(first, second);
        assert!(first.to_string().starts_with("conn-"));
    }

    #[tokio::test]
    async fn accept_into_empty_set_evicts_nothing() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (_client, conn) = pair(&listener).await;
        let id = conn.id();

        let mut set = ConnectionSet::new();
        assert!(set.is_empty());
        assert_eq!(set.accept(conn), None);
        assert_eq!(set.len(), 1);
        assert_eq!(set.current().map(ClientConnection::id), Some(id));
    }

    #[tokio::test]
    async fn accept_closes_previous_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (mut first_client, first) = pair(&listener).await;
        let (_second_client, second) = pair(&listener).await;
        let first_id = first.id();
        let second_id = second.id();

        let mut set = ConnectionSet::new();
        set.accept(first);
        let evicted = set.accept(second).unwrap();

        assert_eq!(evicted.id, first_id);
        assert_eq!(set.len(), 1);
        assert_eq!(set.current().unwrap().id(), second_id);

        let mut buf = [0u8; 8];
        assert_eq!(first_client.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn remove_ignores_stale_id() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (_client, conn) = pair(&listener).await;
        let id = conn.id();

        let mut set = ConnectionSet::new();
        set.accept(conn);
        assert_eq!(set.remove(ConnectionId::next()), None);
        assert_eq!(set.len(), 1);

        let closed = set.remove(id).unwrap();
        assert_eq!(closed.id, id);
        assert!(set.is_empty());
        assert_eq!(set.remove(id), None);
    }

    #[tokio::test]
    async fn reads_are_counted() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (mut client, conn) = pair(&listener).await;
        let id = conn.id();
        let mut set = ConnectionSet::new();
        set.accept(conn);

        client.write_all(b"hello").await.unwrap();
        assert_eq!(
            read_when_ready(&mut set, id).await,
            ReadOutcome::Data { bytes_read: 5 }
        );

        client.write_all(b"abc").await.unwrap();
        assert_eq!(
            read_when_ready(&mut set, id).await,
            ReadOutcome::Data { bytes_read: 3 }
        );
        assert_eq!(set.current().unwrap().bytes_read(), 8);
    }

    #[tokio::test]
    async fn peer_close_reads_as_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (client, conn) = pair(&listener).await;
        let id = conn.id();
        let mut set = ConnectionSet::new();
        set.accept(conn);

        drop(client);
        assert_eq!(read_when_ready(&mut set, id).await, ReadOutcome::Closed);
        assert!(set.remove(id).is_some());
    }

    #[tokio::test]
    async fn read_from_unknown_id_touches_nothing() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (_client, conn) = pair(&listener).await;
        let mut set = ConnectionSet::new();
        set.accept(conn);

        let mut buf = [0u8; 8];
        assert_eq!(
            set.read_from(ConnectionId::next(), &mut buf),
            ReadOutcome::WouldBlock
        );
        assert_eq!(set.len(), 1);
    }
}
