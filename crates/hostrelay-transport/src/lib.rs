//! Realtime socket plumbing for Hostrelay.
//!
//! The server only needs three things from a socket: bytes in, bytes out,
//! and the HTTP upgrade request it was opened with. The request path picks
//! the realtime channel (`/hubs/lobby` or `/hubs/game`) and the `Cookie`
//! and `Authorization` headers carry the session token, so
//! [`UpgradeRequest`] travels with every accepted [`Connection`].
//!
//! Accepting is two steps. [`Transport::accept`] only takes the TCP
//! connection and hands back a [`PendingConnection`]; the caller runs
//! [`PendingConnection::upgrade`] in the connection's own task, so a peer
//! that stalls mid-handshake holds up nobody but itself.
//!
//! # Feature Flags
//!
//! - `websocket` (default): [`WebSocketTransport`] over `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{
    DEFAULT_HANDSHAKE_TIMEOUT, PendingWebSocket, WebSocketConnection, WebSocketTransport,
};

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique id of one socket. A user with two tabs open has two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates the next unused id.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// The parts of the HTTP upgrade request the server cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpgradeRequest {
    /// Request path without the query string, e.g. `/hubs/lobby`.
    pub path: String,
    /// Raw `Cookie` header, if present.
    pub cookie: Option<String>,
    /// Raw `Authorization` header, if present.
    pub authorization: Option<String>,
}

/// A listener handing out peers whose upgrade is still to be done.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Pending: PendingConnection<Connection = Self::Connection, Error = Self::Error>;
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next peer. Returns as soon as the TCP connection is
    /// accepted; no bytes have been read from it yet.
    async fn accept(&mut self) -> Result<Self::Pending, Self::Error>;
}

/// An accepted peer that hasn't finished its protocol handshake.
pub trait PendingConnection: Send + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    fn peer_addr(&self) -> SocketAddr;

    /// Completes the handshake, or fails once the transport's handshake
    /// timeout runs out.
    async fn upgrade(self) -> Result<Self::Connection, Self::Error>;
}

/// One client socket.
///
/// Each connection has a reader (the hub's message loop) and a writer
/// (the outbound queue drain) running at the same time, so a pending
/// [`recv`](Self::recv) must never block [`send`](Self::send).
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Next payload from the peer, or `Ok(None)` after a clean close.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;

    /// The request the socket was upgraded from.
    fn upgrade_request(&self) -> &UpgradeRequest;
}
