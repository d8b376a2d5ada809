use std::net::SocketAddr;
use std::time::Duration;

use crate::ConnectionId;

/// Failures on the realtime listener and its sockets.
///
/// Per-connection variants carry the [`ConnectionId`] so a log line can be
/// tied back to the player it belongs to.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to accept TCP connection: {0}")]
    Accept(#[source] std::io::Error),

    /// The peer connected but the WebSocket handshake didn't complete.
    #[error("WebSocket upgrade from {peer} failed: {reason}")]
    Upgrade { peer: SocketAddr, reason: String },

    #[error("WebSocket upgrade from {peer} timed out after {after:?}")]
    HandshakeTimeout { peer: SocketAddr, after: Duration },

    #[error("{conn_id}: write failed: {reason}")]
    Write { conn_id: ConnectionId, reason: String },

    #[error("{conn_id}: read failed: {reason}")]
    Read { conn_id: ConnectionId, reason: String },
}
