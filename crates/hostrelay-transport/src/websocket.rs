//! WebSocket transport implementation using `tokio-tungstenite`.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request, Response,
};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::{
    Connection, ConnectionId, PendingConnection, Transport, TransportError, UpgradeRequest,
};

type WsStream = WebSocketStream<TcpStream>;

/// How long a peer gets to send a complete upgrade request.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// A WebSocket-based [`Transport`] that listens for incoming connections.
pub struct WebSocketTransport {
    listener: TcpListener,
    handshake_timeout: Duration,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.to_owned(),
                source,
            })?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self {
            listener,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        })
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Returns the address the listener is actually bound to (useful when
    /// binding to port 0).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Pending = PendingWebSocket;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Pending, Self::Error> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::Accept)?;
        tracing::trace!(%peer, "TCP connection accepted");
        Ok(PendingWebSocket {
            stream,
            peer,
            timeout: self.handshake_timeout,
        })
    }
}

/// A TCP peer that still owes us its WebSocket upgrade request.
pub struct PendingWebSocket {
    stream: TcpStream,
    peer: SocketAddr,
    timeout: Duration,
}

impl PendingConnection for PendingWebSocket {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    async fn upgrade(self) -> Result<Self::Connection, Self::Error> {
        let peer = self.peer;

        // The handshake callback is synchronous, so it only records the
        // request. Token validation happens after the upgrade completes.
        let mut upgrade = UpgradeRequest::default();
        let handshake = tokio_tungstenite::accept_hdr_async(
            self.stream,
            |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                upgrade = upgrade_request_from(req);
                Ok(resp)
            },
        );
        let ws = tokio::time::timeout(self.timeout, handshake)
            .await
            .map_err(|_| TransportError::HandshakeTimeout {
                peer,
                after: self.timeout,
            })?
            .map_err(|e| TransportError::Upgrade {
                peer,
                reason: e.to_string(),
            })?;

        let id = ConnectionId::next();
        tracing::debug!(%id, %peer, path = %upgrade.path, "accepted WebSocket connection");

        let (sink, source) = ws.split();
        Ok(WebSocketConnection {
            id,
            upgrade,
            sink: Mutex::new(sink),
            source: Mutex::new(source),
        })
    }
}

fn upgrade_request_from(req: &Request) -> UpgradeRequest {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    };
    UpgradeRequest {
        path: req.uri().path().to_owned(),
        cookie: header("cookie"),
        authorization: header("authorization"),
    }
}

/// A single WebSocket connection.
///
/// The stream is split so the read half (owned by the connection's handler
/// loop) and the write half (fed by the outbound queue) lock independently.
pub struct WebSocketConnection {
    id: ConnectionId,
    upgrade: UpgradeRequest,
    sink: Mutex<SplitSink<WsStream, Message>>,
    source: Mutex<SplitStream<WsStream>>,
}

impl WebSocketConnection {
    /// Sends a policy-violation close frame carrying `reason`.
    ///
    /// Used to turn away connections that fail authentication or that
    /// don't belong to any lobby.
    pub async fn close_with_reason(&self, reason: &str) -> Result<(), TransportError> {
        let frame = CloseFrame {
            code: CloseCode::Policy,
            reason: reason.to_owned().into(),
        };
        self.sink
            .lock()
            .await
            .send(Message::Close(Some(frame)))
            .await
            .map_err(|e| self.write_error(e))
    }

    fn write_error(&self, e: impl std::fmt::Display) -> TransportError {
        TransportError::Write {
            conn_id: self.id,
            reason: e.to_string(),
        }
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    /// JSON payloads go out as text frames so browser clients receive
    /// strings; anything that isn't UTF-8 goes out as a binary frame.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        let msg = match String::from_utf8(data.to_vec()) {
            Ok(text) => Message::Text(text.into()),
            Err(e) => Message::Binary(e.into_bytes().into()),
        };
        self.sink
            .lock()
            .await
            .send(msg)
            .await
            .map_err(|e| self.write_error(e))
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut source = self.source.lock().await;
        loop {
            match source.next().await {
                Some(Ok(Message::Binary(data))) => return Ok(Some(data.into())),
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong/raw frame
                Some(Err(e)) => {
                    return Err(TransportError::Read {
                        conn_id: self.id,
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.sink
            .lock()
            .await
            .close()
            .await
            .map_err(|e| self.write_error(e))
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn upgrade_request(&self) -> &UpgradeRequest {
        &self.upgrade
    }
}
