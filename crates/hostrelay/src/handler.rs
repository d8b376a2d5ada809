//! Per-connection handling on the realtime listener.
//!
//! Each accepted connection gets its own Tokio task running
//! [`handle_connection`]. The flow is:
//!   1. Validate the session token carried by the upgrade request
//!   2. Route on the request path: `/hubs/lobby` or `/hubs/game`
//!   3. The hub owns the connection until it closes
//!
//! A connection that fails step 1 or 2 gets one `Error` frame and a
//! policy close, and never reaches hub logic.

use std::sync::Arc;

use hostrelay_lobby::LobbyStore;
use hostrelay_protocol::{Codec, GameServerMessage, LobbyServerMessage, UserId};
use hostrelay_session::{AccountStore, Credentials};
use hostrelay_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::groups::Outbound;
use crate::server::ServerState;
use crate::{HostrelayError, game_hub, lobby_hub};

/// Path of the lobby channel.
pub const LOBBY_HUB_PATH: &str = "/hubs/lobby";

/// Path of the game channel.
pub const GAME_HUB_PATH: &str = "/hubs/game";

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<S, L>(
    conn: WebSocketConnection,
    state: Arc<ServerState<S, L>>,
) -> Result<(), HostrelayError>
where
    S: AccountStore,
    L: LobbyStore,
{
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    let upgrade = conn.upgrade_request().clone();

    let credentials = Credentials {
        cookie: upgrade.cookie.as_deref(),
        authorization: upgrade.authorization.as_deref(),
    };
    let identity = match state.validator.validate(credentials).await {
        Ok(identity) => identity,
        Err(e) => {
            tracing::debug!(%conn_id, path = %upgrade.path, error = %e, "rejecting unauthenticated connection");
            return reject(&conn, &state, &upgrade.path, "unauthorized").await;
        }
    };

    tracing::debug!(%conn_id, user_id = %identity.user.id, path = %upgrade.path, "realtime connection authenticated");

    match upgrade.path.as_str() {
        LOBBY_HUB_PATH => lobby_hub::run(conn, state, identity).await,
        GAME_HUB_PATH => game_hub::run(conn, state, identity).await,
        other => {
            tracing::debug!(%conn_id, path = other, "unknown realtime endpoint");
            reject(&conn, &state, other, "unknown endpoint").await
        }
    }
}

/// Sends a single `Error` frame in the channel's vocabulary, then closes.
pub(crate) async fn reject<S, L>(
    conn: &WebSocketConnection,
    state: &ServerState<S, L>,
    path: &str,
    message: &str,
) -> Result<(), HostrelayError> {
    let message = message.to_string();
    let bytes = if path == GAME_HUB_PATH {
        state.codec.encode(&GameServerMessage::Error { message: message.clone() })?
    } else {
        state.codec.encode(&LobbyServerMessage::Error { message: message.clone() })?
    };
    conn.send(&bytes).await?;
    conn.close_with_reason(&message).await?;
    Ok(())
}

/// Spawns the task that drains a connection's outbound queue into the
/// socket. It ends once every sender is dropped or a send fails.
pub(crate) fn spawn_writer(conn: Arc<WebSocketConnection>) -> (Outbound, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<Arc<[u8]>>();
    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if let Err(e) = conn.send(&frame).await {
                tracing::debug!(conn_id = %conn.id(), error = %e, "send failed, stopping writer");
                break;
            }
        }
    });
    (tx, writer)
}

/// Waits for the next inbound frame. `None` once the peer is gone; a
/// receive error counts as gone.
pub(crate) async fn next_frame(conn: &WebSocketConnection, user_id: UserId) -> Option<Vec<u8>> {
    match conn.recv().await {
        Ok(Some(data)) => Some(data),
        Ok(None) => {
            tracing::debug!(conn_id = %conn.id(), %user_id, "connection closed cleanly");
            None
        }
        Err(e) => {
            tracing::debug!(conn_id = %conn.id(), %user_id, error = %e, "recv error");
            None
        }
    }
}

/// Flushes whatever is still queued and closes the socket.
///
/// The caller must already have removed the connection from its group,
/// so `tx` is the last sender.
pub(crate) async fn finish(conn: &WebSocketConnection, tx: Outbound, writer: JoinHandle<()>) {
    drop(tx);
    let _ = writer.await;
    let _ = conn.close().await;
}
