//! The lobby channel (`/hubs/lobby`).
//!
//! A connection joins the group of the lobby its user belongs to and
//! stays there until it drops. The only client invocation is `StartGame`.

use std::sync::Arc;

use hostrelay_lobby::{LobbyError, LobbyStatus, LobbyStore};
use hostrelay_protocol::{Codec, LobbyClientMessage, LobbyId, LobbyServerMessage, UserId};
use hostrelay_session::{AccountStore, RequestIdentity};
use hostrelay_transport::{Connection, WebSocketConnection};

use crate::groups::Outbound;
use crate::handler::{self, LOBBY_HUB_PATH};
use crate::server::ServerState;
use crate::HostrelayError;

/// What a lobby connection remembers about the lobby it joined.
#[derive(Debug, Clone, Copy)]
struct Membership {
    lobby_id: LobbyId,
    host_id: UserId,
}

pub(crate) async fn run<S, L>(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<S, L>>,
    identity: RequestIdentity,
) -> Result<(), HostrelayError>
where
    S: AccountStore,
    L: LobbyStore,
{
    let user_id = identity.user.id;
    let conn_id = conn.id();

    let lobby = match state.lobbies.lobby_of_user(user_id).await? {
        Some(lobby) => lobby,
        None => {
            tracing::debug!(%conn_id, %user_id, "lobby channel refused: not in a lobby");
            return handler::reject(&conn, &state, LOBBY_HUB_PATH, "not in a lobby").await;
        }
    };
    let membership = Membership {
        lobby_id: lobby.id,
        host_id: lobby.host_id,
    };

    let (tx, writer) = handler::spawn_writer(Arc::clone(&conn));
    state
        .lobby_groups
        .lock()
        .await
        .add(membership.lobby_id, conn_id, user_id, tx.clone());
    tracing::info!(%conn_id, %user_id, lobby_id = %membership.lobby_id, "lobby channel connected");

    state
        .broadcast_lobby(membership.lobby_id, &LobbyServerMessage::PlayerJoined { id: user_id })
        .await;

    while let Some(data) = handler::next_frame(&conn, user_id).await {
        let reply = match state.codec.decode::<LobbyClientMessage>(&data) {
            Ok(LobbyClientMessage::StartGame) => start_game(&state, membership, user_id).await,
            Err(e) => {
                tracing::debug!(%conn_id, %user_id, error = %e, "undecodable lobby message");
                Some(e.to_string())
            }
        };
        if let Some(message) = reply {
            send_error(&state, &tx, message);
        }
    }

    state
        .lobby_groups
        .lock()
        .await
        .remove(membership.lobby_id, conn_id);
    handle_departure(&state, membership, user_id).await;
    handler::finish(&conn, tx, writer).await;

    tracing::info!(%conn_id, %user_id, "lobby channel disconnected");
    Ok(())
}

/// Runs `StartGame` for `user_id`. Returns the error message to send back
/// if the invocation failed.
async fn start_game<S, L>(
    state: &ServerState<S, L>,
    membership: Membership,
    user_id: UserId,
) -> Option<String>
where
    S: AccountStore,
    L: LobbyStore,
{
    if user_id != membership.host_id {
        return Some(LobbyError::Forbidden(user_id).to_string());
    }

    let lobby = match state.lobbies.start_game(user_id).await {
        Ok(lobby) => lobby,
        Err(e) => return Some(e.to_string()),
    };
    state
        .games
        .lock()
        .await
        .start_game(lobby.id, lobby.host_id, &lobby.members);

    state
        .broadcast_lobby(lobby.id, &LobbyServerMessage::GameStarted)
        .await;
    None
}

/// Leaves the lobby on disconnect and tells whoever is still connected.
async fn handle_departure<S, L>(state: &ServerState<S, L>, membership: Membership, user_id: UserId)
where
    S: AccountStore,
    L: LobbyStore,
{
    let lobby_id = membership.lobby_id;

    let current = match state.lobbies.lobby_of_user(user_id).await {
        Ok(current) => current,
        Err(e) => {
            tracing::error!(%user_id, %lobby_id, error = %e, "lobby lookup failed on disconnect");
            return;
        }
    };
    let remaining = match current {
        // Players hop from the lobby channel to the game channel once the
        // game starts; the game channel handles departures from here on.
        Some(lobby) if lobby.id == lobby_id && lobby.status == LobbyStatus::InGame => return,
        Some(lobby) if lobby.id == lobby_id => match state.lobbies.leave_lobby(user_id).await {
            Ok(lobby) => Some(lobby),
            Err(e) => {
                tracing::error!(%user_id, %lobby_id, error = %e, "leave failed on disconnect");
                return;
            }
        },
        // Already removed (kicked over HTTP, or disbanded). Fall back to
        // the lobby this connection joined.
        _ => match state.lobbies.get_lobby(lobby_id).await {
            Ok(lobby) => Some(lobby),
            Err(LobbyError::NotFound) => None,
            Err(e) => {
                tracing::error!(%user_id, %lobby_id, error = %e, "lobby lookup failed on disconnect");
                return;
            }
        },
    };

    let disband = match &remaining {
        Some(lobby) => lobby.members.is_empty() || user_id == membership.host_id,
        None => true,
    };

    if disband {
        match state.lobbies.disband_lobby(lobby_id).await {
            Ok(_) | Err(LobbyError::NotFound) => {}
            Err(e) => {
                tracing::error!(%lobby_id, error = %e, "disband failed on disconnect");
                return;
            }
        }
        state
            .broadcast_lobby(lobby_id, &LobbyServerMessage::LobbyDisbanded)
            .await;
    } else {
        state
            .broadcast_lobby(lobby_id, &LobbyServerMessage::PlayerLeft { id: user_id })
            .await;
    }
}

fn send_error<S, L>(state: &ServerState<S, L>, tx: &Outbound, message: String) {
    match state.codec.encode(&LobbyServerMessage::Error { message }) {
        Ok(bytes) => {
            let _ = tx.send(bytes.into());
        }
        Err(e) => tracing::error!(error = %e, "failed to encode error reply"),
    }
}
