//! The game channel (`/hubs/game`).
//!
//! Clients relay their own pose, the host relays world objects, and
//! impulse actions are forwarded to the host only. Snapshots flow the
//! other way through the [`TickBroadcaster`](crate::TickBroadcaster).

use std::sync::Arc;

use hostrelay_lobby::LobbyStore;
use hostrelay_protocol::{
    Codec, GameClientMessage, GamePlayerState, GameServerMessage, LobbyId, UserId,
};
use hostrelay_session::{AccountStore, RequestIdentity};
use hostrelay_transport::{Connection, WebSocketConnection};

use crate::handler::{self, GAME_HUB_PATH};
use crate::server::ServerState;
use crate::HostrelayError;

/// Games end once fewer players than this remain.
const MIN_PLAYERS: usize = 2;

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

    let Some((lobby_id, host_id)) = resolve_game(&state, user_id).await? else {
        tracing::debug!(%conn_id, %user_id, "game channel refused: not in a game or lobby");
        return handler::reject(&conn, &state, GAME_HUB_PATH, "not in a lobby").await;
    };

    let (tx, writer) = handler::spawn_writer(Arc::clone(&conn));
    state
        .game_groups
        .lock()
        .await
        .add(lobby_id, conn_id, user_id, tx.clone());
    tracing::info!(%conn_id, %user_id, %lobby_id, "game channel connected");

    while let Some(data) = handler::next_frame(&conn, user_id).await {
        match state.codec.decode::<GameClientMessage>(&data) {
            Ok(GameClientMessage::PlayerStateUpdate {
                position,
                orientation,
            }) => {
                state.games.lock().await.update_player_state(
                    lobby_id,
                    user_id,
                    GamePlayerState {
                        position,
                        orientation,
                    },
                );
            }
            Ok(GameClientMessage::WorldStateUpdate { object_states }) => {
                if user_id != host_id {
                    tracing::warn!(%user_id, %lobby_id, "dropping world update from non-host");
                    continue;
                }
                state
                    .games
                    .lock()
                    .await
                    .update_object_states(lobby_id, &object_states);
            }
            Ok(GameClientMessage::GamePlayerImpulseAction { actions }) => {
                let playing =
                    state.games.lock().await.lobby_id_by_user(user_id) == Some(lobby_id);
                if !playing {
                    tracing::debug!(%user_id, %lobby_id, "dropping impulse from non-player");
                    continue;
                }
                let relay = GameServerMessage::GamePlayerImpulseAction {
                    from: user_id,
                    actions,
                };
                state.send_game_to_user(lobby_id, host_id, &relay).await;
            }
            Err(e) => {
                tracing::debug!(%conn_id, %user_id, error = %e, "undecodable game message");
                match state.codec.encode(&GameServerMessage::Error {
                    message: e.to_string(),
                }) {
                    Ok(bytes) => {
                        let _ = tx.send(bytes.into());
                    }
                    Err(e) => tracing::error!(error = %e, "failed to encode error reply"),
                }
            }
        }
    }

    state.game_groups.lock().await.remove(lobby_id, conn_id);
    remove_from_game(&state, lobby_id, user_id).await;
    handler::finish(&conn, tx, writer).await;

    tracing::info!(%conn_id, %user_id, "game channel disconnected");
    Ok(())
}

/// The running game the user plays in, else the lobby they belong to.
async fn resolve_game<S, L>(
    state: &ServerState<S, L>,
    user_id: UserId,
) -> Result<Option<(LobbyId, UserId)>, HostrelayError>
where
    S: AccountStore,
    L: LobbyStore,
{
    if let Some(game) = state.games.lock().await.game_state_by_user(user_id) {
        return Ok(Some((game.lobby_id, game.host_id)));
    }
    let lobby = state.lobbies.lobby_of_user(user_id).await?;
    Ok(lobby.map(|lobby| (lobby.id, lobby.host_id)))
}

/// Takes `user_id` out of the lobby's running game.
///
/// `PlayerLeft` goes out only if they were actually playing, so a client
/// that joined the channel before `StartGame` leaves silently. The game
/// stops when the host leaves or too few players remain; the lobby is then
/// reopened before `GameStopped` is sent.
pub(crate) async fn remove_from_game<S, L>(
    state: &ServerState<S, L>,
    lobby_id: LobbyId,
    user_id: UserId,
) where
    S: AccountStore,
    L: LobbyStore,
{
    let stopped = {
        let mut games = state.games.lock().await;
        let host_id = match games.game_state(lobby_id) {
            Some(game) if game.players.contains_key(&user_id) => game.host_id,
            _ => return,
        };
        let remaining = games.remove_player(lobby_id, user_id).unwrap_or(0);
        (user_id == host_id || remaining < MIN_PLAYERS) && games.stop_game(lobby_id).is_ok()
    };

    state
        .broadcast_game(lobby_id, &GameServerMessage::PlayerLeft { id: user_id })
        .await;

    if stopped {
        if let Err(e) = state.lobbies.open_lobby(lobby_id).await {
            tracing::warn!(%lobby_id, error = %e, "could not reopen lobby after game stopped");
        }
        state
            .broadcast_game(lobby_id, &GameServerMessage::GameStopped)
            .await;
    }
}
