//! `/api/lobbies/*` handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use hostrelay_lobby::{JoinCode, Lobby, LobbyError, LobbyStore};
use hostrelay_protocol::{GameServerMessage, LobbyId, LobbyServerMessage, UserId};
use hostrelay_session::{AccountStore, RequestIdentity};
use serde::Deserialize;

use super::ApiError;
use crate::game_hub;
use crate::server::ServerState;

#[derive(Debug, Deserialize)]
pub(crate) struct FindQuery {
    code: Option<String>,
}

pub(crate) async fn create<S: AccountStore, L: LobbyStore>(
    State(state): State<Arc<ServerState<S, L>>>,
    Extension(identity): Extension<RequestIdentity>,
) -> Result<(StatusCode, Json<Lobby>), ApiError> {
    let lobby = state.lobbies.create_lobby(identity.user.id).await?;
    Ok((StatusCode::CREATED, Json(lobby)))
}

/// Zero or one lobbies. A malformed code matches nothing.
pub(crate) async fn find<S: AccountStore, L: LobbyStore>(
    State(state): State<Arc<ServerState<S, L>>>,
    Query(query): Query<FindQuery>,
) -> Result<Json<Vec<Lobby>>, ApiError> {
    let Some(code) = query.code else {
        return Err(ApiError::BadRequest("missing code parameter".into()));
    };
    let found = state.lobbies.find_by_code(&code).await?;
    Ok(Json(found.into_iter().collect()))
}

pub(crate) async fn get<S: AccountStore, L: LobbyStore>(
    State(state): State<Arc<ServerState<S, L>>>,
    Path(lobby_id): Path<LobbyId>,
) -> Result<Json<Lobby>, ApiError> {
    Ok(Json(state.lobbies.get_lobby(lobby_id).await?))
}

/// Host or admin only. A running game is stopped first.
pub(crate) async fn disband<S: AccountStore, L: LobbyStore>(
    State(state): State<Arc<ServerState<S, L>>>,
    Extension(identity): Extension<RequestIdentity>,
    Path(lobby_id): Path<LobbyId>,
) -> Result<StatusCode, ApiError> {
    let lobby = state.lobbies.get_lobby(lobby_id).await?;
    let caller = &identity.user;
    if !lobby.is_host(caller.id) && !caller.is_admin() {
        return Err(ApiError::Forbidden(
            "only the host or an admin can disband a lobby".into(),
        ));
    }

    disband_and_notify(&state, lobby_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Joins the caller to the lobby. The body is the join code as a JSON
/// string, and it must belong to the lobby in the path.
pub(crate) async fn join<S: AccountStore, L: LobbyStore>(
    State(state): State<Arc<ServerState<S, L>>>,
    Extension(identity): Extension<RequestIdentity>,
    Path(lobby_id): Path<LobbyId>,
    Json(code): Json<String>,
) -> Result<Json<Lobby>, ApiError> {
    let code = JoinCode::parse(&code)?;
    if let Some(other) = state.lobbies.find_by_code(code.as_str()).await? {
        if other.id != lobby_id {
            return Err(ApiError::BadRequest(format!(
                "join code {code} does not belong to lobby {lobby_id}"
            )));
        }
    }

    let lobby = state
        .lobbies
        .join_lobby(identity.user.id, code.as_str())
        .await?;
    Ok(Json(lobby))
}

/// Removes a member. Members may remove themselves; the host and admins
/// may remove anyone. Losing the host or the last member disbands the
/// lobby. A member removed mid-game also leaves the game.
pub(crate) async fn remove_member<S: AccountStore, L: LobbyStore>(
    State(state): State<Arc<ServerState<S, L>>>,
    Extension(identity): Extension<RequestIdentity>,
    Path((lobby_id, user_id)): Path<(LobbyId, UserId)>,
) -> Result<Json<Lobby>, ApiError> {
    let lobby = state.lobbies.get_lobby(lobby_id).await?;
    let caller = &identity.user;
    if caller.id != user_id && !lobby.is_host(caller.id) && !caller.is_admin() {
        return Err(ApiError::Forbidden(
            "only the member, the host or an admin can remove a member".into(),
        ));
    }

    let remaining = state.lobbies.remove_member(lobby_id, user_id).await?;
    if remaining.members.is_empty() || user_id == remaining.host_id {
        disband_and_notify(&state, lobby_id).await?;
    } else {
        state
            .broadcast_lobby(lobby_id, &LobbyServerMessage::PlayerLeft { id: user_id })
            .await;
        game_hub::remove_from_game(&state, lobby_id, user_id).await;
    }
    Ok(Json(remaining))
}

/// Stops the lobby's game if one is running, deletes the lobby and tells
/// both channels. Already gone counts as done.
async fn disband_and_notify<S: AccountStore, L: LobbyStore>(
    state: &ServerState<S, L>,
    lobby_id: LobbyId,
) -> Result<(), ApiError> {
    let stopped = state.games.lock().await.stop_game(lobby_id).is_ok();
    if stopped {
        state
            .broadcast_game(lobby_id, &GameServerMessage::GameStopped)
            .await;
    }

    match state.lobbies.disband_lobby(lobby_id).await {
        Ok(_) | Err(LobbyError::NotFound) => {}
        Err(e) => return Err(e.into()),
    }
    state
        .broadcast_lobby(lobby_id, &LobbyServerMessage::LobbyDisbanded)
        .await;
    Ok(())
}
