//! The REST API.
//!
//! Routes:
//! - POST   /api/sessions/register         -> 201 PublicUser
//! - POST   /api/sessions/login            -> 200 LoginResponse + cookie
//! - POST   /api/sessions/logout           -> 204
//! - GET    /api/sessions/profile          -> 200 PublicUser
//! - PUT    /api/sessions/profile          -> 200 PublicUser
//! - POST   /api/lobbies                   -> 201 Lobby
//! - GET    /api/lobbies?code=XXXXXX       -> 200 [Lobby]
//! - GET    /api/lobbies/{id}              -> 200 Lobby
//! - DELETE /api/lobbies/{id}              -> 204
//! - POST   /api/lobbies/{id}/users        -> 200 Lobby
//! - DELETE /api/lobbies/{id}/users/{uid}  -> 200 Lobby
//!
//! Everything except register and login requires a session.

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{delete, get, post};
use hostrelay_lobby::LobbyStore;
use hostrelay_session::AccountStore;

use crate::server::ServerState;

mod auth;
mod error;
mod lobbies;
mod sessions;

pub use error::ApiError;

pub(crate) fn router<S: AccountStore, L: LobbyStore>(state: Arc<ServerState<S, L>>) -> Router {
    let public = Router::new()
        .route("/api/sessions/register", post(sessions::register::<S, L>))
        .route("/api/sessions/login", post(sessions::login::<S, L>));

    let protected = Router::new()
        .route("/api/sessions/logout", post(sessions::logout::<S, L>))
        .route(
            "/api/sessions/profile",
            get(sessions::get_profile::<S, L>).put(sessions::update_profile::<S, L>),
        )
        .route(
            "/api/lobbies",
            post(lobbies::create::<S, L>).get(lobbies::find::<S, L>),
        )
        .route(
            "/api/lobbies/{id}",
            get(lobbies::get::<S, L>).delete(lobbies::disband::<S, L>),
        )
        .route("/api/lobbies/{id}/users", post(lobbies::join::<S, L>))
        .route(
            "/api/lobbies/{id}/users/{uid}",
            delete(lobbies::remove_member::<S, L>),
        )
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_session::<S, L>,
        ));

    public.merge(protected).with_state(state)
}
