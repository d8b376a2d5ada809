//! `/api/sessions/*` handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::SET_COOKIE;
use axum::response::{AppendHeaders, IntoResponse};
use axum::{Extension, Json};
use hostrelay_lobby::LobbyStore;
use hostrelay_session::{AccountStore, PublicUser, RequestIdentity, Role, SESSION_COOKIE};
use serde::Deserialize;

use super::ApiError;
use crate::server::ServerState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RegisterRequest {
    username: String,
    password: String,
    /// Defaults to the username.
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProfileUpdate {
    display_name: String,
}

pub(crate) async fn register<S: AccountStore, L: LobbyStore>(
    State(state): State<Arc<ServerState<S, L>>>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    let username = body.username.trim();
    if username.is_empty() || body.password.is_empty() {
        return Err(ApiError::BadRequest(
            "username and password are required".into(),
        ));
    }
    let display_name = body
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(username);

    let user = state
        .sessions
        .register(username, &body.password, display_name, &[Role::Player])
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub(crate) async fn login<S: AccountStore, L: LobbyStore>(
    State(state): State<Arc<ServerState<S, L>>>,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state
        .sessions
        .login(body.username.trim(), &body.password)
        .await?;

    let cookie = session_cookie(
        &response.token,
        state.config.session.session_ttl_secs,
        state.config.secure_cookies,
    );
    Ok((AppendHeaders([(SET_COOKIE, cookie)]), Json(response)))
}

pub(crate) async fn logout<S: AccountStore, L: LobbyStore>(
    State(state): State<Arc<ServerState<S, L>>>,
    Extension(identity): Extension<RequestIdentity>,
) -> Result<impl IntoResponse, ApiError> {
    state.sessions.logout(&identity.token).await?;

    let cookie = session_cookie("", 0, state.config.secure_cookies);
    Ok((StatusCode::NO_CONTENT, AppendHeaders([(SET_COOKIE, cookie)])))
}

pub(crate) async fn get_profile<S: AccountStore, L: LobbyStore>(
    State(state): State<Arc<ServerState<S, L>>>,
    Extension(identity): Extension<RequestIdentity>,
) -> Result<Json<PublicUser>, ApiError> {
    let user = state.sessions.get_profile(&identity.token).await?;
    Ok(Json(user))
}

pub(crate) async fn update_profile<S: AccountStore, L: LobbyStore>(
    State(state): State<Arc<ServerState<S, L>>>,
    Extension(identity): Extension<RequestIdentity>,
    Json(body): Json<ProfileUpdate>,
) -> Result<Json<PublicUser>, ApiError> {
    let display_name = body.display_name.trim();
    if display_name.is_empty() {
        return Err(ApiError::BadRequest("displayName must not be empty".into()));
    }
    let user = state
        .sessions
        .update_profile(&identity.token, display_name)
        .await?;
    Ok(Json(user))
}

/// `Set-Cookie` value for the session token. A `max_age` of 0 clears it.
fn session_cookie(token: &str, max_age: i64, secure: bool) -> String {
    let mut cookie =
        format!("{SESSION_COOKIE}={token}; HttpOnly; SameSite=Strict; Path=/; Max-Age={max_age}");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}
