use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderName;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::middleware::Next;
use axum::response::Response;
use hostrelay_lobby::LobbyStore;
use hostrelay_session::{AccountStore, Credentials};

use super::ApiError;
use crate::server::ServerState;

/// Rejects the request with 401 unless it carries a live session. On
/// success the [`RequestIdentity`](hostrelay_session::RequestIdentity) is
/// placed in the request extensions.
pub(crate) async fn require_session<S: AccountStore, L: LobbyStore>(
    State(state): State<Arc<ServerState<S, L>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let cookie = header_value(&request, COOKIE);
    let authorization = header_value(&request, AUTHORIZATION);
    let credentials = Credentials {
        cookie: cookie.as_deref(),
        authorization: authorization.as_deref(),
    };
    let identity = state.validator.validate(credentials).await?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

fn header_value(request: &Request, name: HeaderName) -> Option<String> {
    request
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
