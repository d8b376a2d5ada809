//! Error-to-status mapping for the REST API.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hostrelay_lobby::LobbyError;
use hostrelay_session::SessionError;
use serde_json::json;

/// Every failure an API handler can return. Rendered as
/// `{"error": "<message>"}` with the matching status.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Lobby(#[from] LobbyError),

    /// The request body or query was unusable.
    #[error("{0}")]
    BadRequest(String),

    /// Authenticated, but not allowed to touch this resource.
    #[error("{0}")]
    Forbidden(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Session(e) => match e {
                SessionError::NotFound(_) => StatusCode::NOT_FOUND,
                SessionError::AlreadyExists(_) => StatusCode::CONFLICT,
                SessionError::Unauthorized | SessionError::MalformedToken => {
                    StatusCode::UNAUTHORIZED
                }
                SessionError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Lobby(e) => match e {
                LobbyError::NotFound => StatusCode::NOT_FOUND,
                LobbyError::AlreadyExists(_) => StatusCode::CONFLICT,
                LobbyError::LobbyClosed(_) | LobbyError::InvalidJoinCode(_) => {
                    StatusCode::BAD_REQUEST
                }
                LobbyError::Forbidden(_) => StatusCode::FORBIDDEN,
                LobbyError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
            "internal error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
