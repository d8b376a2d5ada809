//! Error types for the game layer.

use hostrelay_protocol::LobbyId;

/// Errors returned by [`GameAuthority`](crate::GameAuthority).
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// No game is running for this lobby.
    #[error("no game running for lobby {0}")]
    NotFound(LobbyId),
}
