//! Error types for the lobby layer.

use hostrelay_protocol::{LobbyId, UserId};
use hostrelay_session::StoreError;

/// Errors that can occur during lobby operations.
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    /// The lobby does not exist, or the user is in no lobby.
    #[error("lobby not found")]
    NotFound,

    /// The user is already a member of some lobby.
    #[error("user {0} is already in a lobby")]
    AlreadyExists(UserId),

    /// The lobby isn't accepting this operation in its current status
    /// (joining or starting a lobby that is already in game).
    #[error("lobby {0} is closed")]
    LobbyClosed(LobbyId),

    /// Not six characters from the join-code alphabet.
    #[error("invalid join code {0:?}")]
    InvalidJoinCode(String),

    /// Only the host (or an admin, where noted) may do this.
    #[error("user {0} is not allowed to do this")]
    Forbidden(UserId),

    #[error(transparent)]
    Store(#[from] StoreError),
}
