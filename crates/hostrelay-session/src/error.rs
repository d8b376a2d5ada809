//! Error types for the session layer.

/// Failures reported by a persistence collaborator.
///
/// Shared by every store trait in the workspace (accounts, sessions and
/// lobbies), so the layers above can tell "the row was already there"
/// apart from "the backend is down".
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write (duplicate username,
    /// duplicate join code, ...).
    #[error("unique constraint violated: {0}")]
    Conflict(String),

    /// The backing store could not be reached or failed mid-operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors returned by [`SessionAuthority`](crate::SessionAuthority) and
/// [`SessionValidator`](crate::SessionValidator).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The referenced user or session does not exist.
    ///
    /// Login failures also land here, whether the username was unknown
    /// or the password was wrong, so callers can't tell which accounts exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Registration with a username that is already taken.
    #[error("username {0:?} is already taken")]
    AlreadyExists(String),

    /// No usable session: missing token, or the session is revoked or
    /// past its expiry.
    #[error("unauthorized")]
    Unauthorized,

    /// The presented token isn't 64 hex characters. Rejected before any
    /// store lookup.
    #[error("malformed session token")]
    MalformedToken,

    #[error(transparent)]
    Store(#[from] StoreError),
}
