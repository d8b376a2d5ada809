//! Unified error type for the Hostrelay server.

use hostrelay_game::GameError;
use hostrelay_lobby::LobbyError;
use hostrelay_protocol::ProtocolError;
use hostrelay_session::SessionError;
use hostrelay_transport::TransportError;

/// Everything that can go wrong in the server crate. Sub-crate errors
/// convert with `?`.
#[derive(Debug, thiserror::Error)]
pub enum HostrelayError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Undecodable frame or unencodable message.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Lobby(#[from] LobbyError),

    #[error(transparent)]
    Game(#[from] GameError),

    /// Binding or serving the HTTP listener failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// An environment variable held an unusable value.
    #[error("invalid configuration: {0}")]
    Config(String),
}
