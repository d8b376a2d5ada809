//! # Hostrelay
//!
//! Host-authoritative lobby and realtime relay server.
//!
//! Players sign in and gather in lobbies over a REST API, then talk over
//! two WebSocket channels: `/hubs/lobby` until the host starts the game,
//! `/hubs/game` afterwards. The host's client simulates the world; the
//! server relays poses and impulses and pushes a snapshot of every running
//! game to its players 64 times a second.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hostrelay::prelude::*;
//!
//! # async fn start() -> Result<(), HostrelayError> {
//! let server = HostrelayServer::<InMemoryStore, InMemoryLobbyStore>::builder()
//!     .http_addr("0.0.0.0:8080")
//!     .realtime_addr("0.0.0.0:8081")
//!     .build(InMemoryStore::new(), InMemoryLobbyStore::new())
//!     .await?;
//! server.run().await
//! # }
//! ```

mod broadcaster;
mod config;
mod error;
mod game_hub;
mod groups;
mod handler;
mod http;
mod lobby_hub;
mod server;

pub use broadcaster::{BROADCAST_TICK_RATE_HZ, TickBroadcaster};
pub use config::ServerConfig;
pub use error::HostrelayError;
pub use groups::{GroupRegistry, Outbound};
pub use handler::{GAME_HUB_PATH, LOBBY_HUB_PATH};
pub use http::ApiError;
pub use server::{HostrelayServer, HostrelayServerBuilder, SESSION_SWEEP_INTERVAL};

/// Convenience re-exports for common usage.
///
/// ```rust
/// use hostrelay::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        BROADCAST_TICK_RATE_HZ, GAME_HUB_PATH, HostrelayError, HostrelayServer,
        HostrelayServerBuilder, LOBBY_HUB_PATH, ServerConfig, TickBroadcaster,
    };

    pub use hostrelay_game::{GameAuthority, GameError, GameSnapshot, GameState};
    pub use hostrelay_lobby::{
        InMemoryLobbyStore, JoinCode, Lobby, LobbyAuthority, LobbyError, LobbyStatus, LobbyStore,
    };
    pub use hostrelay_protocol::{
        Codec, GameClientMessage, GameObjectState, GamePlayerState, GameServerMessage,
        ImpulseAction, JsonCodec, LobbyClientMessage, LobbyId, LobbyServerMessage, ObjectId,
        PlayerStateSnapshot, Quat, UserId, Vec3,
    };
    pub use hostrelay_session::{
        AccountStore, InMemoryStore, LoginResponse, PublicUser, Role, SessionAuthority,
        SessionConfig, SessionError, SessionValidator, StoreError,
    };
}
