//! Wire vocabulary for Hostrelay.
//!
//! This crate defines what every other layer agrees on:
//!
//! - **Identity types** ([`UserId`], [`LobbyId`], [`SessionId`],
//!   [`ObjectId`]) used by the authorities and on the wire.
//! - **World-state types** ([`GamePlayerState`], [`GameObjectState`], ...)
//!   stored by the game authority and pushed in snapshots.
//! - **Channel messages** for the lobby and game channels.
//! - **Codec** ([`Codec`], [`JsonCodec`]) turning messages into bytes.
//!
//! ```text
//! Transport (bytes) → Protocol (typed messages) → Hubs (lobby / game)
//! ```

mod codec;
mod error;
mod messages;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use messages::{
    GameClientMessage, GameServerMessage, LobbyClientMessage, LobbyServerMessage,
};
pub use types::{
    GameObjectState, GamePlayerState, ImpulseAction, LobbyId, ObjectId,
    PlayerStateSnapshot, Quat, SessionId, UserId, Vec3,
};
