//! Realtime channel messages.
//!
//! Hostrelay runs two logically separate realtime protocols over
//! WebSocket, both grouped by [`LobbyId`](crate::LobbyId):
//!
//! - the **lobby channel** (`/hubs/lobby`): membership events and the
//!   host's `StartGame` call;
//! - the **game channel** (`/hubs/game`): pose relays up, snapshots down.
//!
//! Every enum here is internally tagged (`#[serde(tag = "type")]`), so a
//! message looks like `{ "type": "PlayerLeft", "id": 7 }`. Multi-word
//! fields use camelCase (`rename_all_fields`) because the browser client
//! consumes them directly.

use serde::{Deserialize, Serialize};

use crate::{
    GameObjectState, ImpulseAction, PlayerStateSnapshot, Quat, UserId, Vec3,
};

// ---------------------------------------------------------------------------
// Lobby channel
// ---------------------------------------------------------------------------

/// Client → server calls on the lobby channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LobbyClientMessage {
    /// Host only: flip the lobby to InGame and seed the game store.
    StartGame,
}

/// Server → client events on the lobby channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum LobbyServerMessage {
    /// A member opened their lobby connection.
    PlayerJoined { id: UserId },

    /// A member left the lobby.
    PlayerLeft { id: UserId },

    /// The host started the game; clients should move to the game channel.
    GameStarted,

    /// The lobby no longer exists.
    LobbyDisbanded,

    /// The last invocation failed. There is deliberately no error code:
    /// clients treat any failed invocation the same way.
    Error { message: String },
}

// ---------------------------------------------------------------------------
// Game channel
// ---------------------------------------------------------------------------

/// Client → server calls on the game channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum GameClientMessage {
    /// The sender's own avatar pose. Applied to the caller's entry only.
    PlayerStateUpdate { position: Vec3, orientation: Quat },

    /// Ground truth for world objects. Dropped unless the sender is host.
    WorldStateUpdate { object_states: Vec<GameObjectState> },

    /// Impulses for the host to apply in its local simulation.
    GamePlayerImpulseAction { actions: Vec<ImpulseAction> },
}

/// Server → client events on the game channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum GameServerMessage {
    /// Full snapshot of one game, pushed every broadcast tick.
    GameStateUpdate {
        player_states: Vec<PlayerStateSnapshot>,
        object_states: Vec<GameObjectState>,
    },

    /// A participant dropped out of the game.
    PlayerLeft { id: UserId },

    /// The game ended; the lobby is open again.
    GameStopped,

    /// Relayed to the host only.
    GamePlayerImpulseAction {
        from: UserId,
        actions: Vec<ImpulseAction>,
    },

    /// The last invocation failed.
    Error { message: String },
}
