//! Per-lobby game state and the snapshots cut from it.

use std::collections::BTreeMap;

use hostrelay_protocol::{
    GameObjectState, GamePlayerState, GameServerMessage, LobbyId, ObjectId,
    PlayerStateSnapshot, UserId,
};

/// The live state of one running game.
///
/// Player poses come from each player; object states come from the host
/// only. `BTreeMap` keeps snapshot order stable between ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub lobby_id: LobbyId,
    pub host_id: UserId,
    pub players: BTreeMap<UserId, GamePlayerState>,
    pub objects: BTreeMap<ObjectId, GameObjectState>,
}

impl GameState {
    /// Seeds a game with every participant at the origin, unrotated.
    pub fn new(lobby_id: LobbyId, host_id: UserId, player_ids: &[UserId]) -> Self {
        let players = player_ids
            .iter()
            .copied()
            .chain(std::iter::once(host_id))
            .map(|id| (id, GamePlayerState::default()))
            .collect();
        Self {
            lobby_id,
            host_id,
            players,
            objects: BTreeMap::new(),
        }
    }

    /// An owned copy of everything a client needs to render this tick.
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            lobby_id: self.lobby_id,
            player_states: self
                .players
                .iter()
                .map(|(id, state)| PlayerStateSnapshot {
                    id: *id,
                    position: state.position,
                    orientation: state.orientation,
                })
                .collect(),
            object_states: self.objects.values().copied().collect(),
        }
    }
}

/// A point-in-time copy of one game, detached from the authority's lock.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSnapshot {
    pub lobby_id: LobbyId,
    pub player_states: Vec<PlayerStateSnapshot>,
    pub object_states: Vec<GameObjectState>,
}

impl GameSnapshot {
    /// The `GameStateUpdate` message for this snapshot.
    pub fn into_message(self) -> GameServerMessage {
        GameServerMessage::GameStateUpdate {
            player_states: self.player_states,
            object_states: self.object_states,
        }
    }
}
