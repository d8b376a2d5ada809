//! The lobby record and its status machine.

use hostrelay_protocol::{LobbyId, UserId};
use serde::{Deserialize, Serialize};

use crate::JoinCode;

// ---------------------------------------------------------------------------
// LobbyStatus
// ---------------------------------------------------------------------------

/// Where a lobby is in its life.
///
/// ```text
/// Open ──(start_game)──→ InGame ──(open_lobby)──→ Open
///   │                       │
///   └──────(disband)────────┴──→ [removed]
/// ```
///
/// There is no `Closed` variant: a disbanded lobby is simply gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LobbyStatus {
    Open,
    InGame,
}

impl LobbyStatus {
    /// Returns `true` if new members may join.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Open)
    }
}

impl std::fmt::Display for LobbyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "Open"),
            Self::InGame => write!(f, "InGame"),
        }
    }
}

// ---------------------------------------------------------------------------
// Lobby
// ---------------------------------------------------------------------------

/// A matchmaking lobby.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lobby {
    pub id: LobbyId,
    pub join_code: JoinCode,
    pub host_id: UserId,
    pub status: LobbyStatus,
    /// Members in join order, host first. Never contains duplicates.
    pub members: Vec<UserId>,
}

impl Lobby {
    pub fn is_member(&self, user_id: UserId) -> bool {
        self.members.contains(&user_id)
    }

    pub fn is_host(&self, user_id: UserId) -> bool {
        self.host_id == user_id
    }

    pub(crate) fn add_member(&mut self, user_id: UserId) {
        if !self.is_member(user_id) {
            self.members.push(user_id);
        }
    }

    pub(crate) fn remove_member(&mut self, user_id: UserId) -> bool {
        let before = self.members.len();
        self.members.retain(|m| *m != user_id);
        self.members.len() != before
    }
}
