//! Identity and world-state types shared by every Hostrelay layer.
//!
//! Everything in here travels "on the wire" at some point: user and lobby
//! ids show up in REST responses and realtime events, and the pose types
//! make up the bulk of every `GameStateUpdate` snapshot.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a registered user.
///
/// Newtype wrapper around `u64` so a `UserId` can never be passed where a
/// `LobbyId` is expected. `#[serde(transparent)]` keeps the JSON form a
/// bare number: `UserId(42)` serializes as `42`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U-{}", self.0)
    }
}

/// A unique identifier for a lobby. Also the grouping key for both
/// realtime channels.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LobbyId(pub u64);

impl fmt::Display for LobbyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L-{}", self.0)
    }
}

/// A unique identifier for a persisted auth session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

/// Identifier of a simulated world object.
///
/// Object ids are minted by the host client, not the server. The server
/// only uses them as map keys when merging `WorldStateUpdate`s.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "O-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Math types
// ---------------------------------------------------------------------------

/// A 3D vector (position, size, or impulse).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// A rotation quaternion.
///
/// The server never does math on these; it only stores and forwards what
/// clients report. `Default` is the identity rotation, so a freshly seeded
/// player pose is "at the origin, facing forward".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quat {
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

// ---------------------------------------------------------------------------
// Game state types
// ---------------------------------------------------------------------------

/// The pose a client reports for its own avatar.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GamePlayerState {
    pub position: Vec3,
    pub orientation: Quat,
}

/// A player's pose tagged with its owner, as sent in snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerStateSnapshot {
    pub id: UserId,
    pub position: Vec3,
    pub orientation: Quat,
}

/// Ground truth for one world object, published by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GameObjectState {
    pub id: ObjectId,
    pub position: Vec3,
    pub orientation: Quat,
    pub size: Vec3,
}

/// An impulse a non-host player wants applied to a world object.
///
/// The server relays these to the host untouched; the host's simulation
/// decides what actually happens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpulseAction {
    pub object_id: ObjectId,
    pub impulse: Vec3,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_display_with_prefix() {
        assert_eq!(UserId(7).to_string(), "U-7");
        assert_eq!(LobbyId(3).to_string(), "L-3");
        assert_eq!(SessionId(9).to_string(), "S-9");
        assert_eq!(ObjectId(1).to_string(), "O-1");
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let json = serde_json::to_string(&UserId(42)).unwrap();
        assert_eq!(json, "42");
        let id: LobbyId = serde_json::from_str("5").unwrap();
        assert_eq!(id, LobbyId(5));
    }

    #[test]
    fn test_player_state_default_is_origin_identity() {
        let state = GamePlayerState::default();
        assert_eq!(state.position, Vec3::ZERO);
        assert_eq!(state.orientation, Quat::IDENTITY);
    }

    #[test]
    fn test_impulse_action_uses_camel_case_fields() {
        let action = ImpulseAction {
            object_id: ObjectId(2),
            impulse: Vec3::new(1.0, 0.0, 0.0),
        };
        let json = serde_json::to_value(action).unwrap();
        assert_eq!(json["objectId"], 2);
    }
}
