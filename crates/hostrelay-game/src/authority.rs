//! The game authority: every running game, keyed by lobby.
//!
//! # Concurrency note
//!
//! `GameAuthority` is NOT thread-safe by itself. The server owns exactly
//! one, behind a `tokio::sync::Mutex`, so start, stop and every update are
//! mutually exclusive. The tick broadcaster takes the same lock only long
//! enough to copy out [`snapshots`](GameAuthority::snapshots).

use std::collections::HashMap;

use hostrelay_protocol::{GameObjectState, GamePlayerState, LobbyId, UserId};

use crate::{GameError, GameSnapshot, GameState};

/// Holds the state of every running game.
#[derive(Debug, Default)]
pub struct GameAuthority {
    games: HashMap<LobbyId, GameState>,

    /// Maps each participant to the game they're in. Kept in sync with
    /// `games`: a user appears here iff they have an entry in that game's
    /// player map.
    players: HashMap<UserId, LobbyId>,
}

impl GameAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a game for `lobby_id` with zeroed entries for every player,
    /// host included.
    ///
    /// A game already running for this lobby is replaced.
    pub fn start_game(&mut self, lobby_id: LobbyId, host_id: UserId, player_ids: &[UserId]) {
        if self.games.contains_key(&lobby_id) {
            tracing::debug!(%lobby_id, "replacing running game");
            // Present, so this can't fail.
            let _ = self.stop_game(lobby_id);
        }

        let state = GameState::new(lobby_id, host_id, player_ids);
        for &player_id in state.players.keys() {
            // A participant can only be in one game at a time.
            if let Some(previous) = self.players.insert(player_id, lobby_id) {
                if let Some(game) = self.games.get_mut(&previous) {
                    game.players.remove(&player_id);
                }
            }
        }

        tracing::info!(%lobby_id, %host_id, players = state.players.len(), "game started");
        self.games.insert(lobby_id, state);
    }

    /// Overwrites `player_id`'s pose. Silently ignored if the game or the
    /// player's entry doesn't exist.
    pub fn update_player_state(
        &mut self,
        lobby_id: LobbyId,
        player_id: UserId,
        state: GamePlayerState,
    ) {
        if let Some(entry) = self
            .games
            .get_mut(&lobby_id)
            .and_then(|game| game.players.get_mut(&player_id))
        {
            *entry = state;
        }
    }

    /// Merges host-reported object states, creating entries on first sight.
    /// Ignored if the game doesn't exist.
    pub fn update_object_states(&mut self, lobby_id: LobbyId, states: &[GameObjectState]) {
        let Some(game) = self.games.get_mut(&lobby_id) else {
            return;
        };
        for state in states {
            game.objects.insert(state.id, *state);
        }
    }

    /// Drops a player from a game. Returns how many players remain, or
    /// `None` if there is no such game.
    pub fn remove_player(&mut self, lobby_id: LobbyId, player_id: UserId) -> Option<usize> {
        let game = self.games.get_mut(&lobby_id)?;
        if game.players.remove(&player_id).is_some() {
            self.players.remove(&player_id);
            tracing::info!(%lobby_id, %player_id, "player left game");
        }
        Some(game.players.len())
    }

    /// Ends a game and forgets its participants.
    ///
    /// # Errors
    /// [`GameError::NotFound`] if no game is running; nothing changes.
    pub fn stop_game(&mut self, lobby_id: LobbyId) -> Result<GameState, GameError> {
        let game = self
            .games
            .remove(&lobby_id)
            .ok_or(GameError::NotFound(lobby_id))?;

        for player_id in game.players.keys() {
            if self.players.get(player_id) == Some(&lobby_id) {
                self.players.remove(player_id);
            }
        }

        tracing::info!(%lobby_id, "game stopped");
        Ok(game)
    }

    // -- Reads --------------------------------------------------------------

    pub fn game_states(&self) -> impl Iterator<Item = &GameState> {
        self.games.values()
    }

    /// Owned snapshots of every running game.
    pub fn snapshots(&self) -> Vec<GameSnapshot> {
        self.games.values().map(GameState::snapshot).collect()
    }

    pub fn game_state(&self, lobby_id: LobbyId) -> Option<&GameState> {
        self.games.get(&lobby_id)
    }

    pub fn game_state_by_user(&self, user_id: UserId) -> Option<&GameState> {
        self.players
            .get(&user_id)
            .and_then(|lobby_id| self.games.get(lobby_id))
    }

    pub fn lobby_id_by_user(&self, user_id: UserId) -> Option<LobbyId> {
        self.players.get(&user_id).copied()
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostrelay_protocol::{ObjectId, Quat, Vec3};

    const LOBBY: LobbyId = LobbyId(1);

    fn object(id: u64, x: f32) -> GameObjectState {
        GameObjectState {
            id: ObjectId(id),
            position: Vec3::new(x, 0.0, 0.0),
            orientation: Quat::IDENTITY,
            size: Vec3::new(1.0, 1.0, 1.0),
        }
    }

    #[test]
    fn test_start_game_host_not_in_list_is_still_seeded() {
        let mut games = GameAuthority::new();
        games.start_game(LOBBY, UserId(1), &[UserId(2)]);

        let game = games.game_state(LOBBY).unwrap();
        assert_eq!(game.players.len(), 2);
        assert_eq!(games.lobby_id_by_user(UserId(1)), Some(LOBBY));
    }

    #[test]
    fn test_start_game_running_lobby_is_replaced() {
        let mut games = GameAuthority::new();
        games.start_game(LOBBY, UserId(1), &[UserId(1), UserId(2)]);
        games.update_object_states(LOBBY, &[object(1, 5.0)]);

        games.start_game(LOBBY, UserId(1), &[UserId(1), UserId(3)]);

        let game = games.game_state(LOBBY).unwrap();
        assert!(game.objects.is_empty());
        assert_eq!(games.lobby_id_by_user(UserId(2)), None);
        assert_eq!(games.lobby_id_by_user(UserId(3)), Some(LOBBY));
        assert_eq!(games.len(), 1);
    }

    #[test]
    fn test_update_object_states_merges_existing_entries() {
        let mut games = GameAuthority::new();
        games.start_game(LOBBY, UserId(1), &[UserId(1)]);

        games.update_object_states(LOBBY, &[object(1, 1.0), object(2, 2.0)]);
        games.update_object_states(LOBBY, &[object(1, 9.0)]);

        let game = games.game_state(LOBBY).unwrap();
        assert_eq!(game.objects.len(), 2);
        assert_eq!(game.objects[&ObjectId(1)].position.x, 9.0);
        assert_eq!(game.objects[&ObjectId(2)].position.x, 2.0);
    }

    #[test]
    fn test_remove_player_returns_remaining_count() {
        let mut games = GameAuthority::new();
        games.start_game(LOBBY, UserId(1), &[UserId(1), UserId(2), UserId(3)]);

        assert_eq!(games.remove_player(LOBBY, UserId(2)), Some(2));
        assert_eq!(games.lobby_id_by_user(UserId(2)), None);
        assert_eq!(games.remove_player(LobbyId(99), UserId(1)), None);
    }

    #[test]
    fn test_snapshot_contains_players_and_objects() {
        let mut games = GameAuthority::new();
        games.start_game(LOBBY, UserId(1), &[UserId(1), UserId(2)]);
        games.update_object_states(LOBBY, &[object(7, 0.5)]);

        let snapshots = games.snapshots();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].lobby_id, LOBBY);
        assert_eq!(snapshots[0].player_states.len(), 2);
        assert_eq!(snapshots[0].object_states[0].id, ObjectId(7));
    }
}
