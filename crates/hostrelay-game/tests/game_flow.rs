//! Integration tests for the game state store.

use hostrelay_game::{GameAuthority, GameError};
use hostrelay_protocol::{GamePlayerState, LobbyId, Quat, UserId, Vec3};

const LOBBY: LobbyId = LobbyId(10);
const HOST: UserId = UserId(1);
const GUEST: UserId = UserId(2);

fn pose(x: f32, y: f32, z: f32) -> GamePlayerState {
    GamePlayerState {
        position: Vec3::new(x, y, z),
        orientation: Quat::IDENTITY,
    }
}

#[test]
fn test_start_game_seeds_zeroed_players_and_applies_targeted_update() {
    let mut games = GameAuthority::new();
    games.start_game(LOBBY, HOST, &[HOST, GUEST]);

    let game = games.game_state_by_user(GUEST).expect("guest is indexed");
    assert_eq!(game.players.len(), 2);
    assert!(game.objects.is_empty());
    for state in game.players.values() {
        assert_eq!(*state, GamePlayerState::default());
    }

    games.update_player_state(LOBBY, GUEST, pose(1.0, 2.0, 3.0));

    let game = games.game_state(LOBBY).unwrap();
    assert_eq!(game.players[&GUEST].position, Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(game.players[&HOST].position, Vec3::ZERO);
}

#[test]
fn test_update_player_state_unknown_player_is_noop() {
    let mut games = GameAuthority::new();
    games.start_game(LOBBY, HOST, &[HOST, GUEST]);
    let before = games.game_state(LOBBY).unwrap().clone();

    games.update_player_state(LOBBY, UserId(99), pose(5.0, 5.0, 5.0));
    games.update_player_state(LobbyId(99), HOST, pose(5.0, 5.0, 5.0));

    assert_eq!(games.game_state(LOBBY).unwrap(), &before);
}

#[test]
fn test_stop_game_twice_returns_not_found_without_side_effects() {
    let mut games = GameAuthority::new();
    games.start_game(LOBBY, HOST, &[HOST, GUEST]);
    games.start_game(LobbyId(11), UserId(3), &[UserId(3)]);

    let stopped = games.stop_game(LOBBY).expect("first stop");
    assert_eq!(stopped.host_id, HOST);
    assert_eq!(games.lobby_id_by_user(HOST), None);
    assert_eq!(games.lobby_id_by_user(GUEST), None);

    let again = games.stop_game(LOBBY);
    assert!(matches!(again, Err(GameError::NotFound(id)) if id == LOBBY));

    // The other game is untouched.
    assert_eq!(games.len(), 1);
    assert_eq!(games.lobby_id_by_user(UserId(3)), Some(LobbyId(11)));
    assert_eq!(games.game_states().count(), 1);
}
