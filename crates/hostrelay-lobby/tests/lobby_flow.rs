//! Integration tests for the lobby lifecycle.

use std::collections::HashSet;

use hostrelay_lobby::{InMemoryLobbyStore, LobbyAuthority, LobbyError, LobbyStatus};
use hostrelay_protocol::UserId;

fn authority() -> LobbyAuthority<InMemoryLobbyStore> {
    LobbyAuthority::new(InMemoryLobbyStore::new())
}

// =========================================================================
// Create / join
// =========================================================================

#[tokio::test]
async fn test_create_and_join_flow_enforces_single_membership() {
    let auth = authority();
    let alice = UserId(1);
    let bob = UserId(2);

    let lobby = auth.create_lobby(alice).await.expect("create");
    assert_eq!(lobby.join_code.as_str().len(), 6);
    assert_eq!(lobby.status, LobbyStatus::Open);
    assert_eq!(lobby.members, vec![alice]);
    assert_eq!(lobby.host_id, alice);

    let joined = auth
        .join_lobby(bob, lobby.join_code.as_str())
        .await
        .expect("join");
    assert_eq!(joined.members, vec![alice, bob]);

    let again = auth.join_lobby(bob, lobby.join_code.as_str()).await;
    assert!(matches!(again, Err(LobbyError::AlreadyExists(id)) if id == bob));

    let second = auth.create_lobby(alice).await;
    assert!(matches!(second, Err(LobbyError::AlreadyExists(_))));
}

#[tokio::test]
async fn test_join_lobby_lowercase_code_is_accepted() {
    let auth = authority();
    let lobby = auth.create_lobby(UserId(1)).await.unwrap();

    let code = lobby.join_code.as_str().to_ascii_lowercase();
    let joined = auth.join_lobby(UserId(2), &code).await.unwrap();
    assert_eq!(joined.id, lobby.id);
}

#[tokio::test]
async fn test_join_lobby_invalid_code_returns_invalid_join_code() {
    let auth = authority();
    let result = auth.join_lobby(UserId(2), "ab!").await;
    assert!(matches!(result, Err(LobbyError::InvalidJoinCode(_))));
}

#[tokio::test]
async fn test_join_lobby_unknown_code_returns_not_found() {
    let auth = authority();
    let lobby = auth.create_lobby(UserId(1)).await.unwrap();
    let unused = if lobby.join_code.as_str() == "AAAAAA" {
        "BBBBBB"
    } else {
        "AAAAAA"
    };

    let result = auth.join_lobby(UserId(2), unused).await;
    assert!(matches!(result, Err(LobbyError::NotFound)));
}

#[tokio::test]
async fn test_create_lobby_many_lobbies_get_unique_codes() {
    let auth = authority();
    let mut codes = HashSet::new();

    for user in 1..=200 {
        let lobby = auth.create_lobby(UserId(user)).await.unwrap();
        assert!(codes.insert(lobby.join_code.clone()), "duplicate code");
    }
    assert_eq!(auth.store().len().await, 200);
}

// =========================================================================
// Leave / disband
// =========================================================================

#[tokio::test]
async fn test_leave_lobby_not_a_member_returns_not_found() {
    let auth = authority();
    let result = auth.leave_lobby(UserId(9)).await;
    assert!(matches!(result, Err(LobbyError::NotFound)));
}

#[tokio::test]
async fn test_disband_lobby_twice_returns_not_found_second_time() {
    let auth = authority();
    let lobby = auth.create_lobby(UserId(1)).await.unwrap();

    auth.disband_lobby(lobby.id).await.expect("first disband");
    let again = auth.disband_lobby(lobby.id).await;
    assert!(matches!(again, Err(LobbyError::NotFound)));

    // Membership is released with the lobby.
    assert!(auth.lobby_of_user(UserId(1)).await.unwrap().is_none());
    assert!(auth.create_lobby(UserId(1)).await.is_ok());
}

// =========================================================================
// Reads
// =========================================================================

#[tokio::test]
async fn test_find_by_code_and_lobby_of_user_resolve_same_lobby() {
    let auth = authority();
    let lobby = auth.create_lobby(UserId(1)).await.unwrap();

    let by_code = auth.find_by_code(lobby.join_code.as_str()).await.unwrap();
    let by_user = auth.lobby_of_user(UserId(1)).await.unwrap();

    assert_eq!(by_code.as_ref(), Some(&lobby));
    assert_eq!(by_user.as_ref(), Some(&lobby));
    assert_eq!(auth.get_lobby(lobby.id).await.unwrap(), lobby);
}
