//! REST API tests, driven through the router without a socket.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use hostrelay::prelude::*;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tower::ServiceExt;

// =========================================================================
// Helpers
// =========================================================================

struct Api {
    router: Router,
    sessions: Arc<SessionAuthority<InMemoryStore>>,
    lobbies: Arc<LobbyAuthority<InMemoryLobbyStore>>,
    games: Arc<Mutex<GameAuthority>>,
}

async fn api() -> Api {
    let server = HostrelayServer::<InMemoryStore, InMemoryLobbyStore>::builder()
        .http_addr("127.0.0.1:0")
        .realtime_addr("127.0.0.1:0")
        .secure_cookies(false)
        .build(InMemoryStore::new(), InMemoryLobbyStore::new())
        .await
        .expect("server should build");
    Api {
        router: server.router(),
        sessions: server.sessions(),
        lobbies: server.lobbies(),
        games: server.games(),
    }
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

impl Api {
    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> Reply {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        Reply {
            status,
            headers,
            body,
        }
    }

    /// Registers and logs in over HTTP. Returns (user id, token).
    async fn sign_in(&self, username: &str) -> (u64, String) {
        let reply = self
            .call(
                Method::POST,
                "/api/sessions/register",
                None,
                Some(json!({ "username": username, "password": "hunter2" })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED);
        let login = self.login(username).await;
        assert_eq!(login.status, StatusCode::OK);
        (
            login.body["user"]["id"].as_u64().unwrap(),
            login.body["token"].as_str().unwrap().to_string(),
        )
    }

    async fn login(&self, username: &str) -> Reply {
        self.call(
            Method::POST,
            "/api/sessions/login",
            None,
            Some(json!({ "username": username, "password": "hunter2" })),
        )
        .await
    }

    /// Creates a lobby as `token`. Returns (lobby id, join code).
    async fn create_lobby(&self, token: &str) -> (u64, String) {
        let reply = self.call(Method::POST, "/api/lobbies", Some(token), None).await;
        assert_eq!(reply.status, StatusCode::CREATED);
        (
            reply.body["id"].as_u64().unwrap(),
            reply.body["joinCode"].as_str().unwrap().to_string(),
        )
    }

    async fn join(&self, token: &str, lobby_id: u64, code: &str) -> Reply {
        self.call(
            Method::POST,
            &format!("/api/lobbies/{lobby_id}/users"),
            Some(token),
            Some(json!(code)),
        )
        .await
    }
}

// =========================================================================
// Sessions
// =========================================================================

#[tokio::test]
async fn test_register_duplicate_username_conflicts() {
    let api = api().await;
    let body = json!({ "username": "ada", "password": "pw", "displayName": "Ada" });

    let first = api
        .call(Method::POST, "/api/sessions/register", None, Some(body.clone()))
        .await;
    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(first.body["displayName"], "Ada");
    assert_eq!(first.body["roles"], json!(["player"]));
    assert!(first.body.get("passwordHash").is_none());

    let second = api
        .call(Method::POST, "/api/sessions/register", None, Some(body))
        .await;
    assert_eq!(second.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_empty_password_is_bad_request() {
    let api = api().await;
    let reply = api
        .call(
            Method::POST,
            "/api/sessions/register",
            None,
            Some(json!({ "username": "ada", "password": "" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(reply.body["error"].is_string());
}

#[tokio::test]
async fn test_login_sets_http_only_cookie() {
    let api = api().await;
    let (_, token) = api.sign_in("ada").await;
    let login = api.login("ada").await;

    let cookie = login.headers[SET_COOKIE].to_str().unwrap();
    let new_token = login.body["token"].as_str().unwrap();
    assert_ne!(new_token, token);
    assert!(cookie.starts_with(&format!("session_token={new_token};")));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(cookie.contains("Max-Age=3600"));
    assert!(!cookie.contains("Secure"));
}

#[tokio::test]
async fn test_login_unknown_user_not_found() {
    let api = api().await;
    let reply = api.login("nobody").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_profile_without_token_unauthorized() {
    let api = api().await;
    let reply = api.call(Method::GET, "/api/sessions/profile", None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = api
        .call(Method::GET, "/api/sessions/profile", Some("not-a-token"), None)
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_profile_cookie_authenticates() {
    let api = api().await;
    let (user_id, token) = api.sign_in("ada").await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/sessions/profile")
        .header(COOKIE, format!("theme=dark; session_token={token}"))
        .body(Body::empty())
        .unwrap();
    let reply = api.send(request).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["id"].as_u64(), Some(user_id));
    assert_eq!(reply.body["username"], "ada");
}

#[tokio::test]
async fn test_update_profile_changes_display_name() {
    let api = api().await;
    let (_, token) = api.sign_in("ada").await;

    let reply = api
        .call(
            Method::PUT,
            "/api/sessions/profile",
            Some(&token),
            Some(json!({ "displayName": "Countess" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["displayName"], "Countess");

    let reply = api
        .call(Method::GET, "/api/sessions/profile", Some(&token), None)
        .await;
    assert_eq!(reply.body["displayName"], "Countess");
}

#[tokio::test]
async fn test_logout_revokes_token_and_clears_cookie() {
    let api = api().await;
    let (_, token) = api.sign_in("ada").await;

    let reply = api
        .call(Method::POST, "/api/sessions/logout", Some(&token), None)
        .await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);
    let cookie = reply.headers[SET_COOKIE].to_str().unwrap();
    assert!(cookie.contains("Max-Age=0"));

    let reply = api
        .call(Method::GET, "/api/sessions/profile", Some(&token), None)
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

// =========================================================================
// Lobbies
// =========================================================================

#[tokio::test]
async fn test_create_lobby_twice_conflicts() {
    let api = api().await;
    let (user_id, token) = api.sign_in("host").await;

    let reply = api.call(Method::POST, "/api/lobbies", Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["hostId"].as_u64(), Some(user_id));
    assert_eq!(reply.body["status"], "Open");
    assert_eq!(reply.body["members"], json!([user_id]));

    let reply = api.call(Method::POST, "/api/lobbies", Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_find_by_code_returns_zero_or_one() {
    let api = api().await;
    let (_, token) = api.sign_in("host").await;
    let (lobby_id, code) = api.create_lobby(&token).await;

    let reply = api
        .call(
            Method::GET,
            &format!("/api/lobbies?code={}", code.to_lowercase()),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body.as_array().unwrap().len(), 1);
    assert_eq!(reply.body[0]["id"].as_u64(), Some(lobby_id));

    let reply = api
        .call(Method::GET, "/api/lobbies?code=nope", Some(&token), None)
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, json!([]));
}

#[tokio::test]
async fn test_get_lobby_unknown_not_found() {
    let api = api().await;
    let (_, token) = api.sign_in("host").await;
    let reply = api
        .call(Method::GET, "/api/lobbies/999", Some(&token), None)
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_join_lobby_success_then_conflict() {
    let api = api().await;
    let (host_id, host_token) = api.sign_in("host").await;
    let (player_id, player_token) = api.sign_in("player").await;
    let (lobby_id, code) = api.create_lobby(&host_token).await;

    let reply = api.join(&player_token, lobby_id, &code).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["members"], json!([host_id, player_id]));

    let reply = api.join(&player_token, lobby_id, &code).await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_join_lobby_bad_codes_are_bad_requests() {
    let api = api().await;
    let (_, host_a) = api.sign_in("host-a").await;
    let (_, host_b) = api.sign_in("host-b").await;
    let (_, player_token) = api.sign_in("player").await;
    let (lobby_a, _) = api.create_lobby(&host_a).await;
    let (_, code_b) = api.create_lobby(&host_b).await;

    let reply = api.join(&player_token, lobby_a, "O0O0O0").await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = api.join(&player_token, lobby_a, &code_b).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_disband_lobby_requires_host_or_admin() {
    let api = api().await;
    let (_, host_token) = api.sign_in("host").await;
    let (_, other_token) = api.sign_in("other").await;
    let (lobby_id, _) = api.create_lobby(&host_token).await;
    let uri = format!("/api/lobbies/{lobby_id}");

    let reply = api.call(Method::DELETE, &uri, Some(&other_token), None).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let reply = api.call(Method::DELETE, &uri, Some(&host_token), None).await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);

    let reply = api.call(Method::GET, &uri, Some(&host_token), None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_disband_lobby_admin_may_disband_any() {
    let api = api().await;
    let (_, host_token) = api.sign_in("host").await;
    api.sessions
        .register("root", "hunter2", "Root", &[Role::Player, Role::Admin])
        .await
        .unwrap();
    let admin_token = api.login("root").await.body["token"]
        .as_str()
        .unwrap()
        .to_string();
    let (lobby_id, _) = api.create_lobby(&host_token).await;

    let reply = api
        .call(
            Method::DELETE,
            &format!("/api/lobbies/{lobby_id}"),
            Some(&admin_token),
            None,
        )
        .await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_remove_member_permissions_and_outcomes() {
    let api = api().await;
    let (host_id, host_token) = api.sign_in("host").await;
    let (player_id, player_token) = api.sign_in("player").await;
    let (_, stranger_token) = api.sign_in("stranger").await;
    let (lobby_id, code) = api.create_lobby(&host_token).await;
    api.join(&player_token, lobby_id, &code).await;

    let uri = format!("/api/lobbies/{lobby_id}/users/{player_id}");
    let reply = api.call(Method::DELETE, &uri, Some(&stranger_token), None).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let reply = api.call(Method::DELETE, &uri, Some(&host_token), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["members"], json!([host_id]));

    // No longer a member.
    let reply = api.call(Method::DELETE, &uri, Some(&host_token), None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    // The host leaving disbands the lobby.
    let reply = api
        .call(
            Method::DELETE,
            &format!("/api/lobbies/{lobby_id}/users/{host_id}"),
            Some(&host_token),
            None,
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    let reply = api
        .call(Method::GET, &format!("/api/lobbies/{lobby_id}"), Some(&host_token), None)
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_remove_member_in_game_leaves_game_and_last_removal_stops_it() {
    let api = api().await;
    let (host_id, host_token) = api.sign_in("host").await;
    let (first_id, first_token) = api.sign_in("first").await;
    let (second_id, second_token) = api.sign_in("second").await;
    let (lobby_id, code) = api.create_lobby(&host_token).await;
    api.join(&first_token, lobby_id, &code).await;
    api.join(&second_token, lobby_id, &code).await;

    let lobby = api.lobbies.start_game(UserId(host_id)).await.unwrap();
    api.games
        .lock()
        .await
        .start_game(lobby.id, lobby.host_id, &lobby.members);

    let uri = format!("/api/lobbies/{lobby_id}/users/{first_id}");
    let reply = api.call(Method::DELETE, &uri, Some(&host_token), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    {
        let games = api.games.lock().await;
        assert!(games.game_state_by_user(UserId(first_id)).is_none());
        let game = games.game_state(LobbyId(lobby_id)).expect("game still running");
        assert_eq!(game.players.len(), 2);
    }

    let uri = format!("/api/lobbies/{lobby_id}/users/{second_id}");
    let reply = api.call(Method::DELETE, &uri, Some(&host_token), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(api.games.lock().await.game_state(LobbyId(lobby_id)).is_none());

    let lobby = api.lobbies.get_lobby(LobbyId(lobby_id)).await.unwrap();
    assert_eq!(lobby.status, LobbyStatus::Open);
    assert_eq!(lobby.members, vec![UserId(host_id)]);
}

#[tokio::test]
async fn test_remove_member_of_other_lobby_not_found() {
    let api = api().await;
    let (_, host_token) = api.sign_in("host").await;
    let (other_id, other_token) = api.sign_in("other").await;
    let (lobby_id, _) = api.create_lobby(&host_token).await;
    let (other_lobby, _) = api.create_lobby(&other_token).await;

    let reply = api
        .call(
            Method::DELETE,
            &format!("/api/lobbies/{lobby_id}/users/{other_id}"),
            Some(&other_token),
            None,
        )
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert!(api.lobbies.get_lobby(LobbyId(other_lobby)).await.is_ok());
}
