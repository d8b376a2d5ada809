//! End-to-end account and session lifecycle through the public API.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use hostrelay_protocol::{SessionId, UserId};
use hostrelay_session::{
    AuthSession, Credentials, InMemoryStore, NewSession, NewUser, Role, SESSION_COOKIE,
    SessionAuthority, SessionConfig, SessionError, SessionStore, SessionValidator, StoreError,
    User, UserStore,
};

fn setup() -> (Arc<SessionAuthority<InMemoryStore>>, SessionValidator<InMemoryStore>) {
    let authority = Arc::new(SessionAuthority::new(
        InMemoryStore::new(),
        SessionConfig::default(),
    ));
    let validator = SessionValidator::new(Arc::clone(&authority));
    (authority, validator)
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

// =========================================================================
// Registration
// =========================================================================

#[tokio::test]
async fn test_register_duplicate_username_returns_already_exists() {
    let (auth, _) = setup();

    let alice = auth
        .register("alice", "p1", "Alice", &[Role::Player])
        .await
        .expect("first register should succeed");
    assert_eq!(alice.username, "alice");
    assert_eq!(alice.roles, vec![Role::Player]);

    let result = auth.register("alice", "p2", "Other", &[Role::Player]).await;
    assert!(matches!(result, Err(SessionError::AlreadyExists(_))));
}

// =========================================================================
// Single active session
// =========================================================================

#[tokio::test]
async fn test_login_twice_invalidates_first_token() {
    let (auth, _) = setup();
    auth.register("alice", "p1", "Alice", &[]).await.unwrap();

    let first = auth.login("alice", "p1").await.unwrap();
    let second = auth.login("alice", "p1").await.unwrap();
    assert_ne!(first.token, second.token);

    let stale = auth.get_session(&first.token).await;
    assert!(matches!(stale, Err(SessionError::Unauthorized)));

    let live = auth.get_session(&second.token).await.expect("second is live");
    assert_eq!(live.user_id, second.user.id);
    assert!(live.revoked_at.is_none());
}

/// Wraps [`InMemoryStore`] with a delay on session writes, like a
/// database round-trip.
struct SlowStore {
    inner: InMemoryStore,
    delay: Duration,
}

impl UserStore for SlowStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        self.inner.insert_user(user).await
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        self.inner.user_by_id(id).await
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.inner.user_by_username(username).await
    }

    async fn update_display_name(
        &self,
        id: UserId,
        display_name: &str,
    ) -> Result<Option<User>, StoreError> {
        self.inner.update_display_name(id, display_name).await
    }
}

impl SessionStore for SlowStore {
    async fn insert_session(&self, session: NewSession) -> Result<AuthSession, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.insert_session(session).await
    }

    async fn session_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<AuthSession>, StoreError> {
        self.inner.session_by_token_hash(token_hash).await
    }

    async fn revoke_active_sessions(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        self.inner.revoke_active_sessions(user_id, now).await
    }

    async fn revoke_session(&self, id: SessionId, now: DateTime<Utc>) -> Result<bool, StoreError> {
        self.inner.revoke_session(id, now).await
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        self.inner.purge_expired(now).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_login_concurrent_same_user_leaves_one_active_session() {
    let store = SlowStore {
        inner: InMemoryStore::new(),
        delay: Duration::from_millis(10),
    };
    let auth = Arc::new(SessionAuthority::new(store, SessionConfig::default()));
    auth.register("alice", "pw", "Alice", &[]).await.unwrap();

    let (a, b) = {
        let (auth_a, auth_b) = (Arc::clone(&auth), Arc::clone(&auth));
        let first = tokio::spawn(async move { auth_a.login("alice", "pw").await });
        let second = tokio::spawn(async move { auth_b.login("alice", "pw").await });
        (first.await.unwrap().unwrap(), second.await.unwrap().unwrap())
    };

    let first_live = auth.get_session(&a.token).await.is_ok();
    let second_live = auth.get_session(&b.token).await.is_ok();
    assert!(
        first_live ^ second_live,
        "exactly one concurrent login stays valid (first={first_live}, second={second_live})"
    );
}

#[tokio::test]
async fn test_login_unknown_user_returns_not_found() {
    let (auth, _) = setup();
    let result = auth.login("ghost", "pw").await;
    assert!(matches!(result, Err(SessionError::NotFound(_))));
}

#[tokio::test]
async fn test_login_sets_one_hour_expiry_by_default() {
    let (auth, _) = setup();
    auth.register("alice", "p1", "Alice", &[]).await.unwrap();

    let login = auth.login("alice", "p1").await.unwrap();
    let session = auth.get_session(&login.token).await.unwrap();
    let ttl = session.expires_at - session.created_at;

    assert_eq!(ttl.num_seconds(), 3600);
    assert_eq!(login.expires_at, session.expires_at);
}

// =========================================================================
// Validator
// =========================================================================

#[tokio::test]
async fn test_validate_cookie_token_yields_identity() {
    let (auth, validator) = setup();
    auth.register("alice", "p1", "Alice", &[]).await.unwrap();
    let login = auth.login("alice", "p1").await.unwrap();

    let cookie = format!("{SESSION_COOKIE}={}", login.token);
    let identity = validator
        .validate(Credentials {
            cookie: Some(&cookie),
            authorization: None,
        })
        .await
        .expect("valid cookie");

    assert_eq!(identity.user.username, "alice");
    assert_eq!(identity.token, login.token);
}

#[tokio::test]
async fn test_validate_bearer_after_logout_returns_unauthorized() {
    let (auth, validator) = setup();
    auth.register("alice", "p1", "Alice", &[]).await.unwrap();
    let login = auth.login("alice", "p1").await.unwrap();
    let header = bearer(&login.token);

    assert!(
        validator
            .validate(Credentials {
                cookie: None,
                authorization: Some(&header),
            })
            .await
            .is_ok()
    );

    auth.logout(&login.token).await.unwrap();

    let result = validator
        .validate(Credentials {
            cookie: None,
            authorization: Some(&header),
        })
        .await;
    assert!(matches!(result, Err(SessionError::Unauthorized)));
}

#[tokio::test]
async fn test_validate_well_formed_unknown_token_returns_unauthorized() {
    let (_, validator) = setup();
    let header = bearer(&"f".repeat(64));

    let result = validator
        .validate(Credentials {
            cookie: None,
            authorization: Some(&header),
        })
        .await;
    assert!(matches!(result, Err(SessionError::Unauthorized)));
}
