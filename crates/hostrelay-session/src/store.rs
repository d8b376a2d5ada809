//! Persistence seams for accounts and sessions.
//!
//! The real database lives outside this workspace. The authority only
//! needs the handful of queries below, each of which must be atomic on
//! its own. [`InMemoryStore`] implements both traits for tests and the
//! default binary.

use std::collections::HashMap;
use std::future::Future;

use chrono::{DateTime, Utc};
use hostrelay_protocol::{SessionId, UserId};
use tokio::sync::Mutex;

use crate::{AuthSession, NewSession, NewUser, StoreError, User};

/// Account persistence.
pub trait UserStore: Send + Sync + 'static {
    /// Inserts a user and assigns its id.
    ///
    /// # Errors
    /// [`StoreError::Conflict`] if the username is taken.
    fn insert_user(
        &self,
        user: NewUser,
    ) -> impl Future<Output = Result<User, StoreError>> + Send;

    fn user_by_id(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<Option<User>, StoreError>> + Send;

    fn user_by_username(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<User>, StoreError>> + Send;

    /// Returns the updated user, or `None` if it doesn't exist.
    fn update_display_name(
        &self,
        id: UserId,
        display_name: &str,
    ) -> impl Future<Output = Result<Option<User>, StoreError>> + Send;
}

/// Session persistence, addressed by token hash.
pub trait SessionStore: Send + Sync + 'static {
    fn insert_session(
        &self,
        session: NewSession,
    ) -> impl Future<Output = Result<AuthSession, StoreError>> + Send;

    fn session_by_token_hash(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = Result<Option<AuthSession>, StoreError>> + Send;

    /// Stamps `revoked_at = now` on every active session of `user_id`.
    /// Returns how many were revoked.
    fn revoke_active_sessions(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<usize, StoreError>> + Send;

    /// Revokes one session. Returns `false` if it doesn't exist.
    fn revoke_session(
        &self,
        id: SessionId,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Deletes sessions that expired before `now` or were revoked.
    /// Returns how many were removed.
    fn purge_expired(
        &self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<usize, StoreError>> + Send;
}

/// Both halves of the account backend. Blanket-implemented.
pub trait AccountStore: UserStore + SessionStore {}

impl<T: UserStore + SessionStore> AccountStore for T {}

// ---------------------------------------------------------------------------
// InMemoryStore
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    usernames: HashMap<String, UserId>,
    sessions: HashMap<SessionId, AuthSession>,
    token_index: HashMap<String, SessionId>,
    last_user_id: u64,
    last_session_id: u64,
}

/// [`UserStore`] + [`SessionStore`] over in-process maps.
///
/// One mutex guards all tables, so every call is a single atomic step.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, revoked ones included.
    pub async fn session_count(&self) -> usize {
        self.tables.lock().await.sessions.len()
    }
}

impl UserStore for InMemoryStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.usernames.contains_key(&user.username) {
            return Err(StoreError::Conflict(format!("username {}", user.username)));
        }

        tables.last_user_id += 1;
        let user = User {
            id: UserId(tables.last_user_id),
            username: user.username,
            display_name: user.display_name,
            roles: user.roles,
            password_salt: user.password_salt,
            password_hash: user.password_hash,
        };
        tables.usernames.insert(user.username.clone(), user.id);
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .usernames
            .get(username)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn update_display_name(
        &self,
        id: UserId,
        display_name: &str,
    ) -> Result<Option<User>, StoreError> {
        let mut tables = self.tables.lock().await;
        Ok(tables.users.get_mut(&id).map(|user| {
            user.display_name = display_name.to_owned();
            user.clone()
        }))
    }
}

impl SessionStore for InMemoryStore {
    async fn insert_session(&self, session: NewSession) -> Result<AuthSession, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.token_index.contains_key(&session.token_hash) {
            return Err(StoreError::Conflict("session token".into()));
        }

        tables.last_session_id += 1;
        let session = AuthSession {
            id: SessionId(tables.last_session_id),
            user_id: session.user_id,
            created_at: session.created_at,
            expires_at: session.expires_at,
            revoked_at: None,
            token_hash: session.token_hash,
        };
        tables
            .token_index
            .insert(session.token_hash.clone(), session.id);
        tables.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn session_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<AuthSession>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .token_index
            .get(token_hash)
            .and_then(|id| tables.sessions.get(id))
            .cloned())
    }

    async fn revoke_active_sessions(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let mut tables = self.tables.lock().await;
        let mut revoked = 0;
        for session in tables.sessions.values_mut() {
            if session.user_id == user_id && session.is_active(now) {
                session.revoked_at = Some(now);
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn revoke_session(&self, id: SessionId, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        Ok(match tables.sessions.get_mut(&id) {
            Some(session) => {
                session.revoked_at.get_or_insert(now);
                true
            }
            None => false,
        })
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut tables = self.tables.lock().await;
        let dead: Vec<AuthSession> = tables
            .sessions
            .values()
            .filter(|s| !s.is_active(now))
            .cloned()
            .collect();
        for session in &dead {
            tables.sessions.remove(&session.id);
            tables.token_index.remove(&session.token_hash);
        }
        Ok(dead.len())
    }
}
