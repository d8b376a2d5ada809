//! Account and session records.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use hostrelay_protocol::{SessionId, UserId};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Lifetime of a freshly issued session, in seconds.
    ///
    /// Default: 3600 (one hour). Zero issues sessions that are already
    /// expired, which is only useful in tests.
    pub session_ttl_secs: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: 3600,
        }
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// What a user is allowed to do beyond playing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Player,
    /// May disband any lobby and remove any member.
    Admin,
}

/// A registered account as the store keeps it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub display_name: String,
    pub roles: BTreeSet<Role>,
    pub password_salt: String,
    pub password_hash: String,
}

impl User {
    /// The client-facing projection. Never carries the salt or hash.
    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            roles: self.roles.iter().copied().collect(),
        }
    }
}

/// A user as returned by the HTTP API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: UserId,
    pub username: String,
    pub display_name: String,
    pub roles: Vec<Role>,
}

impl PublicUser {
    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }
}

/// Insert payload for [`UserStore::insert_user`](crate::UserStore::insert_user).
/// The store assigns the id.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub display_name: String,
    pub roles: BTreeSet<Role>,
    pub password_salt: String,
    pub password_hash: String,
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// A persisted login.
///
/// Only the token's hash is stored; the raw token exists solely in the
/// [`LoginResponse`] handed back from `login`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub id: SessionId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub token_hash: String,
}

impl AuthSession {
    /// Not revoked and not yet expired at `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && now < self.expires_at
    }
}

/// Insert payload for [`SessionStore::insert_session`](crate::SessionStore::insert_session).
#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub token_hash: String,
}

/// Result of a successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: PublicUser,
    /// The raw bearer token. Shown once; the server keeps only its hash.
    pub token: String,
    pub expires_at: DateTime<Utc>,
}
