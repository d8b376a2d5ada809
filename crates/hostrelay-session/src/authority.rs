//! The session authority: registration, login and the token lifecycle.
//!
//! ```text
//! register() ──→ login() ──→ get_session() / update_profile() ──→ logout()
//!                  │                                                │
//!                  ▼                                                ▼
//!         revoke all active,                                 [revoked_at set]
//!         issue one new token
//! ```
//!
//! Every read and write goes through the [`AccountStore`]. The only state
//! the authority keeps is a `logins` mutex that makes "revoke all, then
//! insert" one step, so it is `Sync` and can be shared behind an `Arc`
//! without an outer lock.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::Mutex;

use crate::hashing::{self, PasswordHasher, Sha256PasswordHasher};
use crate::{
    AccountStore, AuthSession, LoginResponse, NewSession, NewUser, PublicUser, Role,
    SessionConfig, SessionError, StoreError, User,
};

/// Issues, resolves and revokes session tokens.
pub struct SessionAuthority<S> {
    store: S,
    hasher: Arc<dyn PasswordHasher>,
    config: SessionConfig,
    /// Held across revoke + insert in [`login`](Self::login). Two logins
    /// for one user must not both revoke before either inserts.
    logins: Mutex<()>,
}

impl<S: AccountStore> SessionAuthority<S> {
    /// Creates an authority using the default salted SHA-256 hasher.
    pub fn new(store: S, config: SessionConfig) -> Self {
        Self {
            store,
            hasher: Arc::new(Sha256PasswordHasher),
            config,
            logins: Mutex::new(()),
        }
    }

    /// Replaces the password hasher.
    pub fn with_hasher(mut self, hasher: impl PasswordHasher) -> Self {
        self.hasher = Arc::new(hasher);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Creates an account.
    ///
    /// # Errors
    /// [`SessionError::AlreadyExists`] if the username is taken.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        display_name: &str,
        initial_roles: &[Role],
    ) -> Result<PublicUser, SessionError> {
        if self.store.user_by_username(username).await?.is_some() {
            return Err(SessionError::AlreadyExists(username.to_owned()));
        }

        let salt = hashing::generate_salt();
        let new_user = NewUser {
            username: username.to_owned(),
            display_name: display_name.to_owned(),
            roles: initial_roles.iter().copied().collect::<BTreeSet<_>>(),
            password_hash: self.hasher.hash(password, &salt),
            password_salt: salt,
        };

        // The pre-check above can race with a concurrent register; the
        // store's uniqueness constraint is the final word.
        let user = match self.store.insert_user(new_user).await {
            Ok(user) => user,
            Err(StoreError::Conflict(_)) => {
                return Err(SessionError::AlreadyExists(username.to_owned()));
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(user_id = %user.id, username, "user registered");
        Ok(user.to_public())
    }

    /// Verifies credentials and issues a new session.
    ///
    /// Every other active session of the user is revoked first, so at most
    /// one token per user is ever valid.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] for an unknown username or a wrong
    /// password. A store failure while revoking aborts the login.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<LoginResponse, SessionError> {
        let user = self
            .store
            .user_by_username(username)
            .await?
            .ok_or(SessionError::NotFound("user"))?;

        let candidate = self.hasher.hash(password, &user.password_salt);
        if !hashing::constant_time_eq(&candidate, &user.password_hash) {
            tracing::debug!(user_id = %user.id, "login rejected: password mismatch");
            return Err(SessionError::NotFound("user"));
        }

        let _guard = self.logins.lock().await;
        let now = Utc::now();
        let revoked = self.store.revoke_active_sessions(user.id, now).await?;

        let token = hashing::generate_token();
        let session = self
            .store
            .insert_session(NewSession {
                user_id: user.id,
                created_at: now,
                expires_at: now + Duration::seconds(self.config.session_ttl_secs),
                token_hash: hashing::hash_token(&token),
            })
            .await?;

        tracing::info!(
            user_id = %user.id,
            session_id = %session.id,
            revoked,
            "session created"
        );

        Ok(LoginResponse {
            user: user.to_public(),
            token,
            expires_at: session.expires_at,
        })
    }

    /// Revokes the session behind `raw_token`.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if no session has this token.
    pub async fn logout(&self, raw_token: &str) -> Result<(), SessionError> {
        let session = self
            .store
            .session_by_token_hash(&hashing::hash_token(raw_token))
            .await?
            .ok_or(SessionError::NotFound("session"))?;

        if !self.store.revoke_session(session.id, Utc::now()).await? {
            return Err(SessionError::NotFound("session"));
        }

        tracing::info!(user_id = %session.user_id, session_id = %session.id, "session revoked");
        Ok(())
    }

    /// Resolves a raw token to its active session.
    ///
    /// Expiry is checked here, at read time; expired rows may still sit in
    /// the store until [`purge_expired`](Self::purge_expired) runs.
    ///
    /// # Errors
    /// [`SessionError::Unauthorized`] if the session is absent, revoked or
    /// expired.
    pub async fn get_session(&self, raw_token: &str) -> Result<AuthSession, SessionError> {
        let session = self
            .store
            .session_by_token_hash(&hashing::hash_token(raw_token))
            .await?
            .ok_or(SessionError::Unauthorized)?;

        if !session.is_active(Utc::now()) {
            return Err(SessionError::Unauthorized);
        }
        Ok(session)
    }

    /// Resolves a raw token to its session and the owning user.
    ///
    /// # Errors
    /// As [`get_session`](Self::get_session), plus
    /// [`SessionError::NotFound`] if the user row is gone.
    pub async fn resolve(&self, raw_token: &str) -> Result<(AuthSession, User), SessionError> {
        let session = self.get_session(raw_token).await?;
        let user = self
            .store
            .user_by_id(session.user_id)
            .await?
            .ok_or(SessionError::NotFound("user"))?;
        Ok((session, user))
    }

    /// The profile of the token's owner.
    pub async fn get_profile(&self, raw_token: &str) -> Result<PublicUser, SessionError> {
        let (_, user) = self.resolve(raw_token).await?;
        Ok(user.to_public())
    }

    /// Changes the display name of the token's owner.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if the session or the user is missing.
    pub async fn update_profile(
        &self,
        raw_token: &str,
        display_name: &str,
    ) -> Result<PublicUser, SessionError> {
        let session = match self.get_session(raw_token).await {
            Ok(session) => session,
            Err(SessionError::Unauthorized) => return Err(SessionError::NotFound("session")),
            Err(e) => return Err(e),
        };

        let user = self
            .store
            .update_display_name(session.user_id, display_name)
            .await?
            .ok_or(SessionError::NotFound("user"))?;

        tracing::info!(user_id = %user.id, "profile updated");
        Ok(user.to_public())
    }

    /// Deletes expired and revoked sessions. Returns how many went away.
    pub async fn purge_expired(&self) -> Result<usize, SessionError> {
        let purged = self.store.purge_expired(Utc::now()).await?;
        if purged > 0 {
            tracing::debug!(purged, "purged dead sessions");
        }
        Ok(purged)
    }
}
