//! Per-request authentication.
//!
//! Both the HTTP API and the realtime listener funnel every inbound request
//! through [`SessionValidator::validate`]. The token is looked for in two
//! places, in order:
//!
//! 1. a cookie named [`SESSION_COOKIE`]
//! 2. an `Authorization: Bearer <token>` header
//!
//! Anything that isn't 64 hex characters is rejected before the store is
//! touched.

use std::sync::Arc;

use crate::hashing::TOKEN_BYTES;
use crate::{AccountStore, AuthSession, PublicUser, SessionAuthority, SessionError};

/// Name of the cookie carrying the raw session token.
pub const SESSION_COOKIE: &str = "session_token";

/// The raw header values a request arrived with.
#[derive(Debug, Clone, Copy, Default)]
pub struct Credentials<'a> {
    /// The full `Cookie` header.
    pub cookie: Option<&'a str>,
    /// The full `Authorization` header.
    pub authorization: Option<&'a str>,
}

/// Who is making a request. Stored in HTTP request extensions and on each
/// realtime connection.
#[derive(Debug, Clone)]
pub struct RequestIdentity {
    pub session: AuthSession,
    pub user: PublicUser,
    /// The raw token, kept so handlers like logout can act on it.
    pub token: String,
}

/// Picks the token out of the request headers. The cookie wins if both
/// are present.
pub fn extract_token<'a>(credentials: &Credentials<'a>) -> Option<&'a str> {
    credentials
        .cookie
        .and_then(cookie_token)
        .or_else(|| credentials.authorization.and_then(bearer_token))
}

fn cookie_token(header: &str) -> Option<&str> {
    header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name.trim() == SESSION_COOKIE).then(|| value.trim())
    })
}

fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
}

/// Exactly 64 ASCII hex digits, either case.
pub fn is_well_formed_token(token: &str) -> bool {
    token.len() == TOKEN_BYTES * 2 && token.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Authenticates requests against a [`SessionAuthority`].
pub struct SessionValidator<S> {
    authority: Arc<SessionAuthority<S>>,
}

impl<S> Clone for SessionValidator<S> {
    fn clone(&self) -> Self {
        Self {
            authority: Arc::clone(&self.authority),
        }
    }
}

impl<S: AccountStore> SessionValidator<S> {
    pub fn new(authority: Arc<SessionAuthority<S>>) -> Self {
        Self { authority }
    }

    /// Resolves the request's token to an identity.
    ///
    /// # Errors
    /// - [`SessionError::Unauthorized`]: no token, or the session is not
    ///   active
    /// - [`SessionError::MalformedToken`]: the token has the wrong shape
    pub async fn validate(
        &self,
        credentials: Credentials<'_>,
    ) -> Result<RequestIdentity, SessionError> {
        let token = extract_token(&credentials).ok_or(SessionError::Unauthorized)?;
        if !is_well_formed_token(token) {
            return Err(SessionError::MalformedToken);
        }

        let (session, user) = match self.authority.resolve(token).await {
            Ok(resolved) => resolved,
            Err(SessionError::NotFound(_)) => return Err(SessionError::Unauthorized),
            Err(e) => return Err(e),
        };

        Ok(RequestIdentity {
            session,
            user: user.to_public(),
            token: token.to_owned(),
        })
    }
}
