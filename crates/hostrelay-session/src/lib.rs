//! Accounts, session tokens and request authentication for Hostrelay.
//!
//! This crate owns the identity side of the server:
//!
//! 1. **Accounts**: registration with a salted password hash
//!    ([`SessionAuthority::register`]).
//! 2. **Sessions**: opaque 256-bit bearer tokens, persisted only as their
//!    SHA-256 hash, at most one active per user ([`SessionAuthority::login`]).
//! 3. **Request authentication**: resolving a cookie or bearer header to a
//!    [`RequestIdentity`] ([`SessionValidator`]).
//!
//! # How it fits in the stack
//!
//! ```text
//! HTTP API / realtime hubs (above)  ← authenticate every request here
//!     ↕
//! Session Layer (this crate)  ← accounts, tokens, validation
//!     ↕
//! UserStore / SessionStore (below)  ← persistence collaborator
//! ```
//!
//! The [`StoreError`] type also lives here because the lobby layer's store
//! reports failures the same way.

#![allow(async_fn_in_trait)]

mod authority;
mod error;
pub mod hashing;
mod model;
mod store;
mod validator;

pub use authority::SessionAuthority;
pub use error::{SessionError, StoreError};
pub use hashing::{PasswordHasher, Sha256PasswordHasher};
pub use model::{
    AuthSession, LoginResponse, NewSession, NewUser, PublicUser, Role, SessionConfig, User,
};
pub use store::{AccountStore, InMemoryStore, SessionStore, UserStore};
pub use validator::{
    Credentials, RequestIdentity, SESSION_COOKIE, SessionValidator, extract_token,
    is_well_formed_token,
};
