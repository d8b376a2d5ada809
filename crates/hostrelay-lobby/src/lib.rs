//! Lobby management for Hostrelay.
//!
//! A lobby is a small group of users gathered behind a six-character join
//! code, waiting for the host to start a game.
//!
//! # Key types
//!
//! - [`LobbyAuthority`]: every lobby mutation goes through here
//! - [`Lobby`] / [`LobbyStatus`]: the record and its Open / InGame machine
//! - [`JoinCode`]: generation and validation of join codes
//! - [`LobbyStore`]: persistence seam, with [`InMemoryLobbyStore`]
//!
//! Invariant: a user belongs to at most one lobby, and the host of a fresh
//! lobby is always its first member.

#![allow(async_fn_in_trait)]

mod authority;
mod code;
mod error;
mod lobby;
mod store;

pub use authority::{LobbyAuthority, MAX_JOIN_CODE_ATTEMPTS};
pub use code::{JOIN_CODE_ALPHABET, JOIN_CODE_LEN, JoinCode};
pub use error::LobbyError;
pub use lobby::{Lobby, LobbyStatus};
pub use store::{InMemoryLobbyStore, LobbyStore};
