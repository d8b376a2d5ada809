//! Join codes: short, human-typeable lobby handles.
//!
//! Codes are six characters drawn from an alphabet without the easily
//! confused `I`, `O`, `0` and `1`. That gives 32^6 (about 10^9) codes;
//! uniqueness among live lobbies is enforced by the store, and
//! [`LobbyAuthority`](crate::LobbyAuthority) retries on a collision.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::LobbyError;

pub const JOIN_CODE_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const JOIN_CODE_LEN: usize = 6;

/// A validated, upper-case join code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JoinCode(String);

impl JoinCode {
    /// Draws a random code.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let code = (0..JOIN_CODE_LEN)
            .map(|_| JOIN_CODE_ALPHABET[rng.random_range(0..JOIN_CODE_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    /// Parses user input. Lower case is accepted and normalized.
    ///
    /// # Errors
    /// [`LobbyError::InvalidJoinCode`] unless the input is exactly six
    /// alphabet characters after ASCII upper-casing.
    pub fn parse(input: &str) -> Result<Self, LobbyError> {
        let code = input.trim().to_ascii_uppercase();
        let valid = code.len() == JOIN_CODE_LEN
            && code.bytes().all(|b| JOIN_CODE_ALPHABET.contains(&b));
        if valid {
            Ok(Self(code))
        } else {
            Err(LobbyError::InvalidJoinCode(input.to_owned()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JoinCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
