//! Salts, tokens and the salted SHA-256 digests the session layer stores.
//!
//! Nothing secret is ever persisted in the clear: passwords are stored as
//! `SHA-256(len(salt) || salt || password)` and session tokens as
//! `SHA-256(token)`. All digests are lowercase hex.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of a raw session token in bytes (256 bits).
pub const TOKEN_BYTES: usize = 32;

/// Length of a per-user password salt in bytes.
pub const SALT_BYTES: usize = 16;

/// Pluggable password hashing.
///
/// The algorithm is a deployment decision, so the authority only talks to
/// this trait. [`Sha256PasswordHasher`] is the default.
pub trait PasswordHasher: Send + Sync + 'static {
    /// Returns the hex digest of `password` under `salt`. Must be
    /// deterministic for the same inputs.
    fn hash(&self, password: &str, salt: &str) -> String;
}

/// Salted SHA-256 via [`hash_with_salt`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256PasswordHasher;

impl PasswordHasher for Sha256PasswordHasher {
    fn hash(&self, password: &str, salt: &str) -> String {
        hash_with_salt(password.as_bytes(), salt.as_bytes())
    }
}

/// Hashes `data` under `salt`.
///
/// The salt is length-prefixed so `("ab", "c")` and `("a", "bc")` never
/// produce the same input to the digest.
pub fn hash_with_salt(data: &[u8], salt: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update((salt.len() as u64).to_be_bytes());
    hasher.update(salt);
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Hex SHA-256 of a raw session token. This is the only form of a token
/// that reaches the store.
pub fn hash_token(raw_token: &str) -> String {
    hex::encode(Sha256::digest(raw_token.as_bytes()))
}

/// Fresh random salt, hex encoded.
pub fn generate_salt() -> String {
    let bytes: [u8; SALT_BYTES] = rand::rng().random();
    hex::encode(bytes)
}

/// Fresh 256-bit session token, hex encoded (64 chars).
///
/// `rand::rng()` is a CSPRNG seeded from the operating system.
pub fn generate_token() -> String {
    let bytes: [u8; TOKEN_BYTES] = rand::rng().random();
    hex::encode(bytes)
}

/// Compares two digests without short-circuiting on the first mismatch.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
