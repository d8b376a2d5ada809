//! Codec trait and the JSON implementation used on both realtime channels.
//!
//! A codec turns message values into the bytes a transport connection
//! sends, and back. The hubs and the tick broadcaster only talk to the
//! [`Codec`] trait, so swapping JSON for a binary format later touches
//! nothing else.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Encodes values to bytes and decodes bytes back into values.
///
/// `Send + Sync + 'static` because one codec instance lives in the shared
/// server state and is used from every connection task at once.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if the value can't be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] for malformed input, unknown
    /// message types, or missing fields.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`.
///
/// The browser client speaks JSON natively, so this is the only codec the
/// server ships with. Behind the `json` feature (on by default).
///
/// ```rust
/// use hostrelay_protocol::{Codec, JsonCodec, LobbyServerMessage, UserId};
///
/// let codec = JsonCodec;
/// let msg = LobbyServerMessage::PlayerLeft { id: UserId(3) };
///
/// let bytes = codec.encode(&msg).unwrap();
/// let decoded: LobbyServerMessage = codec.decode(&bytes).unwrap();
/// assert_eq!(msg, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
