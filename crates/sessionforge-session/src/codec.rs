//! Codec trait and the default JSON codec for attribute values.
//!
//! The store only sees bytes. A [`Codec`] decides how session attribute
//! values (and the three metadata fields) become those bytes, so the
//! on-store format is a deployment choice rather than something baked
//! into the session engine.

use serde::{Serialize, de::DeserializeOwned};

/// Errors raised by a [`Codec`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization failed.
    #[error("encode failed: {0}")]
    Encode(String),

    /// The stored bytes don't decode into the requested type.
    #[error("decode failed: {0}")]
    Decode(String),
}

/// Converts values to and from the byte strings kept in the store.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// session handed out by a `SessionManager`.
pub trait Codec: Send + Sync + 'static {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, CodecError>;

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, CodecError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that stores values as JSON text.
///
/// Numbers land in the store as their decimal representation, so the
/// metadata fields stay readable with `HGETALL` from `redis-cli`.
///
/// ```rust
/// use sessionforge_session::{Codec, JsonCodec};
///
/// let bytes = JsonCodec.encode(&1_700_000_000_000_i64).unwrap();
/// assert_eq!(bytes, b"1700000000000");
///
/// let back: i64 = JsonCodec.decode(&bytes).unwrap();
/// assert_eq!(back, 1_700_000_000_000);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(data).map_err(|e| CodecError::Decode(e.to_string()))
    }
}
