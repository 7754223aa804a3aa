//! Opaque page cursors.
//!
//! A cursor is the base64 encoding of a fixed salt followed by the string form
//! of a record identifier. It hides raw identifiers from clients but is not a
//! security boundary: anyone who knows the salt can forge a cursor.

use std::borrow::Cow;
use std::fmt;
use std::string::FromUtf8Error;

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use derive_more::{Deref, Display};
#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::TRACING_TARGET_CURSOR;

/// Salt prepended to every identifier before encoding.
pub const DEFAULT_SALT: &str = "saltysalt";

/// Standard alphabet, padded on encode and lenient about padding on decode.
const ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Identifier of a record, either numeric or textual.
///
/// Decoding a cursor turns any identifier whose string form parses as a
/// JSON number into [`RecordId::Number`], so a text id such as `"42"` comes
/// back as the number `42`. Unsigned ids above `i64::MAX`, decimals and
/// exponent forms are numbers too.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(untagged)]
pub enum RecordId {
    /// Numeric identifier.
    Number(Number),
    /// Any other identifier (UUIDs, slugs, ...).
    Text(String),
}

impl RecordId {
    /// Interprets a raw identifier, preferring the numeric form.
    pub fn parse(raw: &str) -> Self {
        raw.parse::<Number>()
            .map(Self::Number)
            .unwrap_or_else(|_| Self::Text(raw.to_owned()))
    }

    /// Returns the identifier as a JSON value.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Number(id) => Value::Number(id.clone()),
            Self::Text(id) => Value::from(id.as_str()),
        }
    }

    /// Returns whether the identifier is numeric.
    #[inline]
    pub fn is_number(&self) -> bool {
        matches!(self, Self::Number(_))
    }

    /// Returns the numeric identifier, if any.
    #[inline]
    pub fn as_number(&self) -> Option<&Number> {
        match self {
            Self::Number(id) => Some(id),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl From<Number> for RecordId {
    fn from(id: Number) -> Self {
        Self::Number(id)
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        Self::Number(id.into())
    }
}

impl From<u64> for RecordId {
    fn from(id: u64) -> Self {
        Self::Number(id.into())
    }
}

impl From<i32> for RecordId {
    fn from(id: i32) -> Self {
        Self::Number(id.into())
    }
}

impl From<u32> for RecordId {
    fn from(id: u32) -> Self {
        Self::Number(id.into())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self::Text(id)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_owned())
    }
}

/// An encoded cursor as handed to and received from clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Deref, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Wraps an already encoded cursor string.
    ///
    /// The value is not checked; decoding happens when the cursor is used.
    #[inline]
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// Returns the encoded form.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the cursor, returning the encoded form.
    #[inline]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for Cursor {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for Cursor {
    fn from(encoded: String) -> Self {
        Self(encoded)
    }
}

impl From<&str> for Cursor {
    fn from(encoded: &str) -> Self {
        Self(encoded.to_owned())
    }
}

impl From<Cursor> for String {
    fn from(cursor: Cursor) -> Self {
        cursor.0
    }
}

/// Reasons a cursor could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum CursorError {
    /// The cursor is not valid base64.
    #[error("cursor is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    /// The decoded payload is not UTF-8 text.
    #[error("cursor payload is not valid text: {0}")]
    NotUtf8(#[from] FromUtf8Error),

    /// The decoded payload is shorter than the salt.
    #[error("cursor payload is {actual} bytes, expected at least {expected}")]
    TooShort {
        /// Length of the salt.
        expected: usize,
        /// Length of the decoded payload.
        actual: usize,
    },

    /// The decoded payload does not start with the salt.
    #[error("cursor payload does not carry the expected salt")]
    SaltMismatch,
}

/// Reversible mapping between record identifiers and cursors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorCodec {
    salt: Cow<'static, str>,
}

impl Default for CursorCodec {
    fn default() -> Self {
        Self {
            salt: Cow::Borrowed(DEFAULT_SALT),
        }
    }
}

impl CursorCodec {
    /// Creates a codec with a custom salt.
    pub fn new(salt: impl Into<Cow<'static, str>>) -> Self {
        Self { salt: salt.into() }
    }

    /// Returns the salt.
    #[inline]
    pub fn salt(&self) -> &str {
        &self.salt
    }

    /// Encodes an identifier into a cursor.
    pub fn encode(&self, id: &RecordId) -> Cursor {
        let payload = format!("{}{}", self.salt, id);
        Cursor(ENGINE.encode(payload.as_bytes()))
    }

    /// Decodes a cursor back into an identifier.
    pub fn decode(&self, cursor: &str) -> Result<RecordId, CursorError> {
        let bytes = ENGINE.decode(cursor.trim())?;
        let payload = String::from_utf8(bytes)?;

        if payload.len() < self.salt.len() {
            return Err(CursorError::TooShort {
                expected: self.salt.len(),
                actual: payload.len(),
            });
        }

        let raw = payload
            .strip_prefix(&*self.salt)
            .ok_or(CursorError::SaltMismatch)?;

        let id = RecordId::parse(raw);
        tracing::trace!(target: TRACING_TARGET_CURSOR, %id, "decoded cursor");
        Ok(id)
    }
}
