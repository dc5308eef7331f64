use bytes::Bytes;
use serde::Serialize;

use crate::error::ClientError;

/// Outbound request body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Body {
    /// No body (GET and DELETE)
    #[default]
    Empty,
    /// Buffered bytes
    Bytes(Bytes),
}

impl Body {
    /// Create a body from a JSON-serializable value
    ///
    /// # Errors
    /// Returns [`ClientError::Serialization`] if the value cannot be encoded.
    pub fn from_json<T: Serialize + ?Sized>(value: &T) -> Result<Self, ClientError> {
        let json = serde_json::to_vec(value)?;
        Ok(Body::Bytes(Bytes::from(json)))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }

    /// Bytes to put on the wire, if any.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Body::Empty => None,
            Body::Bytes(bytes) => Some(bytes),
        }
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Bytes(Bytes::from(s))
    }
}

impl From<Vec<u8>> for Body {
    fn from(v: Vec<u8>) -> Self {
        Body::Bytes(Bytes::from(v))
    }
}

impl From<Bytes> for Body {
    fn from(b: Bytes) -> Self {
        Body::Bytes(b)
    }
}
