use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::ClientError;

/// Buffered HTTP response.
///
/// The body is read in full before the response is handed out, which lets one
/// settled response be cloned to every caller that shared the request.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

/// The `{ success, message, data }` wrapper the console backend puts around
/// every payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    /// Unwrap the payload, turning `success: false` into an error.
    ///
    /// # Errors
    /// [`ClientError::Api`] when the backend reports failure,
    /// [`ClientError::InvalidResponse`] when a successful envelope has no data.
    pub fn into_result(self) -> Result<T, ClientError> {
        if !self.success {
            return Err(ClientError::Api {
                message: self.message,
            });
        }
        self.data
            .ok_or_else(|| ClientError::InvalidResponse("envelope has no data".into()))
    }
}

impl Response {
    #[must_use]
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Deserialize the body as JSON
    ///
    /// # Errors
    /// Returns [`ClientError::Serialization`] if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Body as UTF-8 text
    ///
    /// # Errors
    /// Returns [`ClientError::InvalidResponse`] if the body is not UTF-8.
    pub fn text(&self) -> Result<String, ClientError> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| ClientError::InvalidResponse(format!("Invalid UTF-8: {e}")))
    }

    /// Decode the backend envelope and return its payload
    ///
    /// # Errors
    /// See [`ApiEnvelope::into_result`]; decoding failures are
    /// [`ClientError::Serialization`].
    pub fn envelope<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        self.json::<ApiEnvelope<T>>()?.into_result()
    }
}
