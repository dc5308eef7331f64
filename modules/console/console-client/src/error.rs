use bytes::Bytes;
use http::StatusCode;
use thiserror::Error;

/// Error types for console client operations.
///
/// Every variant is cheap to clone: a single failed network call is handed to
/// every caller that joined it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("Request build error: {0}")]
    BuildError(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP error: status={status}")]
    Http { status: StatusCode, body: Bytes },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("API error: {message}")]
    Api { message: String },

    #[error("Session store error: {0}")]
    Session(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClientError {
    /// HTTP status carried by the error, if the server answered at all.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout(err.to_string())
        } else if err.is_connect() {
            ClientError::Connection(err.to_string())
        } else if err.is_builder() {
            ClientError::BuildError(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_only_for_http_errors() {
        let err = ClientError::Http {
            status: StatusCode::BAD_GATEWAY,
            body: Bytes::from_static(b"upstream down"),
        };
        assert_eq!(err.status(), Some(StatusCode::BAD_GATEWAY));
        assert_eq!(ClientError::Timeout("slow".into()).status(), None);
    }

    #[test]
    fn test_json_error_becomes_serialization() {
        let err = serde_json::from_str::<u32>("not a number").unwrap_err();
        assert!(matches!(ClientError::from(err), ClientError::Serialization(_)));
    }
}
