//! The seam between the console facade and the network.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::ConsoleClientConfig;
use crate::error::ClientError;
use crate::request::Request;
use crate::response::Response;

/// Sends a fully assembled request and buffers the answer.
///
/// Implementations return `Ok` for any response the server produced,
/// including non-2xx statuses; classifying those is the facade's job.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response, ClientError>;
}

/// `reqwest`-backed transport talking to the console backend
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    base_url: String,
    http_client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport for `base_url` with a client-wide timeout
    ///
    /// # Errors
    /// Returns [`ClientError::BuildError`] if the underlying client cannot be
    /// constructed.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::BuildError(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            http_client,
        })
    }

    /// Create a transport from validated configuration
    ///
    /// # Errors
    /// Returns [`ClientError::BuildError`] for an invalid base URL.
    pub fn from_config(config: &ConsoleClientConfig) -> Result<Self, ClientError> {
        config.validated_base_url()?;
        Self::new(config.normalized_base_url(), config.timeout)
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: Request) -> Result<Response, ClientError> {
        let url = format!("{}{}", self.base_url, request.path_and_query()?);

        let mut req_builder = self
            .http_client
            .request(request.method().clone(), &url)
            .headers(request.headers().clone());

        if let Some(timeout) = request.timeout() {
            req_builder = req_builder.timeout(timeout);
        }
        if let Some(bytes) = request.body().as_bytes() {
            req_builder = req_builder.body(bytes.clone());
        }

        tracing::debug!(method = %request.method(), url = %url, "sending console request");

        let resp = req_builder.send().await?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.bytes().await?;

        Ok(Response::new(status, headers, body))
    }
}
