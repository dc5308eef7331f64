use reqwest::Url;
use std::time::Duration;

use crate::error::ClientError;

const DEFAULT_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the console client
#[derive(Debug, Clone)]
pub struct ConsoleClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl ConsoleClientConfig {
    /// Create configuration for a console backend at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the transport timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create configuration from environment variables
    ///
    /// Reads:
    /// - `CONSOLE_SERVER_URL`: backend base URL (default: `http://localhost:3000`)
    /// - `CONSOLE_TIMEOUT_SECS`: transport timeout in seconds (default: 30)
    ///
    /// # Errors
    /// Returns [`ClientError::BuildError`] if the timeout is not an integer or
    /// the base URL is not an absolute http(s) URL.
    pub fn from_env() -> Result<Self, ClientError> {
        let base_url =
            std::env::var("CONSOLE_SERVER_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned());
        let mut config = Self::new(base_url);

        if let Ok(raw) = std::env::var("CONSOLE_TIMEOUT_SECS") {
            let secs = raw.trim().parse::<u64>().map_err(|_| {
                ClientError::BuildError(format!("CONSOLE_TIMEOUT_SECS is not a number: {raw}"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        config.validated_base_url()?;
        Ok(config)
    }

    /// Parse the base URL, rejecting relative or non-http(s) addresses
    ///
    /// # Errors
    /// Returns [`ClientError::BuildError`] for anything but an absolute
    /// `http://` or `https://` URL.
    pub fn validated_base_url(&self) -> Result<Url, ClientError> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            ClientError::BuildError(format!("Invalid base URL {:?}: {e}", self.base_url))
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ClientError::BuildError(format!(
                "Base URL must use http or https, got {other}"
            ))),
        }
    }

    /// Base URL without trailing slashes, ready for path concatenation
    #[must_use]
    pub fn normalized_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

impl Default for ConsoleClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
