//! Console API client
//!
//! HTTP client used by the gateway administration console to talk to its
//! backend:
//!
//! - every request carries the signed-in user's identity (`New-API-User`)
//!   and `Cache-Control: no-store`
//! - failures go through one interception point that notifies the user
//!   unless the call opted out
//! - concurrent identical `GET`s (same path, same parameters) share a single
//!   network request and all receive its result
//! - the client is rebuilt on login and logout; callers fetch the current
//!   instance from an [`ApiHandle`] on each use
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use console_client::{
//!     ApiHandle, ConsoleClientConfig, FileSessionStore, Params, RequestOptions,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConsoleClientConfig::from_env()?;
//! let handle = ApiHandle::from_config(&config, Arc::new(FileSessionStore::new("user.json")))?;
//!
//! let options = RequestOptions::new().params(Params::new().with("p", 1).with("page_size", 20));
//! let response = handle.current().get("/api/channel/", options).await?;
//! let page: serde_json::Value = response.envelope()?;
//! println!("{page}");
//! # Ok(())
//! # }
//! ```

mod body;
mod client;
mod config;
mod dedup;
mod error;
mod handle;
mod notify;
mod request;
mod response;
mod session;
mod transport;

pub use body::Body;
pub use client::{ACTOR_HEADER, ConsoleApi};
pub use config::ConsoleClientConfig;
pub use dedup::{InFlight, SharedCall, dedup_key};
pub use error::ClientError;
pub use handle::ApiHandle;
pub use notify::{ErrorNotifier, TracingNotifier};
pub use request::{Params, Request, RequestBuilder, RequestOptions};
pub use response::{ApiEnvelope, Response};
pub use session::{
    ANONYMOUS_ACTOR, FileSessionStore, MemorySessionStore, Session, SessionStore, actor_id_for,
};
pub use transport::{ReqwestTransport, Transport};

// Re-export commonly used types from dependencies
pub use http::{Method, StatusCode};
