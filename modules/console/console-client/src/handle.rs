//! Process-wide reference to the current console client.
//!
//! The client is rebuilt whenever the signed-in user changes. Holders call
//! [`ApiHandle::current`] on every use instead of keeping an instance around;
//! an `Arc` obtained before a rebuild keeps working but still speaks for the
//! previous user.

use arc_swap::ArcSwap;
use std::sync::Arc;

use crate::client::ConsoleApi;
use crate::config::ConsoleClientConfig;
use crate::error::ClientError;
use crate::notify::{ErrorNotifier, TracingNotifier};
use crate::request::RequestOptions;
use crate::session::{Session, SessionStore, actor_id_for};
use crate::transport::{ReqwestTransport, Transport};

const LOGOUT_PATH: &str = "/api/user/logout";

pub struct ApiHandle {
    transport: Arc<dyn Transport>,
    sessions: Arc<dyn SessionStore>,
    notifier: Arc<dyn ErrorNotifier>,
    current: ArcSwap<ConsoleApi>,
}

impl std::fmt::Debug for ApiHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiHandle")
            .field("current", &self.current.load_full())
            .finish_non_exhaustive()
    }
}

impl ApiHandle {
    /// Build the handle and its first client from the stored session
    ///
    /// # Errors
    /// Session store failures and invalid actor identities.
    pub fn new(
        transport: Arc<dyn Transport>,
        sessions: Arc<dyn SessionStore>,
        notifier: Arc<dyn ErrorNotifier>,
    ) -> Result<Self, ClientError> {
        let first = build(&transport, sessions.as_ref(), &notifier)?;
        Ok(Self {
            transport,
            sessions,
            notifier,
            current: ArcSwap::from_pointee(first),
        })
    }

    /// `reqwest` transport from `config`, failures logged through `tracing`
    ///
    /// # Errors
    /// Invalid configuration, session store failures.
    pub fn from_config(
        config: &ConsoleClientConfig,
        sessions: Arc<dyn SessionStore>,
    ) -> Result<Self, ClientError> {
        let transport = ReqwestTransport::from_config(config)?;
        Self::new(Arc::new(transport), sessions, Arc::new(TracingNotifier))
    }

    /// The client live right now
    #[must_use]
    pub fn current(&self) -> Arc<ConsoleApi> {
        self.current.load_full()
    }

    /// Replace the client with one built from the stored session
    ///
    /// The previous instance is dropped once its last holder lets go; its
    /// in-flight reads finish on it and are not shared with the new one.
    ///
    /// # Errors
    /// Session store failures and invalid actor identities; on error the
    /// current client stays in place.
    pub fn rebuild(&self) -> Result<Arc<ConsoleApi>, ClientError> {
        let next = Arc::new(build(&self.transport, self.sessions.as_ref(), &self.notifier)?);
        self.current.store(Arc::clone(&next));
        tracing::debug!(actor = %next.actor_id(), "console client rebuilt");
        Ok(next)
    }

    /// Persist `session` and switch to a client acting for it
    ///
    /// # Errors
    /// Session store failures and invalid actor identities.
    pub fn login(&self, session: &Session) -> Result<Arc<ConsoleApi>, ClientError> {
        self.sessions.save(session)?;
        self.rebuild()
    }

    /// End the server session, forget the local one and switch to an
    /// anonymous client
    ///
    /// The server call is best effort: its failure is neither reported nor
    /// returned.
    ///
    /// # Errors
    /// Session store failures.
    pub async fn logout(&self) -> Result<Arc<ConsoleApi>, ClientError> {
        let options = RequestOptions::new()
            .skip_error_handler()
            .disable_duplicate();
        if let Err(err) = self.current().get(LOGOUT_PATH, options).await {
            tracing::debug!(error = %err, "server logout failed, clearing local session anyway");
        }
        self.sessions.clear()?;
        self.rebuild()
    }
}

fn build(
    transport: &Arc<dyn Transport>,
    sessions: &dyn SessionStore,
    notifier: &Arc<dyn ErrorNotifier>,
) -> Result<ConsoleApi, ClientError> {
    let actor = actor_id_for(sessions.load()?.as_ref());
    ConsoleApi::new(Arc::clone(transport), &actor, Arc::clone(notifier))
}
