//! Locally persisted session state.
//!
//! The signed-in user is kept outside the client so it survives restarts; the
//! actor identity header of every request is derived from it.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::ClientError;

/// Actor identity sent when nobody is signed in.
pub const ANONYMOUS_ACTOR: &str = "-1";

/// The signed-in console user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub role: i32,
}

impl Session {
    /// Value of the actor identity header for this user
    #[must_use]
    pub fn actor_id(&self) -> String {
        self.id.to_string()
    }
}

/// Actor identity for an optional session.
#[must_use]
pub fn actor_id_for(session: Option<&Session>) -> String {
    session.map_or_else(|| ANONYMOUS_ACTOR.to_owned(), Session::actor_id)
}

/// Where the current session lives between runs.
pub trait SessionStore: Send + Sync {
    /// # Errors
    /// Returns [`ClientError::Session`] if the store cannot be read.
    fn load(&self) -> Result<Option<Session>, ClientError>;

    /// # Errors
    /// Returns [`ClientError::Session`] if the store cannot be written.
    fn save(&self, session: &Session) -> Result<(), ClientError>;

    /// # Errors
    /// Returns [`ClientError::Session`] if the store cannot be written.
    fn clear(&self) -> Result<(), ClientError>;
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_session(session: Session) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Session>, ClientError> {
        Ok(self.session.lock().clone())
    }

    fn save(&self, session: &Session) -> Result<(), ClientError> {
        *self.session.lock() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        self.session.lock().take();
        Ok(())
    }
}

/// JSON file holding the signed-in user
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<Session>, ClientError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ClientError::Session(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };

        match serde_json::from_str(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "ignoring unreadable session file"
                );
                Ok(None)
            }
        }
    }

    fn save(&self, session: &Session) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                ClientError::Session(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        let json = serde_json::to_vec_pretty(session)?;
        std::fs::write(&self.path, json).map_err(|e| {
            ClientError::Session(format!("failed to write {}: {e}", self.path.display()))
        })
    }

    fn clear(&self) -> Result<(), ClientError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ClientError::Session(format!(
                "failed to remove {}: {e}",
                self.path.display()
            ))),
        }
    }
}
