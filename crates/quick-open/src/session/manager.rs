//! QuickOpenManager - registry of live sessions keyed by handle.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::watch;

use super::{QuickOpenSession, SessionSnapshot};
use crate::config::QuickOpenConfig;
use crate::error::{QuickOpenError, Result};

/// Non-owning reference to a session; the session's generation id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionHandle(u64);

impl SessionHandle {
    pub fn generation(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Starts, feeds and ends quick-open sessions.
///
/// Generations are never reused, so a handle to an ended session stays
/// invalid even after new sessions start.
#[derive(Debug)]
pub struct QuickOpenManager {
    config: QuickOpenConfig,
    sessions: RwLock<HashMap<SessionHandle, QuickOpenSession>>,
    last_generation: AtomicU64,
}

impl Default for QuickOpenManager {
    fn default() -> Self {
        Self::new(QuickOpenConfig::default())
    }
}

impl QuickOpenManager {
    pub fn new(config: QuickOpenConfig) -> Self {
        Self {
            config,
            sessions: RwLock::new(HashMap::new()),
            last_generation: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &QuickOpenConfig {
        &self.config
    }

    /// Must be called from within a tokio runtime.
    pub fn start_session(&self, working_directory: impl AsRef<Path>) -> Result<SessionHandle> {
        let generation = self.last_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let session = QuickOpenSession::start_with_generation(
            working_directory.as_ref(),
            &self.config,
            generation,
        )?;
        let handle = SessionHandle(generation);
        self.sessions.write().insert(handle, session);
        Ok(handle)
    }

    pub fn update_query(&self, handle: SessionHandle, text: impl Into<String>) -> Result<()> {
        let sessions = self.sessions.read();
        let session = sessions
            .get(&handle)
            .ok_or(QuickOpenError::SessionNotFound(handle.0))?;
        session.update_query(text);
        Ok(())
    }

    pub fn subscribe(&self, handle: SessionHandle) -> Result<watch::Receiver<SessionSnapshot>> {
        self.sessions
            .read()
            .get(&handle)
            .map(QuickOpenSession::subscribe)
            .ok_or(QuickOpenError::SessionNotFound(handle.0))
    }

    pub fn snapshot(&self, handle: SessionHandle) -> Result<SessionSnapshot> {
        self.sessions
            .read()
            .get(&handle)
            .map(QuickOpenSession::snapshot)
            .ok_or(QuickOpenError::SessionNotFound(handle.0))
    }

    /// Removes the session and waits until its state is cleared.
    pub async fn end_session(&self, handle: SessionHandle) -> Result<()> {
        let removed = self.sessions.write().remove(&handle);
        let session = removed.ok_or(QuickOpenError::SessionNotFound(handle.0))?;
        session.end().await;
        Ok(())
    }

    pub fn active_sessions(&self) -> Vec<SessionHandle> {
        let mut handles: Vec<_> = self.sessions.read().keys().copied().collect();
        handles.sort_unstable();
        handles
    }
}
