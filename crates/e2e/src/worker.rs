//! Per-worker session context
//!
//! Each worker owns one `WorkerContext` and hands it to every test it runs.
//! It holds at most one session at a time and keeps that session's id readable
//! after the session closes, so listeners can report against it.

use std::sync::Arc;

use gridrun_common::{Credentials, SessionId};
use tracing::warn;

use crate::error::E2eResult;
use crate::session::SessionHandle;

/// Exposes the id of the session the last test ran against
pub trait SessionIdProvider {
    fn session_id(&self) -> Option<&SessionId>;
}

/// Exposes the account used to talk to the grid
pub trait AuthenticationProvider {
    fn credentials(&self) -> &Credentials;
}

struct SessionEntry {
    id: SessionId,
    handle: Option<SessionHandle>,
}

pub struct WorkerContext {
    worker: usize,
    credentials: Arc<Credentials>,
    entry: Option<SessionEntry>,
}

impl WorkerContext {
    pub fn new(worker: usize, credentials: Arc<Credentials>) -> Self {
        Self {
            worker,
            credentials,
            entry: None,
        }
    }

    pub fn worker(&self) -> usize {
        self.worker
    }

    /// Register `handle` as this worker's session.
    ///
    /// A still-open previous handle is returned to the caller unclosed.
    pub fn set(&mut self, handle: SessionHandle) -> Option<SessionHandle> {
        let entry = SessionEntry {
            id: handle.id().clone(),
            handle: Some(handle),
        };
        self.entry.replace(entry).and_then(|previous| previous.handle)
    }

    /// The open session, if any
    pub fn get(&self) -> Option<&SessionHandle> {
        self.entry.as_ref().and_then(|entry| entry.handle.as_ref())
    }

    /// Id of the most recently registered session, open or closed
    pub fn id(&self) -> Option<&SessionId> {
        self.entry.as_ref().map(|entry| &entry.id)
    }

    /// Forget the previous test's session before the next one starts
    pub fn clear(&mut self) -> Option<SessionHandle> {
        self.entry.take().and_then(|entry| entry.handle)
    }

    /// Close the open session, keeping its id for reporting
    pub async fn close_current(&mut self) -> E2eResult<()> {
        let handle = self.entry.as_mut().and_then(|entry| entry.handle.take());
        match handle {
            Some(handle) => handle.quit().await,
            None => Ok(()),
        }
    }
}

impl SessionIdProvider for WorkerContext {
    fn session_id(&self) -> Option<&SessionId> {
        self.id()
    }
}

impl AuthenticationProvider for WorkerContext {
    fn credentials(&self) -> &Credentials {
        &self.credentials
    }
}

impl Drop for WorkerContext {
    fn drop(&mut self) {
        if self.get().is_some() {
            warn!("Worker {} shut down with an open session", self.worker);
        }
    }
}
