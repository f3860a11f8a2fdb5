//! Shared handler state and blocking service access.
//!
//! # Invariants
//! - Each call opens its own SQLite connection on the blocking pool.
//! - Async worker threads never run SQLite I/O.

use notevault_core::db::{open_db, DbError};
use notevault_core::{NoteService, NoteServiceError, SqliteNoteRepository};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinError;

/// State cloned into every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    db_path: Arc<PathBuf>,
}

impl AppState {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: Arc::new(db_path.into()),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Runs `f` against a fresh note service on the blocking pool.
    pub async fn with_service<T, F>(&self, f: F) -> Result<T, CallError>
    where
        T: Send + 'static,
        F: FnOnce(&mut NoteService<SqliteNoteRepository<'_>>) -> Result<T, NoteServiceError>
            + Send
            + 'static,
    {
        let db_path = Arc::clone(&self.db_path);
        tokio::task::spawn_blocking(move || {
            let mut conn = open_db(db_path.as_path()).map_err(CallError::Open)?;
            let repo = SqliteNoteRepository::try_new(&mut conn).map_err(NoteServiceError::from)?;
            let mut service = NoteService::new(repo);
            f(&mut service).map_err(CallError::Service)
        })
        .await
        .map_err(CallError::Join)?
    }
}

/// Failure of one service call made by a handler.
#[derive(Debug)]
pub enum CallError {
    /// Database could not be opened or migrated.
    Open(DbError),
    Service(NoteServiceError),
    /// Blocking task panicked or was cancelled.
    Join(JoinError),
}

impl Display for CallError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open(err) => write!(f, "database unavailable: {err}"),
            Self::Service(err) => write!(f, "{err}"),
            Self::Join(err) => write!(f, "request task failed: {err}"),
        }
    }
}

impl Error for CallError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Open(err) => Some(err),
            Self::Service(err) => Some(err),
            Self::Join(err) => Some(err),
        }
    }
}

impl From<NoteServiceError> for CallError {
    fn from(value: NoteServiceError) -> Self {
        Self::Service(value)
    }
}
