//! Core domain logic for notevault.
//! This crate is the single source of truth for version-history invariants.

pub mod db;
pub mod diff;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use diff::{compare, DiffReport, DiffStats, LineChange, LineKind};
pub use logging::{default_log_level, init_logging, logging_status, LogConfig, LoggingStatus};
pub use model::note::{
    Note, NoteDraft, NoteId, NoteValidationError, NoteVersion, Snapshot, VersionId,
    TITLE_MAX_CHARS,
};
pub use repo::note_repo::{
    AppendedVersion, DiffBase, DiffBaseline, DiffSides, NoteHistory, NoteRepository, RepoError,
    RepoResult, SqliteNoteRepository, UpdateOutcome,
};
pub use service::note_service::{NoteService, NoteServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
