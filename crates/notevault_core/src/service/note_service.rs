//! Versioned note use-case service.
//!
//! # Responsibility
//! - Provide the version store operations: create, get, list, update,
//!   delete, list/get versions, revert, and diff.
//! - Translate repository errors into caller-facing error kinds.
//! - Emit metadata-only diagnostic events for every write.
//!
//! # Invariants
//! - `update` with a draft equal to the head appends nothing.
//! - `revert` always appends, even when the target equals the head.
//! - Diffing never mutates state.
//! - Log lines carry ids and counts only, never titles or contents.

use crate::diff::{compare, DiffReport};
use crate::model::note::{Note, NoteDraft, NoteId, NoteValidationError, NoteVersion, VersionId};
use crate::repo::note_repo::{DiffBase, NoteHistory, NoteRepository, RepoError, UpdateOutcome};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

pub type ServiceResult<T> = Result<T, NoteServiceError>;

/// Service error for versioned note use-cases.
#[derive(Debug)]
pub enum NoteServiceError {
    /// Title/content failed shape validation.
    Validation(NoteValidationError),
    /// Target note does not exist.
    NoteNotFound(NoteId),
    /// Version does not exist or belongs to another note.
    VersionNotFound {
        note_id: NoteId,
        version_id: VersionId,
    },
    /// Diff against the previous version requested for the oldest version.
    PreviousVersionNotFound {
        note_id: NoteId,
        version_id: VersionId,
    },
    /// Persistence-layer failure. Nothing partial was committed.
    Storage(RepoError),
}

impl NoteServiceError {
    /// True for every missing-resource variant.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NoteNotFound(_)
                | Self::VersionNotFound { .. }
                | Self::PreviousVersionNotFound { .. }
        )
    }

    /// True when the caller may retry the same call unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(RepoError::Db(_)))
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NoteNotFound(_) => "note_not_found",
            Self::VersionNotFound { .. } => "version_not_found",
            Self::PreviousVersionNotFound { .. } => "previous_version_not_found",
            Self::Storage(_) => "storage_failure",
        }
    }
}

impl Display for NoteServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "invalid note: {err}"),
            Self::NoteNotFound(note_id) => write!(f, "note not found: {note_id}"),
            Self::VersionNotFound {
                note_id,
                version_id,
            } => write!(f, "version {version_id} not found for note {note_id}"),
            Self::PreviousVersionNotFound {
                note_id,
                version_id,
            } => write!(
                f,
                "no previous version before version {version_id} of note {note_id}"
            ),
            Self::Storage(err) => write!(f, "storage failure: {err}"),
        }
    }
}

impl Error for NoteServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for NoteServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NoteNotFound(note_id) => Self::NoteNotFound(note_id),
            RepoError::VersionNotFound {
                note_id,
                version_id,
            } => Self::VersionNotFound {
                note_id,
                version_id,
            },
            RepoError::PreviousVersionNotFound {
                note_id,
                version_id,
            } => Self::PreviousVersionNotFound {
                note_id,
                version_id,
            },
            other => Self::Storage(other),
        }
    }
}

impl From<NoteValidationError> for NoteServiceError {
    fn from(value: NoteValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Note service facade over repository implementations.
pub struct NoteService<R: NoteRepository> {
    repo: R,
}

impl<R: NoteRepository> NoteService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a note together with its initial version.
    pub fn create(&mut self, draft: &NoteDraft) -> ServiceResult<Note> {
        self.create_with_history(draft).map(|history| history.note)
    }

    /// Same as [`Self::create`], also returning the one-entry history.
    pub fn create_with_history(&mut self, draft: &NoteDraft) -> ServiceResult<NoteHistory> {
        let started_at = Instant::now();
        let note_id = Uuid::new_v4();
        let result = self.repo.create_note(note_id, draft).map_err(Into::into);
        log_write("note_create", note_id, started_at, &result, |history| {
            format!("outcome=appended versions={}", history.versions.len())
        });
        result
    }

    /// Gets the current head, or `None` when the note does not exist.
    pub fn get(&self, note_id: NoteId) -> ServiceResult<Option<Note>> {
        Ok(self.repo.get_note(note_id)?)
    }

    /// Gets the head and its versions from one consistent read.
    pub fn get_with_history(&self, note_id: NoteId) -> ServiceResult<Option<NoteHistory>> {
        Ok(self.repo.get_note_with_versions(note_id)?)
    }

    /// Lists every current head.
    pub fn list(&self) -> ServiceResult<Vec<Note>> {
        Ok(self.repo.list_notes()?)
    }

    /// Lists every head with its versions from one consistent read.
    pub fn list_with_history(&self) -> ServiceResult<Vec<NoteHistory>> {
        Ok(self.repo.list_notes_with_versions()?)
    }

    /// Updates the head, appending a version only when something changed.
    pub fn update(&mut self, note_id: NoteId, draft: &NoteDraft) -> ServiceResult<Note> {
        self.update_with_outcome(note_id, draft)
            .map(UpdateOutcome::into_note)
    }

    /// Same as [`Self::update`], reporting whether a version was appended.
    pub fn update_with_outcome(
        &mut self,
        note_id: NoteId,
        draft: &NoteDraft,
    ) -> ServiceResult<UpdateOutcome> {
        let started_at = Instant::now();
        let result = self.repo.update_note(note_id, draft).map_err(Into::into);
        log_write("note_update", note_id, started_at, &result, |outcome| {
            match outcome {
                UpdateOutcome::Unchanged(_) => "outcome=unchanged".to_string(),
                UpdateOutcome::Appended(appended) => {
                    format!("outcome=appended version_id={}", appended.version.id)
                }
            }
        });
        result
    }

    /// Deletes a note and all of its versions.
    pub fn delete(&mut self, note_id: NoteId) -> ServiceResult<()> {
        let started_at = Instant::now();
        let result = self.repo.delete_note(note_id).map_err(Into::into);
        log_write("note_delete", note_id, started_at, &result, |removed| {
            format!("removed_versions={removed}")
        });
        result.map(|_| ())
    }

    /// Lists versions of a note, newest first.
    pub fn list_versions(&self, note_id: NoteId) -> ServiceResult<Vec<NoteVersion>> {
        Ok(self.repo.list_versions(note_id)?)
    }

    /// Gets one version scoped to its note.
    pub fn get_version(
        &self,
        note_id: NoteId,
        version_id: VersionId,
    ) -> ServiceResult<Option<NoteVersion>> {
        Ok(self.repo.get_version(note_id, version_id)?)
    }

    /// Copies a historical version forward as a new head and version.
    pub fn revert(&mut self, note_id: NoteId, version_id: VersionId) -> ServiceResult<Note> {
        self.revert_with_history(note_id, version_id)
            .map(|history| history.note)
    }

    /// Same as [`Self::revert`], returning the history read in the write transaction.
    pub fn revert_with_history(
        &mut self,
        note_id: NoteId,
        version_id: VersionId,
    ) -> ServiceResult<NoteHistory> {
        let started_at = Instant::now();
        let result = self
            .repo
            .revert_note(note_id, version_id)
            .map_err(Into::into);
        log_write("note_revert", note_id, started_at, &result, |appended| {
            format!(
                "source_version_id={} version_id={}",
                version_id, appended.version.id
            )
        });
        result.map(|appended| appended.history)
    }

    /// Compares one version (new side) against the head or its predecessor.
    pub fn diff(
        &self,
        note_id: NoteId,
        version_id: VersionId,
        base: DiffBase,
    ) -> ServiceResult<DiffReport> {
        let sides = self.repo.load_diff_sides(note_id, version_id, base)?;
        Ok(compare(sides.baseline.snapshot(), sides.target.snapshot()))
    }
}

fn log_write<T>(
    event: &str,
    note_id: NoteId,
    started_at: Instant,
    result: &ServiceResult<T>,
    describe: impl FnOnce(&T) -> String,
) {
    let duration_ms = started_at.elapsed().as_millis();
    match result {
        Ok(value) => info!(
            "event={event} module=service status=ok note_id={note_id} {} duration_ms={duration_ms}",
            describe(value)
        ),
        Err(err) if err.is_not_found() || matches!(err, NoteServiceError::Validation(_)) => warn!(
            "event={event} module=service status=rejected note_id={note_id} error_code={} duration_ms={duration_ms}",
            err.code()
        ),
        Err(err) => error!(
            "event={event} module=service status=error note_id={note_id} error_code={} duration_ms={duration_ms} error={err}",
            err.code()
        ),
    }
}
