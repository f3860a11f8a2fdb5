//! Note and version domain model.
//!
//! # Responsibility
//! - Define the canonical `Note` head record and `NoteVersion` snapshot.
//! - Provide `NoteDraft` validation for every write path.
//!
//! # Invariants
//! - `NoteId` is stable for the note lifetime and never reused.
//! - `VersionId` is allocated by storage in strictly increasing order.
//! - Title and content are never blank on a persisted record.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Maximum title length, counted in Unicode scalar values.
pub const TITLE_MAX_CHARS: usize = 100;

/// Stable identifier of a note.
pub type NoteId = Uuid;

/// Storage-allocated identifier of a version.
///
/// Doubles as the insertion sequence used to order versions created within
/// the same clock tick.
pub type VersionId = i64;

/// Borrowed (title, content) pair compared by the diff engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot<'a> {
    pub title: &'a str,
    pub content: &'a str,
}

/// Mutable head of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub content: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds. Equals the newest version's `created_at`.
    pub updated_at: i64,
}

impl Note {
    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            title: &self.title,
            content: &self.content,
        }
    }

    /// Returns whether the head already holds exactly this title and content.
    pub fn matches(&self, draft: &NoteDraft) -> bool {
        self.title == draft.title && self.content == draft.content
    }
}

/// Immutable snapshot of a note at one point in its history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteVersion {
    pub id: VersionId,
    pub note_id: NoteId,
    pub title: String,
    pub content: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl NoteVersion {
    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            title: &self.title,
            content: &self.content,
        }
    }

    /// Ordering key for history: timestamp first, storage sequence second.
    pub fn history_key(&self) -> (i64, VersionId) {
        (self.created_at, self.id)
    }
}

/// Caller-supplied title and content for create/update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }

    /// Validates shape rules shared by all write paths.
    ///
    /// # Errors
    /// - `EmptyTitle` when the title is blank after trim.
    /// - `TitleTooLong` when the title exceeds [`TITLE_MAX_CHARS`].
    /// - `EmptyContent` when the content is blank after trim.
    pub fn validate(&self) -> Result<(), NoteValidationError> {
        validate_fields(&self.title, &self.content)
    }
}

impl From<&NoteVersion> for NoteDraft {
    fn from(version: &NoteVersion) -> Self {
        Self::new(version.title.clone(), version.content.clone())
    }
}

/// Validation failures for note title/content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteValidationError {
    EmptyTitle,
    TitleTooLong { max: usize, actual: usize },
    EmptyContent,
}

impl Display for NoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "title cannot be empty"),
            Self::TitleTooLong { max, actual } => {
                write!(f, "title must be at most {max} characters, got {actual}")
            }
            Self::EmptyContent => write!(f, "content cannot be empty"),
        }
    }
}

impl Error for NoteValidationError {}

pub(crate) fn validate_fields(title: &str, content: &str) -> Result<(), NoteValidationError> {
    if title.trim().is_empty() {
        return Err(NoteValidationError::EmptyTitle);
    }

    let title_chars = title.chars().count();
    if title_chars > TITLE_MAX_CHARS {
        return Err(NoteValidationError::TitleTooLong {
            max: TITLE_MAX_CHARS,
            actual: title_chars,
        });
    }

    if content.trim().is_empty() {
        return Err(NoteValidationError::EmptyContent);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{NoteDraft, NoteValidationError, TITLE_MAX_CHARS};

    #[test]
    fn validate_accepts_regular_draft() {
        assert!(NoteDraft::new("Draft", "line1\nline2").validate().is_ok());
    }

    #[test]
    fn validate_rejects_blank_title_and_content() {
        assert_eq!(
            NoteDraft::new("   ", "body").validate(),
            Err(NoteValidationError::EmptyTitle)
        );
        assert_eq!(
            NoteDraft::new("title", "\n\t ").validate(),
            Err(NoteValidationError::EmptyContent)
        );
    }

    #[test]
    fn validate_counts_title_length_in_chars() {
        let at_limit = "é".repeat(TITLE_MAX_CHARS);
        assert!(NoteDraft::new(at_limit, "body").validate().is_ok());

        let over_limit = "x".repeat(TITLE_MAX_CHARS + 1);
        assert_eq!(
            NoteDraft::new(over_limit, "body").validate(),
            Err(NoteValidationError::TitleTooLong {
                max: TITLE_MAX_CHARS,
                actual: TITLE_MAX_CHARS + 1,
            })
        );
    }
}
