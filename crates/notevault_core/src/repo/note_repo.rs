//! Note/version repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist note heads and their append-only version history.
//! - Own the atomic head-update + version-append unit used by update/revert.
//! - Scope every version lookup by `(note_id, version_id)`.
//!
//! # Invariants
//! - Writes run in `IMMEDIATE` transactions; a dropped transaction rolls back.
//! - Version timestamps never decrease within one note.
//! - History order is `created_at DESC, id DESC`.
//! - Deleting a note removes its versions in the same transaction.

use crate::db::DbError;
use crate::model::note::{
    validate_fields, Note, NoteDraft, NoteId, NoteValidationError, NoteVersion, Snapshot,
    VersionId,
};
use rusqlite::{params, Connection, Row, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

const NOTE_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    content,
    created_at,
    updated_at
FROM notes";

const VERSION_SELECT_SQL: &str = "SELECT
    id,
    note_uuid,
    title,
    content,
    created_at
FROM note_versions";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for note/version persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(NoteValidationError),
    Db(DbError),
    NoteNotFound(NoteId),
    VersionNotFound {
        note_id: NoteId,
        version_id: VersionId,
    },
    PreviousVersionNotFound {
        note_id: NoteId,
        version_id: VersionId,
    },
    InvalidData(String),
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::VersionNotFound {
                note_id,
                version_id,
            } => write!(f, "version {version_id} not found for note {note_id}"),
            Self::PreviousVersionNotFound {
                note_id,
                version_id,
            } => write!(
                f,
                "no version precedes version {version_id} of note {note_id}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted note data: {message}"),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NoteValidationError> for RepoError {
    fn from(value: NoteValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Baseline selector for comparing one version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiffBase {
    /// Compare against the note head.
    #[default]
    CurrentHead,
    /// Compare against the version immediately preceding the target.
    PreviousVersion,
}

/// Old side of a comparison, read together with the target version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffBaseline {
    Head(Note),
    Version(NoteVersion),
}

impl DiffBaseline {
    pub fn snapshot(&self) -> Snapshot<'_> {
        match self {
            Self::Head(note) => note.snapshot(),
            Self::Version(version) => version.snapshot(),
        }
    }
}

/// Both sides of a comparison, loaded in one read transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffSides {
    pub baseline: DiffBaseline,
    pub target: NoteVersion,
}

/// Note head with its full history, read in one transaction.
///
/// `versions` is newest first, so `versions[0]` always matches `note`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteHistory {
    pub note: Note,
    pub versions: Vec<NoteVersion>,
}

/// New head and history plus the version appended with them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendedVersion {
    pub history: NoteHistory,
    pub version: NoteVersion,
}

impl AppendedVersion {
    pub fn note(&self) -> &Note {
        &self.history.note
    }
}

/// Result of a conditional head update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Draft equalled the head; nothing was written.
    Unchanged(NoteHistory),
    Appended(AppendedVersion),
}

impl UpdateOutcome {
    pub fn note(&self) -> &Note {
        match self {
            Self::Unchanged(history) => &history.note,
            Self::Appended(appended) => appended.note(),
        }
    }

    pub fn into_history(self) -> NoteHistory {
        match self {
            Self::Unchanged(history) => history,
            Self::Appended(appended) => appended.history,
        }
    }

    pub fn into_note(self) -> Note {
        self.into_history().note
    }
}

/// Repository interface for the versioned note store.
pub trait NoteRepository {
    /// Inserts a note head and its initial version with one shared timestamp.
    fn create_note(&mut self, note_id: NoteId, draft: &NoteDraft) -> RepoResult<NoteHistory>;
    /// Gets one note head by id.
    fn get_note(&self, note_id: NoteId) -> RepoResult<Option<Note>>;
    /// Gets one note head together with its versions.
    fn get_note_with_versions(&self, note_id: NoteId) -> RepoResult<Option<NoteHistory>>;
    /// Lists all note heads sorted by `updated_at DESC, uuid ASC`.
    fn list_notes(&self) -> RepoResult<Vec<Note>>;
    /// Lists all note heads, each with its versions, from one snapshot.
    fn list_notes_with_versions(&self) -> RepoResult<Vec<NoteHistory>>;
    /// Replaces the head and appends a version unless the draft equals the head.
    fn update_note(&mut self, note_id: NoteId, draft: &NoteDraft) -> RepoResult<UpdateOutcome>;
    /// Copies a historical version forward as the new head. Always appends.
    fn revert_note(&mut self, note_id: NoteId, version_id: VersionId)
        -> RepoResult<AppendedVersion>;
    /// Deletes a note and all its versions. Returns the number of versions removed.
    fn delete_note(&mut self, note_id: NoteId) -> RepoResult<usize>;
    /// Lists versions of an existing note, newest first.
    fn list_versions(&self, note_id: NoteId) -> RepoResult<Vec<NoteVersion>>;
    /// Gets one version scoped to its owning note.
    fn get_version(&self, note_id: NoteId, version_id: VersionId)
        -> RepoResult<Option<NoteVersion>>;
    /// Loads a target version and its comparison baseline consistently.
    fn load_diff_sides(
        &self,
        note_id: NoteId,
        version_id: VersionId,
        base: DiffBase,
    ) -> RepoResult<DiffSides>;
}

/// SQLite-backed note/version repository.
pub struct SqliteNoteRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteNoteRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl NoteRepository for SqliteNoteRepository<'_> {
    fn create_note(&mut self, note_id: NoteId, draft: &NoteDraft) -> RepoResult<NoteHistory> {
        draft.validate()?;

        let created_at = now_epoch_ms();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO notes (uuid, title, content, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4);",
            params![
                note_id.to_string(),
                draft.title.as_str(),
                draft.content.as_str(),
                created_at,
            ],
        )?;
        let version = insert_version(&tx, note_id, draft, created_at)?;
        tx.commit()?;

        Ok(NoteHistory {
            note: Note {
                id: note_id,
                title: draft.title.clone(),
                content: draft.content.clone(),
                created_at,
                updated_at: created_at,
            },
            versions: vec![version],
        })
    }

    fn get_note(&self, note_id: NoteId) -> RepoResult<Option<Note>> {
        select_note(self.conn, note_id)
    }

    fn get_note_with_versions(&self, note_id: NoteId) -> RepoResult<Option<NoteHistory>> {
        let tx = self.conn.unchecked_transaction()?;
        let Some(note) = select_note(&tx, note_id)? else {
            return Ok(None);
        };
        let versions = select_versions(&tx, note_id)?;
        tx.commit()?;
        Ok(Some(NoteHistory { note, versions }))
    }

    fn list_notes(&self) -> RepoResult<Vec<Note>> {
        select_notes(self.conn)
    }

    fn list_notes_with_versions(&self) -> RepoResult<Vec<NoteHistory>> {
        let tx = self.conn.unchecked_transaction()?;
        let histories = select_notes(&tx)?
            .into_iter()
            .map(|note| {
                select_versions(&tx, note.id).map(|versions| NoteHistory { note, versions })
            })
            .collect::<RepoResult<Vec<_>>>()?;
        tx.commit()?;
        Ok(histories)
    }

    fn update_note(&mut self, note_id: NoteId, draft: &NoteDraft) -> RepoResult<UpdateOutcome> {
        draft.validate()?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let head = select_note(&tx, note_id)?.ok_or(RepoError::NoteNotFound(note_id))?;
        if head.matches(draft) {
            let versions = select_versions(&tx, note_id)?;
            return Ok(UpdateOutcome::Unchanged(NoteHistory {
                note: head,
                versions,
            }));
        }

        let appended = advance_head(&tx, &head, draft)?;
        tx.commit()?;
        Ok(UpdateOutcome::Appended(appended))
    }

    fn revert_note(
        &mut self,
        note_id: NoteId,
        version_id: VersionId,
    ) -> RepoResult<AppendedVersion> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let head = select_note(&tx, note_id)?.ok_or(RepoError::NoteNotFound(note_id))?;
        let target = select_version(&tx, note_id, version_id)?.ok_or(
            RepoError::VersionNotFound {
                note_id,
                version_id,
            },
        )?;

        let appended = advance_head(&tx, &head, &NoteDraft::from(&target))?;
        tx.commit()?;
        Ok(appended)
    }

    fn delete_note(&mut self, note_id: NoteId) -> RepoResult<usize> {
        let note_uuid = note_id.to_string();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let removed_versions = tx.execute(
            "DELETE FROM note_versions WHERE note_uuid = ?1;",
            [note_uuid.as_str()],
        )?;
        let removed_notes = tx.execute("DELETE FROM notes WHERE uuid = ?1;", [note_uuid.as_str()])?;
        if removed_notes == 0 {
            return Err(RepoError::NoteNotFound(note_id));
        }

        tx.commit()?;
        Ok(removed_versions)
    }

    fn list_versions(&self, note_id: NoteId) -> RepoResult<Vec<NoteVersion>> {
        let tx = self.conn.unchecked_transaction()?;
        if !note_exists(&tx, note_id)? {
            return Err(RepoError::NoteNotFound(note_id));
        }
        let versions = select_versions(&tx, note_id)?;
        tx.commit()?;
        Ok(versions)
    }

    fn get_version(
        &self,
        note_id: NoteId,
        version_id: VersionId,
    ) -> RepoResult<Option<NoteVersion>> {
        select_version(self.conn, note_id, version_id)
    }

    fn load_diff_sides(
        &self,
        note_id: NoteId,
        version_id: VersionId,
        base: DiffBase,
    ) -> RepoResult<DiffSides> {
        let tx = self.conn.unchecked_transaction()?;
        let head = select_note(&tx, note_id)?.ok_or(RepoError::NoteNotFound(note_id))?;
        let target = select_version(&tx, note_id, version_id)?.ok_or(
            RepoError::VersionNotFound {
                note_id,
                version_id,
            },
        )?;

        let baseline = match base {
            DiffBase::CurrentHead => DiffBaseline::Head(head),
            DiffBase::PreviousVersion => {
                let previous = select_previous_version(&tx, &target)?.ok_or(
                    RepoError::PreviousVersionNotFound {
                        note_id,
                        version_id,
                    },
                )?;
                DiffBaseline::Version(previous)
            }
        };

        tx.commit()?;
        Ok(DiffSides { baseline, target })
    }
}

/// Writes the new head, appends the matching version, and reloads history.
///
/// Must run inside the caller's write transaction.
fn advance_head(conn: &Connection, head: &Note, draft: &NoteDraft) -> RepoResult<AppendedVersion> {
    let note_uuid = head.id.to_string();
    let latest: Option<i64> = conn.query_row(
        "SELECT MAX(created_at) FROM note_versions WHERE note_uuid = ?1;",
        [note_uuid.as_str()],
        |row| row.get(0),
    )?;
    let created_at = latest.map_or_else(now_epoch_ms, |latest| now_epoch_ms().max(latest));

    let changed = conn.execute(
        "UPDATE notes
         SET
            title = ?2,
            content = ?3,
            updated_at = ?4
         WHERE uuid = ?1;",
        params![
            note_uuid.as_str(),
            draft.title.as_str(),
            draft.content.as_str(),
            created_at,
        ],
    )?;
    if changed == 0 {
        return Err(RepoError::NoteNotFound(head.id));
    }

    let version = insert_version(conn, head.id, draft, created_at)?;
    let note = Note {
        id: head.id,
        title: draft.title.clone(),
        content: draft.content.clone(),
        created_at: head.created_at,
        updated_at: created_at,
    };
    let versions = select_versions(conn, head.id)?;
    Ok(AppendedVersion {
        history: NoteHistory { note, versions },
        version,
    })
}

fn insert_version(
    conn: &Connection,
    note_id: NoteId,
    draft: &NoteDraft,
    created_at: i64,
) -> RepoResult<NoteVersion> {
    conn.execute(
        "INSERT INTO note_versions (note_uuid, title, content, created_at)
         VALUES (?1, ?2, ?3, ?4);",
        params![
            note_id.to_string(),
            draft.title.as_str(),
            draft.content.as_str(),
            created_at,
        ],
    )?;

    Ok(NoteVersion {
        id: conn.last_insert_rowid(),
        note_id,
        title: draft.title.clone(),
        content: draft.content.clone(),
        created_at,
    })
}

fn select_note(conn: &Connection, note_id: NoteId) -> RepoResult<Option<Note>> {
    let mut stmt = conn.prepare(&format!("{NOTE_SELECT_SQL} WHERE uuid = ?1;"))?;
    let mut rows = stmt.query([note_id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_note_row(row)?));
    }
    Ok(None)
}

fn select_notes(conn: &Connection) -> RepoResult<Vec<Note>> {
    let mut stmt =
        conn.prepare(&format!("{NOTE_SELECT_SQL} ORDER BY updated_at DESC, uuid ASC;"))?;
    let mut rows = stmt.query([])?;
    let mut notes = Vec::new();
    while let Some(row) = rows.next()? {
        notes.push(parse_note_row(row)?);
    }
    Ok(notes)
}

/// Versions of one note, newest first.
fn select_versions(conn: &Connection, note_id: NoteId) -> RepoResult<Vec<NoteVersion>> {
    let mut stmt = conn.prepare(&format!(
        "{VERSION_SELECT_SQL}
         WHERE note_uuid = ?1
         ORDER BY created_at DESC, id DESC;"
    ))?;
    let mut rows = stmt.query([note_id.to_string()])?;
    let mut versions = Vec::new();
    while let Some(row) = rows.next()? {
        versions.push(parse_version_row(row)?);
    }
    Ok(versions)
}

fn select_version(
    conn: &Connection,
    note_id: NoteId,
    version_id: VersionId,
) -> RepoResult<Option<NoteVersion>> {
    let mut stmt = conn.prepare(&format!(
        "{VERSION_SELECT_SQL}
         WHERE note_uuid = ?1
           AND id = ?2;"
    ))?;
    let mut rows = stmt.query(params![note_id.to_string(), version_id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_version_row(row)?));
    }
    Ok(None)
}

/// Newest version strictly before `target` by `(created_at, id)`.
fn select_previous_version(
    conn: &Connection,
    target: &NoteVersion,
) -> RepoResult<Option<NoteVersion>> {
    let mut stmt = conn.prepare(&format!(
        "{VERSION_SELECT_SQL}
         WHERE note_uuid = ?1
           AND (created_at < ?2 OR (created_at = ?2 AND id < ?3))
         ORDER BY created_at DESC, id DESC
         LIMIT 1;"
    ))?;
    let mut rows = stmt.query(params![
        target.note_id.to_string(),
        target.created_at,
        target.id
    ])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_version_row(row)?));
    }
    Ok(None)
}

fn note_exists(conn: &Connection, note_id: NoteId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM notes WHERE uuid = ?1);",
        [note_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn parse_note_row(row: &Row<'_>) -> RepoResult<Note> {
    let uuid_text: String = row.get("uuid")?;
    let id = parse_uuid(&uuid_text, "notes.uuid")?;
    let note = Note {
        id,
        title: row.get("title")?,
        content: row.get("content")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    validate_fields(&note.title, &note.content)
        .map_err(|err| RepoError::InvalidData(format!("note {id}: {err}")))?;
    Ok(note)
}

fn parse_version_row(row: &Row<'_>) -> RepoResult<NoteVersion> {
    let uuid_text: String = row.get("note_uuid")?;
    let note_id = parse_uuid(&uuid_text, "note_versions.note_uuid")?;
    let version = NoteVersion {
        id: row.get("id")?,
        note_id,
        title: row.get("title")?,
        content: row.get("content")?,
        created_at: row.get("created_at")?,
    };
    validate_fields(&version.title, &version.content).map_err(|err| {
        RepoError::InvalidData(format!("version {} of note {note_id}: {err}", version.id))
    })?;
    Ok(version)
}

fn parse_uuid(value: &str, column: &str) -> RepoResult<NoteId> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

/// Current wall-clock time in Unix epoch milliseconds.
pub(crate) fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX)
        })
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    const REQUIRED: &[(&str, &[&str])] = &[
        (
            "notes",
            &["uuid", "title", "content", "created_at", "updated_at"],
        ),
        (
            "note_versions",
            &["id", "note_uuid", "title", "content", "created_at"],
        ),
    ];

    for &(table, columns) in REQUIRED {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
