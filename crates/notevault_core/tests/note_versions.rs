use notevault_core::db::open_db_in_memory;
use notevault_core::{
    DiffBase, LineKind, NoteDraft, NoteService, NoteServiceError, NoteValidationError,
    SqliteNoteRepository, UpdateOutcome,
};
use rusqlite::Connection;

fn service(conn: &mut Connection) -> NoteService<SqliteNoteRepository<'_>> {
    NoteService::new(SqliteNoteRepository::try_new(conn).unwrap())
}

fn version_rows(conn: &Connection, note_uuid: &str) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM note_versions WHERE note_uuid = ?1;",
        [note_uuid],
        |row| row.get(0),
    )
    .unwrap()
}

#[test]
fn create_yields_head_equal_to_single_initial_version() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = service(&mut conn);

    let note = service
        .create(&NoteDraft::new("Draft", "line1\nline2"))
        .unwrap();
    assert_eq!(note.created_at, note.updated_at);

    let versions = service.list_versions(note.id).unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].note_id, note.id);
    assert_eq!(versions[0].title, note.title);
    assert_eq!(versions[0].content, note.content);
    assert_eq!(versions[0].created_at, note.created_at);

    assert_eq!(service.get(note.id).unwrap(), Some(note));
}

#[test]
fn update_with_identical_draft_is_a_no_op() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = service(&mut conn);
    let draft = NoteDraft::new("Draft", "body");
    let note = service.create(&draft).unwrap();

    for _ in 0..3 {
        let outcome = service.update_with_outcome(note.id, &draft).unwrap();
        assert!(matches!(outcome, UpdateOutcome::Unchanged(_)));
        assert_eq!(outcome.note(), &note);
    }

    assert_eq!(service.list_versions(note.id).unwrap().len(), 1);
    assert_eq!(
        service.get(note.id).unwrap().unwrap().updated_at,
        note.updated_at
    );
}

#[test]
fn update_with_new_content_appends_exactly_one_version() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = service(&mut conn);
    let note = service.create(&NoteDraft::new("Draft", "v1")).unwrap();

    let updated = service
        .update(note.id, &NoteDraft::new("Draft", "v2"))
        .unwrap();
    assert_eq!(updated.content, "v2");
    assert_eq!(updated.created_at, note.created_at);
    assert!(updated.updated_at >= note.updated_at);

    let versions = service.list_versions(note.id).unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0].content, "v2");
    assert_eq!(versions[0].created_at, updated.updated_at);
    assert!(versions[0].id > versions[1].id);
}

#[test]
fn title_only_change_counts_as_change() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = service(&mut conn);
    let note = service.create(&NoteDraft::new("Draft", "same")).unwrap();

    let outcome = service
        .update_with_outcome(note.id, &NoteDraft::new("Final", "same"))
        .unwrap();
    assert!(matches!(outcome, UpdateOutcome::Appended(_)));
    assert_eq!(service.list_versions(note.id).unwrap().len(), 2);
}

#[test]
fn revert_appends_even_when_target_equals_head() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = service(&mut conn);
    let note = service.create(&NoteDraft::new("Draft", "body")).unwrap();
    let initial = service.list_versions(note.id).unwrap().remove(0);

    let reverted = service.revert(note.id, initial.id).unwrap();
    assert_eq!(reverted.title, "Draft");
    assert_eq!(reverted.content, "body");

    let versions = service.list_versions(note.id).unwrap();
    assert_eq!(versions.len(), 2);
    assert_ne!(versions[0].id, initial.id);
    assert_eq!(versions[0].content, initial.content);
}

#[test]
fn versioned_note_lifecycle_scenarios() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = service(&mut conn);

    // A: create.
    let note = service
        .create(&NoteDraft::new("Draft", "line1\nline2"))
        .unwrap();
    let history = service.list_versions(note.id).unwrap();
    assert_eq!(history.len(), 1);
    let first_version_id = history[0].id;

    // B: append a line.
    service
        .update(note.id, &NoteDraft::new("Draft", "line1\nline2\nline3"))
        .unwrap();
    let history = service.list_versions(note.id).unwrap();
    assert_eq!(history.len(), 2);
    let report = service
        .diff(note.id, history[0].id, DiffBase::PreviousVersion)
        .unwrap();
    let stats = report.stats();
    assert_eq!((stats.unchanged, stats.added, stats.removed), (2, 1, 0));
    assert_eq!(report.content_diff[2].kind, LineKind::Added);
    assert_eq!(report.content_diff[2].text, "line3");

    // C: retitle with same content.
    service
        .update(note.id, &NoteDraft::new("Final", "line1\nline2\nline3"))
        .unwrap();
    let history = service.list_versions(note.id).unwrap();
    assert_eq!(history.len(), 3);
    let report = service
        .diff(note.id, history[0].id, DiffBase::PreviousVersion)
        .unwrap();
    assert!(report.title_changed);
    assert_eq!(report.old_title.as_deref(), Some("Draft"));
    assert_eq!(report.new_title.as_deref(), Some("Final"));
    assert!(report
        .content_diff
        .iter()
        .all(|line| line.kind == LineKind::Unchanged));

    // D: revert to the first version.
    let head = service.revert(note.id, first_version_id).unwrap();
    assert_eq!(head.title, "Draft");
    assert_eq!(head.content, "line1\nline2");
    let history = service.list_versions(note.id).unwrap();
    assert_eq!(history.len(), 4);
    assert!(history.iter().any(|version| version.id == first_version_id));
    assert_eq!(history[0].title, head.title);
    assert_eq!(history[0].content, head.content);
}

#[test]
fn version_of_another_note_is_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = service(&mut conn);
    let first = service.create(&NoteDraft::new("First", "a")).unwrap();
    let second = service.create(&NoteDraft::new("Second", "b")).unwrap();
    let foreign_version = service.list_versions(first.id).unwrap().remove(0);

    assert_eq!(
        service.get_version(second.id, foreign_version.id).unwrap(),
        None
    );

    let err = service.revert(second.id, foreign_version.id).unwrap_err();
    assert!(matches!(
        err,
        NoteServiceError::VersionNotFound { note_id, version_id }
            if note_id == second.id && version_id == foreign_version.id
    ));

    let err = service
        .diff(second.id, foreign_version.id, DiffBase::CurrentHead)
        .unwrap_err();
    assert!(err.is_not_found());

    let second_head = service.get(second.id).unwrap().unwrap();
    assert_eq!(second_head.content, "b");
    assert_eq!(service.list_versions(second.id).unwrap().len(), 1);
}

#[test]
fn delete_cascades_to_versions() {
    let mut conn = open_db_in_memory().unwrap();
    let (note_id, version_id) = {
        let mut service = service(&mut conn);
        let note = service.create(&NoteDraft::new("Doomed", "v1")).unwrap();
        service
            .update(note.id, &NoteDraft::new("Doomed", "v2"))
            .unwrap();
        let version_id = service.list_versions(note.id).unwrap()[0].id;

        service.delete(note.id).unwrap();

        assert_eq!(service.get(note.id).unwrap(), None);
        assert!(matches!(
            service.list_versions(note.id).unwrap_err(),
            NoteServiceError::NoteNotFound(id) if id == note.id
        ));
        assert_eq!(service.get_version(note.id, version_id).unwrap(), None);
        assert!(service.delete(note.id).unwrap_err().is_not_found());
        (note.id, version_id)
    };

    assert_eq!(version_rows(&conn, &note_id.to_string()), 0);
    let leftover: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM note_versions WHERE id = ?1;",
            [version_id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(leftover, 0);
}

#[test]
fn delete_leaves_other_notes_untouched() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = service(&mut conn);
    let doomed = service.create(&NoteDraft::new("Doomed", "x")).unwrap();
    let kept = service.create(&NoteDraft::new("Kept", "y")).unwrap();

    service.delete(doomed.id).unwrap();

    let listed = service.list().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, kept.id);
    assert_eq!(service.list_versions(kept.id).unwrap().len(), 1);
}

#[test]
fn missing_note_is_absent_for_reads_and_an_error_for_writes() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = service(&mut conn);
    let missing = uuid::Uuid::new_v4();

    assert_eq!(service.get(missing).unwrap(), None);
    assert_eq!(service.get_version(missing, 1).unwrap(), None);
    assert!(service
        .update(missing, &NoteDraft::new("t", "c"))
        .unwrap_err()
        .is_not_found());
    assert!(service.revert(missing, 1).unwrap_err().is_not_found());
    assert!(service.delete(missing).unwrap_err().is_not_found());
    assert!(service.list_versions(missing).unwrap_err().is_not_found());
}

#[test]
fn invalid_drafts_are_rejected_without_side_effects() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = service(&mut conn);

    let err = service.create(&NoteDraft::new("  ", "body")).unwrap_err();
    assert!(matches!(
        err,
        NoteServiceError::Validation(NoteValidationError::EmptyTitle)
    ));
    assert!(service.list().unwrap().is_empty());

    let note = service.create(&NoteDraft::new("Title", "body")).unwrap();
    let err = service
        .update(note.id, &NoteDraft::new("Title", ""))
        .unwrap_err();
    assert!(matches!(
        err,
        NoteServiceError::Validation(NoteValidationError::EmptyContent)
    ));
    assert_eq!(service.list_versions(note.id).unwrap().len(), 1);
}

#[test]
fn failed_version_append_rolls_back_head_update() {
    let mut conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TRIGGER reject_poison BEFORE INSERT ON note_versions
         WHEN NEW.content = 'poison'
         BEGIN
             SELECT RAISE(ABORT, 'poisoned version');
         END;",
    )
    .unwrap();

    let mut service = service(&mut conn);
    let note = service.create(&NoteDraft::new("Title", "safe")).unwrap();

    let err = service
        .update(note.id, &NoteDraft::new("Changed", "poison"))
        .unwrap_err();
    assert!(matches!(err, NoteServiceError::Storage(_)));
    assert!(err.is_retryable());

    let head = service.get(note.id).unwrap().unwrap();
    assert_eq!(head, note);
    assert_eq!(service.list_versions(note.id).unwrap().len(), 1);
}

#[test]
fn list_returns_every_head_most_recently_updated_first() {
    let mut conn = open_db_in_memory().unwrap();
    let (older, newer) = {
        let mut service = service(&mut conn);
        let older = service.create(&NoteDraft::new("Older", "a")).unwrap();
        let newer = service.create(&NoteDraft::new("Newer", "b")).unwrap();
        (older.id, newer.id)
    };

    conn.execute(
        "UPDATE notes SET updated_at = 1000 WHERE uuid = ?1;",
        [older.to_string()],
    )
    .unwrap();
    conn.execute(
        "UPDATE notes SET updated_at = 2000 WHERE uuid = ?1;",
        [newer.to_string()],
    )
    .unwrap();

    let service = service(&mut conn);
    let listed = service.list().unwrap();
    let ids: Vec<_> = listed.iter().map(|note| note.id).collect();
    assert_eq!(ids, vec![newer, older]);
}

#[test]
fn writes_and_reads_return_head_with_matching_history() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = service(&mut conn);

    let created = service
        .create_with_history(&NoteDraft::new("Draft", "v1"))
        .unwrap();
    assert_eq!(created.versions.len(), 1);
    assert_eq!(created.versions[0].content, created.note.content);
    let note_id = created.note.id;

    let unchanged = service
        .update_with_outcome(note_id, &NoteDraft::new("Draft", "v1"))
        .unwrap()
        .into_history();
    assert_eq!(unchanged, created);

    let updated = service
        .update_with_outcome(note_id, &NoteDraft::new("Draft", "v2"))
        .unwrap()
        .into_history();
    assert_eq!(updated.versions.len(), 2);
    assert_eq!(updated.versions[0].content, "v2");
    assert_eq!(updated.versions[0].created_at, updated.note.updated_at);

    let reverted = service
        .revert_with_history(note_id, created.versions[0].id)
        .unwrap();
    assert_eq!(reverted.note.content, "v1");
    assert_eq!(reverted.versions.len(), 3);
    assert_eq!(reverted.versions[0].content, "v1");

    let fetched = service.get_with_history(note_id).unwrap().unwrap();
    assert_eq!(fetched, reverted);

    let other = service.create(&NoteDraft::new("Other", "x")).unwrap();
    let listed = service.list_with_history().unwrap();
    let heads: Vec<_> = listed.iter().map(|history| history.note.clone()).collect();
    assert_eq!(heads, service.list().unwrap());
    for history in &listed {
        assert_eq!(history.versions[0].title, history.note.title);
        assert_eq!(history.versions[0].content, history.note.content);
        assert!(history
            .versions
            .iter()
            .all(|version| version.note_id == history.note.id));
    }
    assert!(listed.iter().any(|history| history.note.id == other.id));

    assert_eq!(service.get_with_history(uuid::Uuid::new_v4()).unwrap(), None);
}
