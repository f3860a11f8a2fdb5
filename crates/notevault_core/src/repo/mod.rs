//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for notes and versions.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Every write validates its draft before SQL mutations.
//! - A head change and its version append commit in one transaction.
//! - Repository APIs return semantic errors (`NoteNotFound`, `VersionNotFound`)
//!   in addition to DB transport errors.

pub mod note_repo;
