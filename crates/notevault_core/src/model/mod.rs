//! Domain model for versioned notes.
//!
//! # Responsibility
//! - Define the mutable note head and its immutable version snapshots.
//! - Own input validation shared by the store and the HTTP layer.
//!
//! # Invariants
//! - A note head always equals the newest version of that note.
//! - Versions are never mutated after creation.

pub mod note;
