//! Line-level difference between two note snapshots.
//!
//! # Responsibility
//! - Compare titles by exact string equality.
//! - Align content lines with a longest-common-subsequence walk.
//!
//! # Invariants
//! - Pure: no storage access, no clock, no randomness.
//! - Identical inputs always yield byte-identical reports.
//! - Output kinds are limited to `unchanged`, `added`, `removed`.

mod engine;
mod model;

pub use engine::{compare, split_lines};
pub use model::{DiffReport, DiffStats, LineChange, LineKind};
