//! Diff report output types.
//!
//! Field names follow the external JSON contract (`type`/`content` per line).

use serde::{Deserialize, Serialize};

/// Classification of one compared line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Unchanged,
    Added,
    Removed,
}

/// One output record of the content comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineChange {
    /// Serialized as `type` to match external schema naming.
    #[serde(rename = "type")]
    pub kind: LineKind,
    /// Line text without its terminator.
    #[serde(rename = "content")]
    pub text: String,
}

impl LineChange {
    pub fn new(kind: LineKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Structured difference between an old and a new snapshot.
///
/// `old_title`/`new_title` are populated only when `title_changed` is true.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffReport {
    pub title_changed: bool,
    pub old_title: Option<String>,
    pub new_title: Option<String>,
    pub content_diff: Vec<LineChange>,
}

/// Per-kind record counts of a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub unchanged: usize,
    pub added: usize,
    pub removed: usize,
}

impl DiffReport {
    pub fn stats(&self) -> DiffStats {
        self.content_diff
            .iter()
            .fold(DiffStats::default(), |mut stats, change| {
                match change.kind {
                    LineKind::Unchanged => stats.unchanged += 1,
                    LineKind::Added => stats.added += 1,
                    LineKind::Removed => stats.removed += 1,
                }
                stats
            })
    }

    /// True when neither the title nor any content line differs.
    pub fn is_identical(&self) -> bool {
        !self.title_changed
            && self
                .content_diff
                .iter()
                .all(|change| change.kind == LineKind::Unchanged)
    }

    /// Lines of the old side, in order (`unchanged` + `removed`).
    pub fn old_lines(&self) -> impl Iterator<Item = &str> {
        self.side_lines(LineKind::Removed)
    }

    /// Lines of the new side, in order (`unchanged` + `added`).
    pub fn new_lines(&self) -> impl Iterator<Item = &str> {
        self.side_lines(LineKind::Added)
    }

    fn side_lines(&self, own_kind: LineKind) -> impl Iterator<Item = &str> {
        self.content_diff
            .iter()
            .filter(move |change| change.kind == LineKind::Unchanged || change.kind == own_kind)
            .map(|change| change.text.as_str())
    }
}
