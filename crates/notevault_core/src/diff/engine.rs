//! LCS-based line comparison.
//!
//! The entry point is [`compare`]. Alignment uses a suffix LCS table walked
//! left to right; on ties the new side advances first, which keeps each old
//! line available for the earliest possible match.

use crate::diff::model::{DiffReport, LineChange, LineKind};
use crate::model::note::Snapshot;

/// Compares two snapshots and produces a structured report.
///
/// `old` is the baseline; `added` lines exist only in `new`, `removed`
/// lines exist only in `old`.
pub fn compare(old: Snapshot<'_>, new: Snapshot<'_>) -> DiffReport {
    let title_changed = old.title != new.title;
    let (old_title, new_title) = if title_changed {
        (Some(old.title.to_string()), Some(new.title.to_string()))
    } else {
        (None, None)
    };

    let old_lines = split_lines(old.content);
    let new_lines = split_lines(new.content);

    DiffReport {
        title_changed,
        old_title,
        new_title,
        content_diff: diff_lines(&old_lines, &new_lines),
    }
}

/// Splits content into lines without terminators.
///
/// `\n`, `\r\n` and a lone `\r` each end a line. Empty content yields no
/// lines; a final unterminated line is kept.
pub fn split_lines(content: &str) -> Vec<&str> {
    let bytes = content.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                lines.push(&content[start..i]);
                start = i + 1;
            }
            b'\r' => {
                lines.push(&content[start..i]);
                if bytes.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }

    if start < bytes.len() {
        lines.push(&content[start..]);
    }
    lines
}

/// Row-major suffix table: `at(i, j)` = LCS length of `old[i..]` and `new[j..]`.
struct LcsTable {
    width: usize,
    cells: Vec<u32>,
}

impl LcsTable {
    fn build(old: &[&str], new: &[&str]) -> Self {
        let width = new.len() + 1;
        let mut cells = vec![0u32; (old.len() + 1) * width];

        for i in (0..old.len()).rev() {
            for j in (0..new.len()).rev() {
                cells[i * width + j] = if old[i] == new[j] {
                    cells[(i + 1) * width + j + 1] + 1
                } else {
                    cells[(i + 1) * width + j].max(cells[i * width + j + 1])
                };
            }
        }

        Self { width, cells }
    }

    fn at(&self, i: usize, j: usize) -> u32 {
        self.cells[i * self.width + j]
    }
}

/// Pending non-matching lines between two anchors.
#[derive(Default)]
struct Run<'a> {
    removed: Vec<&'a str>,
    added: Vec<&'a str>,
}

impl<'a> Run<'a> {
    /// Emits removed lines before added lines, then resets.
    fn flush_into(&mut self, out: &mut Vec<LineChange>) {
        out.extend(
            self.removed
                .drain(..)
                .map(|line| LineChange::new(LineKind::Removed, line)),
        );
        out.extend(
            self.added
                .drain(..)
                .map(|line| LineChange::new(LineKind::Added, line)),
        );
    }
}

fn diff_lines(old: &[&str], new: &[&str]) -> Vec<LineChange> {
    let table = LcsTable::build(old, new);
    let mut out = Vec::with_capacity(old.len().max(new.len()));
    let mut run = Run::default();
    let (mut i, mut j) = (0, 0);

    while i < old.len() && j < new.len() {
        if old[i] == new[j] {
            run.flush_into(&mut out);
            out.push(LineChange::new(LineKind::Unchanged, old[i]));
            i += 1;
            j += 1;
        } else if table.at(i, j + 1) >= table.at(i + 1, j) {
            run.added.push(new[j]);
            j += 1;
        } else {
            run.removed.push(old[i]);
            i += 1;
        }
    }

    run.removed.extend_from_slice(&old[i..]);
    run.added.extend_from_slice(&new[j..]);
    run.flush_into(&mut out);
    out
}
