//! Unified diffs and diff-derived line shifts.

use similar::{DiffTag, TextDiff};
use std::path::Path;

/// Lines of context around each unified diff hunk.
const CONTEXT_LINES: usize = 3;

/// Render a unified diff between two versions of a file.
///
/// Returns an empty string when the contents are identical.
pub fn unified_diff(path_a: &Path, content_a: &str, path_b: &Path, content_b: &str) -> String {
    if content_a == content_b {
        return String::new();
    }

    let old_header = format!("a/{}", path_a.display());
    let new_header = format!("b/{}", path_b.display());
    TextDiff::from_lines(content_a, content_b)
        .unified_diff()
        .context_radius(CONTEXT_LINES)
        .header(&old_header, &new_header)
        .to_string()
}

/// A contiguous run of changed lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineHunk {
    /// 1-based first old line touched; for a pure insertion, the line the new
    /// lines were inserted before
    pub old_start: usize,
    pub old_len: usize,
    pub new_len: usize,
}

impl LineHunk {
    /// Net change in line count.
    pub fn delta(&self) -> isize {
        self.new_len as isize - self.old_len as isize
    }

    /// Whether the hunk lies entirely before `line` (1-based).
    pub fn ends_before(&self, line: usize) -> bool {
        self.old_start + self.old_len <= line
    }
}

/// Contiguous changed runs between `old` and `new`, in file order.
pub fn line_hunks(old: &str, new: &str) -> Vec<LineHunk> {
    let diff = TextDiff::from_lines(old, new);

    let mut hunks = Vec::new();
    let mut current: Option<LineHunk> = None;
    for op in diff.ops() {
        if op.tag() == DiffTag::Equal {
            hunks.extend(current.take());
            continue;
        }

        let old_range = op.old_range();
        let new_range = op.new_range();
        match current.as_mut() {
            Some(hunk) => {
                hunk.old_len += old_range.len();
                hunk.new_len += new_range.len();
            }
            None => {
                current = Some(LineHunk {
                    old_start: old_range.start + 1,
                    old_len: old_range.len(),
                    new_len: new_range.len(),
                });
            }
        }
    }
    hunks.extend(current);
    hunks
}
