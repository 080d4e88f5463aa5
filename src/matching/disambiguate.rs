//! Expand ambiguous candidates into regions that each match exactly once.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::matching::finder::{find_acceptable_match, Match, SearchScope};
use crate::matching::MatchConfig;

/// An expanded, uniquely-matching region reported for an ambiguous edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchRegion {
    pub file_path: PathBuf,
    /// 1-based, inclusive
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
}

impl fmt::Display for MatchRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}:{}-{}",
            self.file_path.display(),
            self.start_line,
            self.end_line
        )?;
        f.write_str(&self.content)
    }
}

/// Grow each candidate symmetrically, one line per side at a time, until its
/// window matches exactly once in `target`, then one more line for context.
///
/// Growth stops at the file bounds, so a window that never becomes unique ends
/// up covering the whole file.
pub fn disambiguate(
    file_path: &Path,
    candidates: &[Match],
    target: &[String],
    config: &MatchConfig,
) -> Vec<MatchRegion> {
    let total = target.len();

    candidates
        .iter()
        .map(|candidate| {
            let mut start = candidate.index.min(total);
            let mut end = (candidate.index + candidate.lines.len().max(1)).min(total);

            while start > 0 || end < total {
                start = start.saturating_sub(1);
                end = (end + 1).min(total);

                let window = &target[start..end];
                let unique = find_acceptable_match(window, target, SearchScope::Whole, config)
                    .is_some_and(|found| found.is_unique());
                if unique {
                    start = start.saturating_sub(1);
                    end = (end + 1).min(total);
                    break;
                }
            }

            MatchRegion {
                file_path: file_path.to_path_buf(),
                start_line: start + 1,
                end_line: end,
                content: target[start..end].join("\n"),
            }
        })
        .collect()
}
