//! Content rewriting: (edit block, file text) -> new file text.
//!
//! Everything here is pure. Visibility must already be resolved by the caller
//! (see [`crate::visibility::visible_spans`]); the block itself is never
//! modified.

use std::path::PathBuf;
use thiserror::Error;

use crate::block::EditBlock;
use crate::matching::similarity::is_whitespace_or_comment;
use crate::matching::{
    best_match, disambiguate, find_acceptable_match, find_matches, split_lines, LineSpan,
    MatchConfig, MatchRegion, SearchScope,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RewriteError {
    #[error("update of {path} has no old lines to match")]
    EmptyOldLines { path: PathBuf },

    #[error("no match found in {path}{}", describe_no_match(.unmatched, .found_instead, .closest_line))]
    NoMatchFound {
        path: PathBuf,
        /// Old lines that could not be aligned (capped)
        unmatched: Vec<String>,
        /// Lines present where `unmatched` was expected (capped)
        found_instead: Vec<String>,
        /// 1-based start of the closest whole-file candidate, if any
        closest_line: Option<usize>,
    },

    #[error("old lines match {} locations in {path}; include enough surrounding lines to make the edit unique{}", .regions.len(), describe_regions(.regions))]
    MultipleMatches {
        path: PathBuf,
        regions: Vec<MatchRegion>,
    },
}

fn describe_no_match(
    unmatched: &[String],
    found_instead: &[String],
    closest_line: &Option<usize>,
) -> String {
    let mut out = String::new();
    if let Some(line) = closest_line {
        out.push_str(&format!(" (closest candidate starts at line {line})"));
    }
    if !unmatched.is_empty() {
        out.push_str("\nlines not found:");
        for line in unmatched {
            out.push_str("\n  ");
            out.push_str(line);
        }
    }
    if !found_instead.is_empty() {
        out.push_str("\nfound instead:");
        for line in found_instead {
            out.push_str("\n  ");
            out.push_str(line);
        }
    }
    out
}

fn describe_regions(regions: &[MatchRegion]) -> String {
    regions.iter().map(|r| format!("\n{r}")).collect()
}

/// Apply an update block to `content`.
///
/// `visible` is the merged visible spans for the block's file; `None` searches
/// the whole file. Matches outside the visible spans are never applied.
pub fn rewrite_content(
    block: &EditBlock,
    content: &str,
    visible: Option<&[LineSpan]>,
    config: &MatchConfig,
) -> Result<String, RewriteError> {
    if block.old_lines.is_empty() {
        return Err(RewriteError::EmptyOldLines {
            path: block.file_path.clone(),
        });
    }

    let target = split_lines(content);
    let scope = match visible {
        Some(spans) => SearchScope::Visible(spans),
        None => SearchScope::Whole,
    };

    let Some(found) = find_acceptable_match(&block.old_lines, &target, scope, config) else {
        return Err(no_match_error(block, &target, config));
    };

    if !found.is_unique() {
        let regions = disambiguate(&block.file_path, &found.acceptable, &target, config);
        return Err(RewriteError::MultipleMatches {
            path: block.file_path.clone(),
            regions,
        });
    }

    let best = found.best;
    log::debug!(
        "{}: replacing lines {}-{} (score {:.3})",
        block.file_path.display(),
        best.start_line(),
        best.end_line(),
        best.score
    );

    let mut rewritten: Vec<&str> =
        Vec::with_capacity(target.len() - best.lines.len() + block.new_lines.len());
    rewritten.extend(target[..best.index].iter().map(String::as_str));
    rewritten.extend(block.new_lines.iter().map(String::as_str));
    rewritten.extend(
        target[best.index + best.lines.len()..]
            .iter()
            .map(String::as_str),
    );
    Ok(rewritten.join("\n"))
}

/// Build `NoMatchFound` from a relaxed whole-file search. Diagnostics only.
fn no_match_error(block: &EditBlock, target: &[String], config: &MatchConfig) -> RewriteError {
    let limit = config.max_diagnostic_lines;
    let candidates = find_matches(&block.old_lines, target, SearchScope::Whole, config);

    let (unmatched, found_instead, closest_line) = match best_match(&candidates) {
        Some(best) if !best.failed_to_match.is_empty() => (
            best.failed_to_match.iter().take(limit).cloned().collect(),
            best.found_instead.iter().take(limit).cloned().collect(),
            Some(best.start_line()),
        ),
        // Matches cleanly, but only outside the visible ranges.
        Some(best) => (Vec::new(), Vec::new(), Some(best.start_line())),
        None => (
            block
                .old_lines
                .iter()
                .filter(|line| !is_whitespace_or_comment(line))
                .take(limit)
                .cloned()
                .collect(),
            Vec::new(),
            None,
        ),
    };

    RewriteError::NoMatchFound {
        path: block.file_path.clone(),
        unmatched,
        found_instead,
        closest_line,
    }
}

/// Body for a newly created file: lines joined, trailing newlines collapsed to
/// at most one.
pub fn create_content(new_lines: &[String]) -> String {
    let joined = new_lines.join("\n");
    let body = joined.trim_end_matches('\n');
    if body.len() < joined.len() {
        format!("{body}\n")
    } else {
        joined
    }
}

/// Append `new_lines` to `existing` with exactly one newline between them,
/// keeping the file's trailing-newline convention.
pub fn append_content(existing: &str, new_lines: &[String]) -> String {
    let addition = new_lines.join("\n");
    let head = existing.trim_end_matches('\n');
    if head.is_empty() {
        return addition;
    }

    let mut out = format!("{head}\n{addition}");
    if existing.ends_with('\n') && !out.ends_with('\n') {
        out.push('\n');
    }
    out
}
