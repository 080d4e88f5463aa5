//! Visible-range bookkeeping for edit blocks.
//!
//! Visible ranges narrow where an edit's old lines may match. They come from
//! two sources: the ranges declared on the block, and the current location of
//! any symbol a previously shown snippet referenced (code may have moved since
//! it was shown). Ranges declared before a batch started are translated
//! through the line shifts of earlier same-file edits.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::block::{EditBlock, FileRange};
use crate::diff::LineHunk;
use crate::matching::LineSpan;
use crate::ts::TreeSitterError;

#[derive(Error, Debug)]
pub enum SymbolError {
    #[error("symbol lookup not supported for {path}: {reason}")]
    Unsupported { path: PathBuf, reason: String },

    #[error("symbol '{symbol}' not found in {path}")]
    NotFound { path: PathBuf, symbol: String },

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Tree-sitter error: {0}")]
    TreeSitter(#[from] TreeSitterError),
}

/// Resolves a named symbol to its current line span(s) in a file.
pub trait SymbolLookup {
    fn symbol_ranges(&self, absolute_path: &Path, symbol: &str)
        -> Result<Vec<FileRange>, SymbolError>;
}

/// Lookup that knows no symbols; visibility falls back to declared ranges.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSymbols;

impl SymbolLookup for NoSymbols {
    fn symbol_ranges(&self, _: &Path, _: &str) -> Result<Vec<FileRange>, SymbolError> {
        Ok(Vec::new())
    }
}

/// Merge overlapping or adjacent ranges per file into a minimal covering set.
///
/// Output is ordered by file path, then start line.
pub fn merge_ranges(ranges: &[FileRange]) -> Vec<FileRange> {
    let mut by_file: BTreeMap<&Path, Vec<(usize, usize)>> = BTreeMap::new();
    for range in ranges.iter().filter(|r| !r.is_empty()) {
        by_file
            .entry(range.file_path.as_path())
            .or_default()
            .push((range.start_line, range.end_line));
    }

    let mut merged = Vec::new();
    for (path, mut spans) in by_file {
        spans.sort_unstable();
        let mut current: Option<(usize, usize)> = None;
        for (start, end) in spans {
            current = match current {
                Some((cur_start, cur_end)) if start <= cur_end + 1 => {
                    Some((cur_start, cur_end.max(end)))
                }
                Some((cur_start, cur_end)) => {
                    merged.push(FileRange::new(path, cur_start, cur_end));
                    Some((start, end))
                }
                None => Some((start, end)),
            };
        }
        if let Some((start, end)) = current {
            merged.push(FileRange::new(path, start, end));
        }
    }
    merged
}

/// Compute the merged visible spans for `block` within its own file.
///
/// `ranges` are the block's declared ranges, already translated for earlier
/// edits. `None` means the whole file is visible. Symbol lookup failures are
/// logged and ignored.
pub fn visible_spans(
    block: &EditBlock,
    ranges: Option<&[FileRange]>,
    symbols: &dyn SymbolLookup,
) -> Option<Vec<LineSpan>> {
    let ranges = ranges?;

    let mut collected: Vec<FileRange> = ranges
        .iter()
        .filter(|r| block.targets(&r.file_path))
        .cloned()
        .collect();

    for code_block in &block.visible_code_blocks {
        let Some(symbol) = code_block.symbol.as_deref() else {
            continue;
        };
        if !block.targets(&code_block.file_path) {
            continue;
        }

        match symbols.symbol_ranges(&block.absolute_file_path, symbol) {
            Ok(found) => {
                log::debug!(
                    "symbol '{}' in {} resolved to {} range(s)",
                    symbol,
                    block.file_path.display(),
                    found.len()
                );
                collected.extend(found.into_iter().map(|r| FileRange {
                    file_path: block.file_path.clone(),
                    ..r
                }));
            }
            Err(e) => {
                log::warn!(
                    "symbol lookup for '{}' in {} failed, using declared ranges: {}",
                    symbol,
                    block.file_path.display(),
                    e
                );
            }
        }
    }

    Some(
        merge_ranges(&collected)
            .into_iter()
            .map(|r| LineSpan::new(r.start_line, r.end_line))
            .collect(),
    )
}

/// Translate one range through the hunks of a single applied edit.
///
/// `hunks` must be in file order. A hunk that straddles the range's first line
/// pulls the start back to where the hunk's replacement begins, so lines that
/// survived the edit stay inside the range.
pub fn shift_range(range: &FileRange, hunks: &[LineHunk]) -> FileRange {
    let mut start_shift = 0isize;
    let mut end_shift = 0isize;
    let mut pinned_start: Option<isize> = None;

    for hunk in hunks {
        if hunk.ends_before(range.start_line) {
            start_shift += hunk.delta();
            end_shift += hunk.delta();
        } else if hunk.old_start <= range.end_line {
            if hunk.old_start < range.start_line && pinned_start.is_none() {
                pinned_start = Some(hunk.old_start as isize + start_shift);
            }
            end_shift += hunk.delta();
        }
    }

    let start = pinned_start
        .unwrap_or(range.start_line as isize + start_shift)
        .max(1) as usize;
    let end = (range.end_line as isize + end_shift).max(start as isize) as usize;
    FileRange::new(range.file_path.clone(), start, end)
}

pub fn shift_ranges(ranges: &[FileRange], hunks: &[LineHunk]) -> Vec<FileRange> {
    ranges.iter().map(|r| shift_range(r, hunks)).collect()
}

/// Fold every recorded edit's hunks, in apply order, over `ranges`.
pub fn translate_ranges(ranges: &[FileRange], history: &[Vec<LineHunk>]) -> Vec<FileRange> {
    history
        .iter()
        .fold(ranges.to_vec(), |acc, hunks| shift_ranges(&acc, hunks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::VisibleCodeBlock;

    struct FixedSymbols(Vec<FileRange>);

    impl SymbolLookup for FixedSymbols {
        fn symbol_ranges(&self, _: &Path, _: &str) -> Result<Vec<FileRange>, SymbolError> {
            Ok(self.0.clone())
        }
    }

    struct FailingSymbols;

    impl SymbolLookup for FailingSymbols {
        fn symbol_ranges(&self, path: &Path, symbol: &str) -> Result<Vec<FileRange>, SymbolError> {
            Err(SymbolError::NotFound {
                path: path.to_path_buf(),
                symbol: symbol.to_string(),
            })
        }
    }

    #[test]
    fn merges_overlapping_and_adjacent() {
        let ranges = vec![
            FileRange::new("a.rs", 10, 12),
            FileRange::new("a.rs", 1, 3),
            FileRange::new("a.rs", 4, 6),
            FileRange::new("a.rs", 11, 20),
            FileRange::new("b.rs", 5, 5),
        ];
        let merged = merge_ranges(&ranges);
        assert_eq!(
            merged,
            vec![
                FileRange::new("a.rs", 1, 6),
                FileRange::new("a.rs", 10, 20),
                FileRange::new("b.rs", 5, 5),
            ]
        );
    }

    #[test]
    fn whole_file_when_no_ranges_declared() {
        let block = EditBlock::update("a.rs", ["x"], ["y"]);
        assert!(visible_spans(&block, None, &NoSymbols).is_none());
    }

    #[test]
    fn empty_declared_ranges_mean_nothing_visible() {
        let block = EditBlock::update("a.rs", ["x"], ["y"]);
        assert_eq!(visible_spans(&block, Some(&[]), &NoSymbols), Some(Vec::new()));
    }

    #[test]
    fn filters_other_files_and_unions_symbol_ranges() {
        let block = EditBlock::update("a.rs", ["x"], ["y"]).with_code_block(VisibleCodeBlock {
            file_path: "a.rs".into(),
            symbol: Some("run".to_string()),
            code: String::new(),
        });
        let declared = vec![FileRange::new("a.rs", 2, 3), FileRange::new("b.rs", 1, 50)];
        let symbols = FixedSymbols(vec![FileRange::new("/abs/a.rs", 4, 9)]);

        let spans = visible_spans(&block, Some(&declared), &symbols).unwrap();
        assert_eq!(spans, vec![LineSpan::new(2, 9)]);
    }

    #[test]
    fn symbol_failure_falls_back_to_declared_ranges() {
        let block = EditBlock::update("a.rs", ["x"], ["y"]).with_code_block(VisibleCodeBlock {
            file_path: "a.rs".into(),
            symbol: Some("gone".to_string()),
            code: String::new(),
        });
        let declared = vec![FileRange::new("a.rs", 2, 3)];

        let spans = visible_spans(&block, Some(&declared), &FailingSymbols).unwrap();
        assert_eq!(spans, vec![LineSpan::new(2, 3)]);
    }

    #[test]
    fn shifts_ranges_after_insertion_above() {
        let hunks = [LineHunk {
            old_start: 2,
            old_len: 1,
            new_len: 3,
        }];
        let shifted = shift_range(&FileRange::new("a.rs", 5, 8), &hunks);
        assert_eq!((shifted.start_line, shifted.end_line), (7, 10));
    }

    #[test]
    fn edits_inside_range_move_only_the_end() {
        let hunks = [LineHunk {
            old_start: 6,
            old_len: 2,
            new_len: 0,
        }];
        let shifted = shift_range(&FileRange::new("a.rs", 5, 8), &hunks);
        assert_eq!((shifted.start_line, shifted.end_line), (5, 6));
    }

    #[test]
    fn hunk_straddling_range_start_pulls_start_back() {
        // Lines 3-6 collapsed to one line; old line 7 is now line 4.
        let hunks = [LineHunk {
            old_start: 3,
            old_len: 4,
            new_len: 1,
        }];
        let shifted = shift_range(&FileRange::new("a.rs", 5, 8), &hunks);
        assert_eq!((shifted.start_line, shifted.end_line), (3, 5));
    }

    #[test]
    fn straddling_hunk_after_earlier_shift() {
        let hunks = [
            LineHunk {
                old_start: 1,
                old_len: 0,
                new_len: 2,
            },
            LineHunk {
                old_start: 8,
                old_len: 4,
                new_len: 2,
            },
        ];
        let shifted = shift_range(&FileRange::new("a.rs", 10, 14), &hunks);
        assert_eq!((shifted.start_line, shifted.end_line), (10, 14));
    }

    #[test]
    fn edits_below_range_are_ignored() {
        let hunks = [LineHunk {
            old_start: 20,
            old_len: 1,
            new_len: 9,
        }];
        let shifted = shift_range(&FileRange::new("a.rs", 5, 8), &hunks);
        assert_eq!((shifted.start_line, shifted.end_line), (5, 8));
    }

    #[test]
    fn translate_folds_in_order() {
        let history = vec![
            vec![LineHunk {
                old_start: 1,
                old_len: 0,
                new_len: 2,
            }],
            vec![LineHunk {
                old_start: 3,
                old_len: 4,
                new_len: 1,
            }],
        ];
        // 10-12 -> 12-14 after the insertion, then -3 after the shrink above it.
        let translated = translate_ranges(&[FileRange::new("a.rs", 10, 12)], &history);
        assert_eq!(translated, vec![FileRange::new("a.rs", 9, 11)]);
    }
}
