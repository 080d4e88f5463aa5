//! Fuzzy line matching for edit blocks.
//!
//! - [`finder`]: anchor search and line alignment, the acceptance gate
//! - [`disambiguate`]: grow ambiguous candidates until each is unique
//! - [`similarity`]: line classification and scoring
//!
//! All functions here are pure: they take owned or borrowed line slices and a
//! [`MatchConfig`], and never touch the filesystem.

pub mod config;
pub mod disambiguate;
pub mod finder;
pub mod similarity;

pub use config::MatchConfig;
pub use disambiguate::{disambiguate, MatchRegion};
pub use finder::{best_match, find_acceptable_match, find_matches, AcceptableMatches, Match, SearchScope};

/// A 1-based inclusive line span within a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
}

impl LineSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        (self.end + 1).saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Split file text into lines the way the rewriter rejoins them.
///
/// A trailing newline yields a final empty line, so `join("\n")` restores the
/// input exactly.
pub fn split_lines(content: &str) -> Vec<String> {
    content.split('\n').map(str::to_string).collect()
}
