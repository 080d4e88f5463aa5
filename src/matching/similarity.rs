//! Line classification and per-line similarity scoring.

use crate::matching::MatchConfig;

/// Score for byte-identical lines.
pub const EXACT_SCORE: f64 = 1.0;

const CLOSING_DELIMITERS: &[char] = &[')', '}', ']', ';', ','];

/// True for lines that carry no anchoring information: blank, or made only of
/// closing delimiters (`}`, `});`, `],` ...).
pub fn is_boilerplate(line: &str) -> bool {
    line.trim()
        .chars()
        .all(|c| c.is_whitespace() || CLOSING_DELIMITERS.contains(&c))
}

/// True for blank lines and lines that are entirely a comment.
pub fn is_whitespace_or_comment(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return true;
    }

    if trimmed.starts_with("//")
        || trimmed.starts_with("/*")
        || trimmed.starts_with("*/")
        || trimmed.starts_with("<!--")
        || trimmed.starts_with("-- ")
        || trimmed == "--"
        || trimmed == "*"
        || trimmed.starts_with("* ")
    {
        return true;
    }

    // `#` starts a comment in shell/Python/TOML, but `#[...]` and `#!` are Rust attributes.
    if let Some(rest) = trimmed.strip_prefix('#') {
        return !rest.starts_with('[') && !rest.starts_with('!');
    }

    false
}

/// How two lines compare, from strongest to weakest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineMatch {
    Exact,
    Whitespace,
    Fuzzy(f64),
}

impl LineMatch {
    pub fn score(self, config: &MatchConfig) -> f64 {
        match self {
            LineMatch::Exact => EXACT_SCORE,
            LineMatch::Whitespace => config.whitespace_match_score,
            LineMatch::Fuzzy(score) => score,
        }
    }
}

/// Classify how `a` and `b` compare.
pub fn compare_lines(a: &str, b: &str) -> LineMatch {
    if a == b {
        return LineMatch::Exact;
    }

    let (a, b) = (a.trim(), b.trim());
    if a == b {
        return LineMatch::Whitespace;
    }

    LineMatch::Fuzzy(strsim::normalized_levenshtein(a, b))
}

/// Similarity in `[0, 1]` between two lines.
pub fn line_similarity(a: &str, b: &str, config: &MatchConfig) -> f64 {
    compare_lines(a, b).score(config)
}
