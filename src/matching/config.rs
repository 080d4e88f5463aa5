use serde::Deserialize;

/// Tunable thresholds for the match finder.
///
/// Passed explicitly into every matching call; there is no global state.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Minimum per-line similarity for a fuzzy anchor
    pub similarity_threshold: f64,
    /// A scored line counts as high-confidence above this similarity
    pub high_confidence_threshold: f64,
    /// A candidate is acceptable when its high-confidence ratio exceeds this
    pub acceptance_ratio: f64,
    /// Score given to lines equal after trimming whitespace
    pub whitespace_match_score: f64,
    /// Visibility margin is `min(range_len / divisor, cap)` lines per side
    pub visibility_margin_divisor: usize,
    pub visibility_margin_cap: usize,
    /// Cap on unmatched/found-instead lines reported by `NoMatchFound`
    pub max_diagnostic_lines: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.85,
            high_confidence_threshold: 0.925,
            acceptance_ratio: 0.95,
            whitespace_match_score: 0.999,
            visibility_margin_divisor: 8,
            visibility_margin_cap: 5,
            max_diagnostic_lines: 5,
        }
    }
}

impl MatchConfig {
    /// Margin in lines allowed on each side of a visible range of `range_len` lines.
    pub fn visibility_margin(&self, range_len: usize) -> usize {
        let divisor = self.visibility_margin_divisor.max(1);
        (range_len / divisor).min(self.visibility_margin_cap)
    }
}
