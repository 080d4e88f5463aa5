//! Locate where an edit block's old lines live in the current file content.
//!
//! Matching runs in two phases. An anchor line from the old lines is searched
//! for in the target (each line compared exact, then whitespace-insensitive,
//! then fuzzy), and each anchor is then aligned line by line in both
//! directions. Blank and
//! comment-only lines present on one side only are skipped rather than
//! penalized, so dropped comments and whitespace drift still align.

use crate::matching::similarity::{
    compare_lines, is_boilerplate, is_whitespace_or_comment, line_similarity, LineMatch,
};
use crate::matching::{LineSpan, MatchConfig};

/// Which part of the target is eligible for anchors.
#[derive(Debug, Clone, Copy)]
pub enum SearchScope<'a> {
    /// Every line is eligible (transcript snippets, diagnostics)
    Whole,
    /// Only anchors whose implied span fits one of these merged spans
    Visible(&'a [LineSpan]),
}

/// A candidate alignment of old lines against the target.
///
/// Owns a copy of the consumed lines so candidates stay valid however the
/// target is sliced or re-searched afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    /// 0-based index of the first consumed target line
    pub index: usize,
    /// Target lines consumed by the alignment
    pub lines: Vec<String>,
    /// Average similarity over scored line pairs
    pub score: f64,
    /// High-confidence pairs over scored pairs plus unmatched leading lines
    pub high_score_ratio: f64,
    /// False when the target ran out before the old lines did
    pub successful: bool,
    /// Old lines that did not align with confidence
    pub failed_to_match: Vec<String>,
    /// Target lines found where `failed_to_match` was expected
    pub found_instead: Vec<String>,
}

impl Match {
    /// 1-based first line of the consumed span.
    pub fn start_line(&self) -> usize {
        self.index + 1
    }

    /// 1-based last line of the consumed span (equals `index` for an empty span).
    pub fn end_line(&self) -> usize {
        self.index + self.lines.len()
    }

    pub fn is_acceptable(&self, config: &MatchConfig) -> bool {
        self.successful && self.high_score_ratio > config.acceptance_ratio
    }
}

/// Result of [`find_acceptable_match`].
#[derive(Debug, Clone)]
pub struct AcceptableMatches {
    pub best: Match,
    /// Every acceptable candidate, in discovery order (includes `best`)
    pub acceptable: Vec<Match>,
}

impl AcceptableMatches {
    pub fn is_unique(&self) -> bool {
        self.acceptable.len() == 1
    }
}

/// Find every candidate alignment of `old_lines` in `target`.
///
/// Returns candidates in anchor order; empty when no anchor line is found.
pub fn find_matches(
    old_lines: &[String],
    target: &[String],
    scope: SearchScope<'_>,
    config: &MatchConfig,
) -> Vec<Match> {
    if old_lines.is_empty() || target.is_empty() {
        return Vec::new();
    }

    let mut anchor_lines = old_lines
        .iter()
        .enumerate()
        .filter(|(_, line)| !is_boilerplate(line))
        .map(|(idx, _)| idx);
    let first = anchor_lines.next().unwrap_or(0);
    let retry = anchor_lines.next();

    let mut anchor_old = first;
    let mut anchors = find_anchors(old_lines, anchor_old, target, scope, config);
    if anchors.is_empty() {
        if let Some(next) = retry {
            log::debug!(
                "no anchor for old line {}, retrying with line {} ({} leading lines skipped)",
                first,
                next,
                next
            );
            anchor_old = next;
            anchors = find_anchors(old_lines, anchor_old, target, scope, config);
        }
    }

    let mut candidates: Vec<Match> = Vec::with_capacity(anchors.len());
    for anchor_target in anchors {
        let candidate = align(old_lines, target, anchor_old, anchor_target, config);
        let duplicate = candidates
            .iter()
            .any(|c| c.index == candidate.index && c.lines.len() == candidate.lines.len());
        if !duplicate {
            candidates.push(candidate);
        }
    }

    candidates
}

/// Pick the best candidate: any successful candidate beats any unsuccessful
/// one, then the highest average score wins. Ties keep the first encountered.
pub fn best_match(candidates: &[Match]) -> Option<&Match> {
    let mut best: Option<&Match> = None;
    for candidate in candidates {
        best = match best {
            None => Some(candidate),
            Some(current) => {
                let better = (candidate.successful && !current.successful)
                    || (candidate.successful == current.successful
                        && candidate.score > current.score);
                if better {
                    Some(candidate)
                } else {
                    Some(current)
                }
            }
        };
    }
    best
}

/// Quality gate: return the best candidate and every acceptable candidate,
/// or `None` when the best candidate is not acceptable.
pub fn find_acceptable_match(
    old_lines: &[String],
    target: &[String],
    scope: SearchScope<'_>,
    config: &MatchConfig,
) -> Option<AcceptableMatches> {
    let candidates = find_matches(old_lines, target, scope, config);
    let best = best_match(&candidates)?;
    if !best.is_acceptable(config) {
        log::debug!(
            "best candidate at line {} rejected: ratio {:.3}, score {:.3}",
            best.start_line(),
            best.high_score_ratio,
            best.score
        );
        return None;
    }

    let best = best.clone();
    let acceptable = candidates
        .into_iter()
        .filter(|c| c.is_acceptable(config))
        .collect();
    Some(AcceptableMatches { best, acceptable })
}

/// In-scope target indices where `old_lines[anchor_old]` appears.
///
/// Each target line is compared at its strongest tier (exact,
/// whitespace-insensitive, fuzzy) and kept when that score clears the
/// similarity threshold. An exact hit does not hide a whitespace-only twin;
/// alignment scores and the acceptance gate rank the candidates.
fn find_anchors(
    old_lines: &[String],
    anchor_old: usize,
    target: &[String],
    scope: SearchScope<'_>,
    config: &MatchConfig,
) -> Vec<usize> {
    let anchor = &old_lines[anchor_old];

    target
        .iter()
        .enumerate()
        .filter(|&(idx, _)| in_scope(idx, anchor_old, old_lines.len(), scope, config))
        .filter(|(_, line)| line_similarity(anchor, line, config) >= config.similarity_threshold)
        .map(|(idx, _)| idx)
        .collect()
}

/// Whether the span implied by anchoring `anchor_old` at `anchor_target` fits
/// inside a visible span, allowing a per-side margin.
fn in_scope(
    anchor_target: usize,
    anchor_old: usize,
    old_len: usize,
    scope: SearchScope<'_>,
    config: &MatchConfig,
) -> bool {
    let spans = match scope {
        SearchScope::Whole => return true,
        SearchScope::Visible(spans) => spans,
    };

    let start = anchor_target.saturating_sub(anchor_old) + 1;
    let end = start + old_len - 1;

    spans.iter().any(|span| {
        let margin = config.visibility_margin(span.len());
        start >= span.start.saturating_sub(margin) && end <= span.end + margin
    })
}

enum Step {
    SkipOld,
    SkipTarget,
    Pair(LineMatch),
}

fn step(old: &str, target: &str, config: &MatchConfig) -> Step {
    let old_skippable = is_whitespace_or_comment(old);
    let target_skippable = is_whitespace_or_comment(target);

    match (old_skippable, target_skippable) {
        (true, false) => Step::SkipOld,
        (false, true) => Step::SkipTarget,
        (true, true) => {
            let compared = compare_lines(old, target);
            if compared.score(config) > config.high_confidence_threshold {
                Step::Pair(compared)
            } else {
                Step::SkipOld
            }
        }
        (false, false) => Step::Pair(compare_lines(old, target)),
    }
}

#[derive(Default)]
struct Tally {
    total: f64,
    scored: usize,
    high: usize,
    unmatched_leading: usize,
    failed_to_match: Vec<String>,
    found_instead: Vec<String>,
}

impl Tally {
    fn record(&mut self, old: &str, target: &str, compared: LineMatch, config: &MatchConfig) {
        let score = compared.score(config);
        self.total += score;
        self.scored += 1;
        if score > config.high_confidence_threshold {
            self.high += 1;
        } else {
            self.failed_to_match.push(old.to_string());
            self.found_instead.push(target.to_string());
        }
    }
}

/// Align `old_lines` around a single anchor, backwards for the prefix and
/// forwards from the anchor.
fn align(
    old_lines: &[String],
    target: &[String],
    anchor_old: usize,
    anchor_target: usize,
    config: &MatchConfig,
) -> Match {
    // Prefix, walked backwards from the anchor.
    let mut prefix = Tally::default();
    let (mut i, mut j) = (anchor_old, anchor_target);
    while i > 0 {
        if j == 0 {
            for line in old_lines[..i].iter().rev() {
                if !is_whitespace_or_comment(line) {
                    prefix.unmatched_leading += 1;
                    prefix.failed_to_match.push(line.clone());
                }
            }
            break;
        }
        match step(&old_lines[i - 1], &target[j - 1], config) {
            Step::SkipOld => i -= 1,
            Step::SkipTarget => j -= 1,
            Step::Pair(compared) => {
                prefix.record(&old_lines[i - 1], &target[j - 1], compared, config);
                i -= 1;
                j -= 1;
            }
        }
    }
    let start = j;
    prefix.failed_to_match.reverse();
    prefix.found_instead.reverse();

    // Anchor and suffix, walked forwards.
    let mut tally = prefix;
    let mut successful = true;
    let (mut i, mut j) = (anchor_old, anchor_target);
    while i < old_lines.len() {
        if j >= target.len() {
            let remaining = &old_lines[i..];
            if !remaining.iter().all(|line| is_whitespace_or_comment(line)) {
                successful = false;
                tally.failed_to_match.extend(
                    remaining
                        .iter()
                        .filter(|line| !is_whitespace_or_comment(line))
                        .cloned(),
                );
            }
            break;
        }
        match step(&old_lines[i], &target[j], config) {
            Step::SkipOld => i += 1,
            Step::SkipTarget => j += 1,
            Step::Pair(compared) => {
                tally.record(&old_lines[i], &target[j], compared, config);
                i += 1;
                j += 1;
            }
        }
    }
    let end = j;

    let score = if tally.scored == 0 {
        0.0
    } else {
        tally.total / tally.scored as f64
    };
    let denominator = tally.scored + tally.unmatched_leading;
    let high_score_ratio = if denominator == 0 {
        0.0
    } else {
        tally.high as f64 / denominator as f64
    };

    Match {
        index: start,
        lines: target[start..end].to_vec(),
        score,
        high_score_ratio,
        successful,
        failed_to_match: tally.failed_to_match,
        found_instead: tally.found_instead,
    }
}
