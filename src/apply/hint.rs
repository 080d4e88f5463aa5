//! Suggestions attached to check failures, aimed at whoever proposes the next
//! edit.

use crate::block::{EditBlock, EditType};

const DELIMITERS: [(char, char); 3] = [('(', ')'), ('{', '}'), ('[', ']')];

/// Old-line counts at or below this are considered thin context.
const SHORT_CONTEXT_LINES: usize = 3;

const SYNTAX_MARKERS: [&str; 3] = ["syntax error", "parse error", "unexpected token"];

/// Pick the most specific hint for a block whose checks failed.
pub fn failure_hint(block: &EditBlock, check_output: &str) -> String {
    let unbalanced: Vec<String> = DELIMITERS
        .iter()
        .filter_map(|&(open, close)| {
            let old = net_depth(&block.old_lines, open, close);
            let new = net_depth(&block.new_lines, open, close);
            (old != new).then(|| format!("{open}{close} ({old:+} before, {new:+} after)"))
        })
        .collect();

    if !unbalanced.is_empty() {
        return format!(
            "the edit changes delimiter balance for {}; make the replacement open and close \
             the same delimiters as the lines it replaces",
            unbalanced.join(", ")
        );
    }

    if block.edit_type == EditType::Update && block.old_lines.len() <= SHORT_CONTEXT_LINES {
        return "the old lines are very short and may have matched the wrong place; include more \
                surrounding lines"
            .to_string();
    }

    let lowered = check_output.to_lowercase();
    if SYNTAX_MARKERS.iter().any(|m| lowered.contains(m)) {
        return "the result does not parse; re-read the current file contents and rewrite the \
                edit as complete, well-formed code"
            .to_string();
    }

    "the change was reverted; try a different approach rather than resubmitting the same edit"
        .to_string()
}

fn net_depth(lines: &[String], open: char, close: char) -> i64 {
    lines
        .iter()
        .flat_map(|line| line.chars())
        .map(|c| {
            if c == open {
                1
            } else if c == close {
                -1
            } else {
                0
            }
        })
        .sum()
}
