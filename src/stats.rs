// SPDX-License-Identifier: MIT
//! Document statistics for the sidebar analytics panel.
//!
//! Computed purely from `get_text()` output: the stats consumer never
//! reaches into document internals.

use serde::Serialize;

/// Estimated rendered width used for the wrapped-line count.
const CHARS_PER_LINE: usize = 95;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DocStats {
    pub words: usize,
    /// Display lines, counting soft wraps at [`CHARS_PER_LINE`] characters.
    pub lines: usize,
    pub paragraphs: usize,
}

/// Word, wrapped-line, and paragraph counts for `text`.
pub fn doc_stats(text: &str) -> DocStats {
    let words = text.split_whitespace().count();

    let paragraphs = text
        .split("\n\n")
        .filter(|p| !p.trim().is_empty())
        .count();
    let paragraphs = if paragraphs == 0 && words > 0 { 1 } else { paragraphs };

    let mut lines = 0usize;
    for line in text.split('\n') {
        let chars = line.chars().count();
        if chars == 0 {
            lines += 1;
        } else {
            lines += chars.div_ceil(CHARS_PER_LINE);
        }
    }
    let lines = if text.is_empty() { 0 } else { lines.max(1) };

    DocStats {
        words,
        lines,
        paragraphs,
    }
}
