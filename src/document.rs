// SPDX-License-Identifier: MIT
//! Transactional document model.
//!
//! The document is a plain character sequence addressed by *character*
//! offsets (never bytes, so multi-byte text cannot be split mid-sequence).
//! Every successful [`Document::apply`] produces a fresh, strictly
//! increasing [`Revision`]; offsets are only meaningful within the revision
//! they were read from, and any state that carries an offset across an edit
//! must remap it with [`EditOp::map_offset`].
//!
//! `apply` is atomic: it either fully succeeds or fails validation without
//! mutating anything. Out-of-range offsets are a contract violation by the
//! caller and fail loudly: they are never clamped, since clamping would
//! silently move an intended position.

use serde::Serialize;
use thiserror::Error;

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Validation failures for document operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("offset {offset} out of range for document of length {len}")]
    OutOfRange { offset: usize, len: usize },
    #[error("inverted range: from {from} > to {to}")]
    InvertedRange { from: usize, to: usize },
}

// ─── Revision ─────────────────────────────────────────────────────────────────

/// Monotonically increasing version tag, bumped on every successful edit.
///
/// Captured by in-flight asynchronous work and compared against the current
/// value on resumption: a mismatch means the result is stale and must be
/// discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Revision(pub u64);

impl Revision {
    fn next(self) -> Revision {
        Revision(self.0 + 1)
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}", self.0)
    }
}

// ─── Edit operations ──────────────────────────────────────────────────────────

/// A single document mutation. Offsets are character offsets into the
/// revision the operation was built against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOp {
    /// Insert `text` before the character at `at` (`at == len` appends).
    Insert { at: usize, text: String },
    /// Delete the half-open character range `[from, to)`.
    Delete { from: usize, to: usize },
}

impl EditOp {
    /// Net change in character count this operation causes.
    pub fn char_delta(&self) -> isize {
        match self {
            EditOp::Insert { text, .. } => text.chars().count() as isize,
            EditOp::Delete { from, to } => -((to - from) as isize),
        }
    }

    /// Remap an offset recorded before this edit to its position after it.
    ///
    /// Insert of `L` chars at `p`: offsets `>= p` shift right by `L`.
    /// Delete of `[from, to)`: offsets inside the range collapse to `from`,
    /// offsets `>= to` shift left by `to - from`.
    pub fn map_offset(&self, offset: usize) -> usize {
        match self {
            EditOp::Insert { at, text } => {
                if offset >= *at {
                    offset + text.chars().count()
                } else {
                    offset
                }
            }
            EditOp::Delete { from, to } => {
                if offset >= *to {
                    offset - (to - from)
                } else if offset > *from {
                    *from
                } else {
                    offset
                }
            }
        }
    }
}

// ─── Selection ────────────────────────────────────────────────────────────────

/// Cursor state: `anchor` is where the selection started, `head` is the
/// moving end. A caret has `anchor == head`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn caret(at: usize) -> Selection {
        Selection { anchor: at, head: at }
    }

    /// The forward end of the selection (ghost anchor and insertion point).
    pub fn end(&self) -> usize {
        self.anchor.max(self.head)
    }

    /// Carry the selection through an edit.
    pub fn remap(&mut self, op: &EditOp) {
        self.anchor = op.map_offset(self.anchor);
        self.head = op.map_offset(self.head);
    }
}

impl Default for Selection {
    fn default() -> Self {
        Selection::caret(0)
    }
}

// ─── Document ─────────────────────────────────────────────────────────────────

/// Result of a successful [`Document::apply`].
#[derive(Debug, Clone)]
pub struct AppliedEdit {
    /// The revision produced by this edit.
    pub revision: Revision,
}

/// The text buffer plus its revision counter.
#[derive(Debug, Clone)]
pub struct Document {
    text: String,
    /// Cached character count of `text`.
    char_len: usize,
    revision: Revision,
}

impl Document {
    pub fn new() -> Document {
        Document::from_text(String::new())
    }

    pub fn from_text(text: impl Into<String>) -> Document {
        let text = text.into();
        let char_len = text.chars().count();
        Document {
            text,
            char_len,
            revision: Revision(0),
        }
    }

    /// Character count (not bytes).
    pub fn len(&self) -> usize {
        self.char_len
    }

    pub fn is_empty(&self) -> bool {
        self.char_len == 0
    }

    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// The full document text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Text of the character range `[from, to)`.
    pub fn text_between(&self, from: usize, to: usize) -> Result<String, DocumentError> {
        self.validate_range(from, to)?;
        let start = self.byte_at(from);
        let end = self.byte_at(to);
        Ok(self.text[start..end].to_string())
    }

    /// Apply an edit. Either fully succeeds (new text, fresh revision) or
    /// fails validation with no mutation at all.
    pub fn apply(&mut self, op: &EditOp) -> Result<AppliedEdit, DocumentError> {
        match op {
            EditOp::Insert { at, text } => {
                if *at > self.char_len {
                    return Err(DocumentError::OutOfRange {
                        offset: *at,
                        len: self.char_len,
                    });
                }
                let byte = self.byte_at(*at);
                self.text.insert_str(byte, text);
                self.char_len += text.chars().count();
            }
            EditOp::Delete { from, to } => {
                self.validate_range(*from, *to)?;
                let start = self.byte_at(*from);
                let end = self.byte_at(*to);
                self.text.replace_range(start..end, "");
                self.char_len -= to - from;
            }
        }
        self.revision = self.revision.next();
        Ok(AppliedEdit {
            revision: self.revision,
        })
    }

    fn validate_range(&self, from: usize, to: usize) -> Result<(), DocumentError> {
        if from > to {
            return Err(DocumentError::InvertedRange { from, to });
        }
        if to > self.char_len {
            return Err(DocumentError::OutOfRange {
                offset: to,
                len: self.char_len,
            });
        }
        Ok(())
    }

    /// Byte index of the character at `offset`. Caller must have validated
    /// `offset <= char_len`.
    fn byte_at(&self, offset: usize) -> usize {
        if offset == self.char_len {
            return self.text.len();
        }
        self.text
            .char_indices()
            .nth(offset)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }
}

impl Default for Document {
    fn default() -> Self {
        Document::new()
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
