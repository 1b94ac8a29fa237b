// SPDX-License-Identifier: MIT
//! Ghost suggestion annotation layer.
//!
//! A ghost suggestion is advisory overlay text anchored at a document
//! offset: it is never part of document content and is recomputed or
//! invalidated from the latest revision rather than stored inside the
//! buffer. At most one exists at a time, and it is discarded (never
//! clamped) on any document or selection change other than its own
//! confirmed application.

use serde::Serialize;

use crate::document::{Document, Revision};

/// A proposed completion rendered at `anchor_offset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GhostSuggestion {
    /// The suggested text, already post-processed by the gateway.
    pub text: String,
    /// Character offset the overlay renders at (the selection end when the
    /// suggestion was installed).
    #[serde(rename = "anchorOffset")]
    pub anchor_offset: usize,
    /// Revision the fetch was issued against.
    #[serde(skip)]
    pub origin_revision: Revision,
}

impl GhostSuggestion {
    /// Whether the suggestion may still be shown against `doc`.
    ///
    /// The anchor must be a valid offset in the current document and the
    /// revision must be unchanged since the fetch was issued.
    pub fn is_current(&self, doc: &Document) -> bool {
        self.origin_revision == doc.revision() && self.anchor_offset <= doc.len()
    }
}
