// SPDX-License-Identifier: MIT
//! Chronicle co-writing engine.
//!
//! Co-author a text document with a generative-text provider: inline
//! "ghost" autocomplete while typing, and a one-shot "continue writing"
//! expansion streamed into the document with a single rollback point.
//!
//! The [`engine::Editor`] is the outward-facing handle. A UI drives it
//! through four operations (`get_text`, `insert_text_at_cursor`,
//! `reject_last_insertion`, `show_review_buttons`) plus the edit surface,
//! and reacts to [`event::EditorEvent`]s; it must not otherwise reach into
//! document internals. Rendering, input handling, and export formats live
//! outside this crate.

pub mod annotation;
pub mod config;
pub mod document;
pub mod engine;
pub mod event;
pub mod provider;
pub mod stats;

pub use annotation::GhostSuggestion;
pub use config::EngineConfig;
pub use document::{Document, DocumentError, EditOp, Revision, Selection};
pub use engine::{Activity, Editor};
pub use event::{EditorEvent, EventBroadcaster};
pub use provider::{GenerateBackend, Mode, ProviderGateway};
pub use stats::DocStats;
