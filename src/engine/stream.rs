// SPDX-License-Identifier: MIT
//! Streaming insertion session: "continue writing" with rollback.
//!
//! The session fetches a continuation for the whole document, then reveals
//! it into the buffer chunk by chunk on a repeating timer. The full
//! pre-session text is captured as a snapshot before anything is inserted;
//! rejecting at any point (mid-reveal included) restores exactly that
//! text. There is only ever one rollback point.
//!
//! The insertion point advances monotonically: it is remapped through every
//! edit like any tracked offset, so each chunk lands at the end of the
//! previous one even if the user types elsewhere during the reveal.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::document::EditOp;
use crate::event::EditorEvent;
use crate::provider::Mode;

use super::{apply_and_remap, Activity, EditorInner};

/// A live continuation: fetched text, reveal progress, and the rollback
/// snapshot. Exists from the moment the provider call succeeds until the
/// review is cleared (accepted or rejected).
pub(crate) struct StreamSession {
    pub source_text: String,
    /// Character count of `source_text`.
    pub source_chars: usize,
    /// Characters revealed so far; grows monotonically to `source_chars`.
    pub revealed: usize,
    pub chunk_size: usize,
    /// Where the next chunk is inserted. Remapped through every edit.
    pub insert_at: usize,
    /// Exact pre-session document text. Immutable once captured.
    pub snapshot: String,
    /// False once fully revealed or cancelled.
    pub active: bool,
}

/// Drive one continue-writing session: fetch, then reveal.
///
/// The caller (the session controller) has already set the activity to
/// `Requesting` and published `StreamStarted`; `prompt` is the full
/// document text at that instant and doubles as the rollback snapshot.
pub(crate) async fn run_session(inner: Arc<EditorInner>, prompt: String) {
    let text = inner.gateway.generate(&prompt, Mode::Continue).await;

    {
        let mut state = inner.state.lock().await;
        if text.is_empty() {
            // Abort: no document mutation happened, the snapshot is
            // discarded, and the activity flag is released so the user can
            // retry.
            warn!("continuation failed: no text from any model");
            state.activity = Activity::Idle;
            inner.events.publish(EditorEvent::StreamFailed);
            return;
        }

        let source_chars = text.chars().count();
        debug!(chars = source_chars, "continuation received: starting reveal");
        state.stream = Some(StreamSession {
            source_text: text,
            source_chars,
            revealed: 0,
            chunk_size: inner.config.stream.chunk_chars.max(1),
            insert_at: state.selection.end(),
            snapshot: prompt,
            active: true,
        });
        state.activity = Activity::Revealing;
    }

    let mut interval = tokio::time::interval(inner.config.stream.tick());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick of a tokio interval completes immediately; consume it
    // so every chunk waits one full period before landing.
    interval.tick().await;

    loop {
        interval.tick().await;

        let mut state = inner.state.lock().await;
        let Some(session) = state.stream.as_ref() else {
            // Rejected between ticks.
            break;
        };
        if !session.active {
            break;
        }

        let start = session.revealed;
        let end = (start + session.chunk_size).min(session.source_chars);
        let chunk: String = session
            .source_text
            .chars()
            .skip(start)
            .take(end - start)
            .collect();
        let op = EditOp::Insert {
            at: session.insert_at,
            text: chunk,
        };

        if let Err(e) = apply_and_remap(&mut state, &inner.events, &op) {
            // The insertion point is remapped through every edit, so this
            // is unreachable in practice; stop the reveal and leave the
            // review open so reject can still restore the snapshot.
            warn!(error = %e, "reveal insert failed: stopping");
            if let Some(session) = state.stream.as_mut() {
                session.active = false;
            }
            state.activity = Activity::Idle;
            inner.events.publish(EditorEvent::StreamFinished);
            inner.events.publish(EditorEvent::ReviewButtons { show: true });
            break;
        }

        if let Some(session) = state.stream.as_mut() {
            session.revealed = end;
            if end == session.source_chars {
                session.active = false;
                state.activity = Activity::Idle;
                debug!(chars = end, "reveal complete: review available");
                inner.events.publish(EditorEvent::StreamFinished);
                inner.events.publish(EditorEvent::ReviewButtons { show: true });
                break;
            }
        }
    }
}
