// SPDX-License-Identifier: MIT
//! Suggestion pipeline: debounced ghost autocomplete.
//!
//! # State machine
//!
//! ```text
//! Idle ──(edit)──► Debouncing ──(timer)──► Fetching ──(fresh result)──► Displaying
//!   ▲                  │                       │                            │
//!   └──(short context)─┘      (stale / error / │ disabled)                  │
//!   ◄───────────────────────────────────────────┘                           │
//!   ◄──(accept, or any document/selection change)───────────────────────────┘
//! ```
//!
//! A new edit while debouncing or fetching cancels and restarts the cycle;
//! nothing is queued. Cancellation of the sleep is a task abort plus a
//! sequence bump; an in-flight network call is never cancelled, its result
//! is discarded post hoc when the originating revision no longer matches
//! (the staleness guard).

use std::sync::Arc;

use tracing::debug;

use crate::annotation::GhostSuggestion;
use crate::event::EditorEvent;
use crate::provider::Mode;

use super::{Activity, EditorInner, EditorState};

/// Pipeline phase. At most one cycle is live; the sequence number in
/// [`EditorState`] says which.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestState {
    Idle,
    Debouncing,
    Fetching,
    Displaying,
}

/// (Re)start the debounce cycle after a document change. Caller holds the
/// state lock.
///
/// The previous cycle, if any, is cancelled: its sleep is aborted and the
/// sequence bump strands any fetch it already issued.
pub(crate) fn schedule(inner: &Arc<EditorInner>, state: &mut EditorState) {
    state.debounce_seq += 1;
    if let Some(task) = state.debounce_task.take() {
        task.abort();
    }

    // The toggle and the activity guard are read fresh here and again at
    // every later decision point.
    if !state.autocomplete_enabled || state.activity != Activity::Idle {
        state.suggest_state = SuggestState::Idle;
        return;
    }

    state.suggest_state = SuggestState::Debouncing;
    let seq = state.debounce_seq;
    let delay = inner.config.suggest.debounce();
    let inner = inner.clone();
    state.debounce_task = Some(tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        run_cycle(inner, seq).await;
    }));
}

/// One debounce cycle: extract context, fetch, and install the ghost if the
/// document held still.
async fn run_cycle(inner: Arc<EditorInner>, seq: u64) {
    let (context, origin_revision, captured_selection) = {
        let mut state = inner.state.lock().await;
        if state.debounce_seq != seq {
            // A newer cycle owns the pipeline now.
            return;
        }
        if !state.autocomplete_enabled || state.activity != Activity::Idle {
            state.suggest_state = SuggestState::Idle;
            return;
        }

        // Trailing context window ending at the selection end.
        let end = state.selection.end();
        let from = end.saturating_sub(inner.config.suggest.context_window);
        let context = match state.document.text_between(from, end) {
            Ok(text) => text,
            Err(e) => {
                debug!(error = %e, "context extraction failed");
                state.suggest_state = SuggestState::Idle;
                return;
            }
        };

        if context.chars().count() <= inner.config.suggest.min_context {
            state.suggest_state = SuggestState::Idle;
            return;
        }

        state.suggest_state = SuggestState::Fetching;
        (context, state.document.revision(), state.selection)
    };

    let completion = inner.gateway.generate(&context, Mode::Complete).await;

    let mut state = inner.state.lock().await;
    if state.debounce_seq != seq {
        return;
    }

    // Staleness guard: anything moved while the fetch was in flight means
    // the result no longer fits: discard, show nothing.
    if state.document.revision() != origin_revision || state.selection != captured_selection {
        debug!(origin = %origin_revision, current = %state.document.revision(),
               "completion discarded: document moved during fetch");
        state.suggest_state = SuggestState::Idle;
        return;
    }
    if !state.autocomplete_enabled || state.activity != Activity::Idle {
        state.suggest_state = SuggestState::Idle;
        return;
    }
    if completion.is_empty() {
        state.suggest_state = SuggestState::Idle;
        return;
    }

    let anchor = state.selection.end();
    debug!(anchor, chars = completion.chars().count(), "ghost suggestion installed");
    state.ghost = Some(GhostSuggestion {
        text: completion.clone(),
        anchor_offset: anchor,
        origin_revision,
    });
    state.suggest_state = SuggestState::Displaying;
    inner.events.publish(EditorEvent::GhostShown {
        text: completion,
        anchor,
    });
}
