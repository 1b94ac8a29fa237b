// SPDX-License-Identifier: MIT
//! Editor engine: the session controller and the outward surface.
//!
//! The engine owns the document, the selection, the ghost annotation, and
//! the streaming session, all behind a single async mutex. Every mutation
//! goes through [`apply_and_remap`], the sole serialization point: it
//! applies the edit, carries every tracked offset (selection, stream
//! insertion point) through it, and discards the ghost overlay: an edit
//! from anywhere other than the suggestion's own application invalidates it.
//!
//! Generation is single-flight. [`Activity`] is an explicit state value,
//! not an ambient boolean: `continue_writing` is a no-op unless the engine
//! is idle, and the suggestion pipeline only schedules work while idle.
//!
//! The outward surface mirrors the four operations a UI is allowed to use:
//! `get_text`, `insert_text_at_cursor`, `reject_last_insertion`, and
//! `show_review_buttons`, plus the event stream and the autocomplete
//! toggle.

pub mod stream;
pub mod suggest;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::annotation::GhostSuggestion;
use crate::config::EngineConfig;
use crate::document::{Document, DocumentError, EditOp, Revision, Selection};
use crate::event::{EditorEvent, EventBroadcaster};
use crate::provider::ProviderGateway;
use crate::stats::DocStats;

use stream::StreamSession;
use suggest::SuggestState;

// ─── Activity ─────────────────────────────────────────────────────────────────

/// Which generation activity currently owns the editor.
///
/// `Idle` does not mean "nothing pending": a finished stream keeps its
/// snapshot live for review while the engine is already idle again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Idle,
    /// A continue-writing provider call is in flight.
    Requesting,
    /// A reveal timer is feeding fetched text into the document.
    Revealing,
}

// ─── State ────────────────────────────────────────────────────────────────────

/// Everything mutable, guarded by one mutex.
pub(crate) struct EditorState {
    pub document: Document,
    pub selection: Selection,
    pub ghost: Option<GhostSuggestion>,
    pub stream: Option<StreamSession>,
    pub activity: Activity,
    pub autocomplete_enabled: bool,
    pub suggest_state: SuggestState,
    /// Bumped on every debounce restart; a sleeping cycle that wakes with a
    /// stale sequence number belongs to a cancelled cycle and exits.
    pub debounce_seq: u64,
    pub debounce_task: Option<JoinHandle<()>>,
    pub stream_task: Option<JoinHandle<()>>,
}

pub(crate) struct EditorInner {
    pub config: EngineConfig,
    pub gateway: ProviderGateway,
    pub events: EventBroadcaster,
    pub state: Mutex<EditorState>,
}

/// Apply an edit and carry all tracked state through it.
///
/// This is the only place the document is mutated. On success the selection
/// and the stream insertion point are remapped, any ghost is discarded, and
/// a `DocumentChanged` event is published. On validation failure nothing
/// changes.
pub(crate) fn apply_and_remap(
    state: &mut EditorState,
    events: &EventBroadcaster,
    op: &EditOp,
) -> Result<Revision, DocumentError> {
    let applied = state.document.apply(op)?;

    state.selection.remap(op);
    if let Some(session) = state.stream.as_mut() {
        session.insert_at = op.map_offset(session.insert_at);
    }
    if state.ghost.take().is_some() {
        state.suggest_state = SuggestState::Idle;
        events.publish(EditorEvent::GhostCleared);
    }

    events.publish(EditorEvent::DocumentChanged {
        revision: applied.revision,
    });
    Ok(applied.revision)
}

// ─── Editor ───────────────────────────────────────────────────────────────────

/// Handle to the co-writing engine. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct Editor {
    inner: Arc<EditorInner>,
}

impl Editor {
    /// Build an editor with an explicit gateway (tests inject scripted
    /// backends this way).
    pub fn new(config: EngineConfig, gateway: ProviderGateway) -> Editor {
        Editor {
            inner: Arc::new(EditorInner {
                config,
                gateway,
                events: EventBroadcaster::new(),
                state: Mutex::new(EditorState {
                    document: Document::new(),
                    selection: Selection::default(),
                    ghost: None,
                    stream: None,
                    activity: Activity::Idle,
                    autocomplete_enabled: true,
                    suggest_state: SuggestState::Idle,
                    debounce_seq: 0,
                    debounce_task: None,
                    stream_task: None,
                }),
            }),
        }
    }

    /// Build an editor with the HTTP backend from `config`.
    pub fn from_config(config: EngineConfig) -> Result<Editor> {
        let gateway = ProviderGateway::from_config(&config.provider)?;
        Ok(Editor::new(config, gateway))
    }

    /// Subscribe to UI events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<EditorEvent> {
        self.inner.events.subscribe()
    }

    // ── Read surface ──────────────────────────────────────────────────────

    /// Full document text. The only thing exporters may consume.
    pub async fn get_text(&self) -> String {
        self.inner.state.lock().await.document.text().to_string()
    }

    pub async fn revision(&self) -> Revision {
        self.inner.state.lock().await.document.revision()
    }

    pub async fn selection(&self) -> Selection {
        self.inner.state.lock().await.selection
    }

    /// Currently displayed ghost suggestion, if any.
    pub async fn ghost(&self) -> Option<GhostSuggestion> {
        self.inner.state.lock().await.ghost.clone()
    }

    /// Whether a snapshot is live (a continuation is revealing or up for
    /// review).
    pub async fn review_pending(&self) -> bool {
        self.inner.state.lock().await.stream.is_some()
    }

    pub async fn activity(&self) -> Activity {
        self.inner.state.lock().await.activity
    }

    /// Word/line/paragraph statistics over the current text.
    pub async fn stats(&self) -> DocStats {
        crate::stats::doc_stats(self.inner.state.lock().await.document.text())
    }

    // ── Edit surface ──────────────────────────────────────────────────────

    /// Apply a user edit. Triggers the suggestion pipeline.
    pub async fn apply_edit(&self, op: EditOp) -> Result<Revision, DocumentError> {
        let mut state = self.inner.state.lock().await;
        let revision = apply_and_remap(&mut state, &self.inner.events, &op)?;
        suggest::schedule(&self.inner, &mut state);
        Ok(revision)
    }

    /// Insert text at the selection end: the UI's typing entry point.
    pub async fn insert_text_at_cursor(&self, text: &str) -> Result<Revision, DocumentError> {
        let mut state = self.inner.state.lock().await;
        let op = EditOp::Insert {
            at: state.selection.end(),
            text: text.to_string(),
        };
        let revision = apply_and_remap(&mut state, &self.inner.events, &op)?;
        suggest::schedule(&self.inner, &mut state);
        Ok(revision)
    }

    /// Move the selection. A selection change independent of an edit
    /// discards any displayed ghost.
    pub async fn set_selection(&self, anchor: usize, head: usize) -> Result<(), DocumentError> {
        let mut state = self.inner.state.lock().await;
        let len = state.document.len();
        for offset in [anchor, head] {
            if offset > len {
                return Err(DocumentError::OutOfRange { offset, len });
            }
        }
        let next = Selection { anchor, head };
        if next != state.selection {
            state.selection = next;
            if state.ghost.take().is_some() {
                state.suggest_state = SuggestState::Idle;
                self.inner.events.publish(EditorEvent::GhostCleared);
            }
        }
        Ok(())
    }

    /// Accept the displayed ghost suggestion: insert its text at the anchor
    /// as a normal edit. Returns `false` when nothing is displayed.
    pub async fn accept_suggestion(&self) -> Result<bool, DocumentError> {
        let mut state = self.inner.state.lock().await;
        let Some(ghost) = state.ghost.take() else {
            return Ok(false);
        };
        state.suggest_state = SuggestState::Idle;
        self.inner.events.publish(EditorEvent::GhostCleared);

        let op = EditOp::Insert {
            at: ghost.anchor_offset,
            text: ghost.text,
        };
        apply_and_remap(&mut state, &self.inner.events, &op)?;
        suggest::schedule(&self.inner, &mut state);
        Ok(true)
    }

    /// Toggle ghost autocomplete. Read fresh at every decision point, so a
    /// mid-flight toggle takes effect at the next one. Disabling discards
    /// any displayed ghost.
    pub async fn set_autocomplete(&self, enabled: bool) {
        let mut state = self.inner.state.lock().await;
        state.autocomplete_enabled = enabled;
        if !enabled && state.ghost.take().is_some() {
            state.suggest_state = SuggestState::Idle;
            self.inner.events.publish(EditorEvent::GhostCleared);
        }
    }

    pub async fn autocomplete_enabled(&self) -> bool {
        self.inner.state.lock().await.autocomplete_enabled
    }

    // ── Continue-writing session ──────────────────────────────────────────

    /// Start a continue-writing session. No-op (returns `false`) while a
    /// request or reveal is running. A pending review is implicitly
    /// accepted first.
    pub async fn continue_writing(&self) -> bool {
        let mut state = self.inner.state.lock().await;
        if state.activity != Activity::Idle {
            debug!(activity = ?state.activity, "continue_writing ignored: busy");
            return false;
        }

        // Implicit accept: a finished-but-unreviewed session is finalized.
        if state.stream.take().is_some() {
            self.inner
                .events
                .publish(EditorEvent::ReviewButtons { show: false });
        }

        state.activity = Activity::Requesting;
        let prompt = state.document.text().to_string();
        info!(chars = prompt.chars().count(), "continue-writing session started");
        self.inner.events.publish(EditorEvent::StreamStarted);

        let inner = self.inner.clone();
        state.stream_task = Some(tokio::spawn(async move {
            stream::run_session(inner, prompt).await;
        }));
        true
    }

    /// Roll back the last continuation. Restores the pre-session snapshot,
    /// cancelling the reveal if it is still running. Idempotent: without a
    /// live snapshot this is a no-op.
    pub async fn reject_last_insertion(&self) -> bool {
        let mut state = self.inner.state.lock().await;
        let Some(session) = state.stream.take() else {
            debug!("reject ignored: no live snapshot");
            return false;
        };

        if let Some(task) = state.stream_task.take() {
            task.abort();
        }

        // Full replacement, not a diff: the snapshot is the exact
        // pre-session text.
        let len = state.document.len();
        if len > 0 {
            let op = EditOp::Delete { from: 0, to: len };
            // Range is valid by construction.
            let _ = apply_and_remap(&mut state, &self.inner.events, &op);
        }
        if !session.snapshot.is_empty() {
            let op = EditOp::Insert {
                at: 0,
                text: session.snapshot,
            };
            let _ = apply_and_remap(&mut state, &self.inner.events, &op);
        }

        state.activity = Activity::Idle;
        self.inner
            .events
            .publish(EditorEvent::ReviewButtons { show: false });
        info!("continuation rejected: snapshot restored");
        true
    }

    /// Show or hide the review affordance. Hiding it while no reveal is
    /// running finalizes the inserted text (implicit accept).
    pub async fn show_review_buttons(&self, show: bool) {
        let mut state = self.inner.state.lock().await;
        self.inner
            .events
            .publish(EditorEvent::ReviewButtons { show });
        if !show && state.activity == Activity::Idle && state.stream.take().is_some() {
            debug!("review dismissed: continuation finalized");
        }
    }

    /// Cancel all live timers and tasks. Call before tearing the editor
    /// down so no dangling callback touches dead state.
    pub async fn shutdown(&self) {
        let mut state = self.inner.state.lock().await;
        if let Some(task) = state.debounce_task.take() {
            task.abort();
        }
        if let Some(task) = state.stream_task.take() {
            task.abort();
        }
        state.activity = Activity::Idle;
        state.suggest_state = SuggestState::Idle;
    }
}
