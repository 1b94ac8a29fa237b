// SPDX-License-Identifier: MIT
// Engine coordination tests: debounce coalescing, the staleness guard,
// single-flight continuation, reveal/reject semantics. All timer-sensitive
// tests run on a paused tokio clock, so they are deterministic and fast.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chronicled::{
    Activity, EditOp, Editor, EditorEvent, EngineConfig, GenerateBackend, ProviderGateway,
};
use tokio::sync::{broadcast, Notify, Semaphore};

// ─── Test backends ────────────────────────────────────────────────────────────

/// Answers from a fixed queue; exhausted queues fail. Records prompts.
struct ScriptedBackend {
    responses: Mutex<VecDeque<anyhow::Result<String>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    fn new(responses: Vec<anyhow::Result<String>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerateBackend for ScriptedBackend {
    async fn generate(&self, _model: &str, prompt: &str) -> anyhow::Result<String> {
        self.calls.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(anyhow::anyhow!("script exhausted")))
    }
}

/// Blocks every call until explicitly released, so tests can hold a fetch
/// in flight while the document moves underneath it.
struct GatedBackend {
    response: String,
    started: Notify,
    gate: Semaphore,
    calls: Mutex<Vec<String>>,
}

impl GatedBackend {
    fn new(response: &str) -> Arc<Self> {
        Arc::new(Self {
            response: response.to_string(),
            started: Notify::new(),
            gate: Semaphore::new(0),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerateBackend for GatedBackend {
    async fn generate(&self, _model: &str, prompt: &str) -> anyhow::Result<String> {
        self.calls.lock().unwrap().push(prompt.to_string());
        self.started.notify_one();
        let permit = self.gate.acquire().await?;
        permit.forget();
        Ok(self.response.clone())
    }
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn editor_with(
    backend: Arc<dyn GenerateBackend>,
    tweak: impl FnOnce(&mut EngineConfig),
) -> Editor {
    let mut config = EngineConfig::default();
    tweak(&mut config);
    let gateway = ProviderGateway::new(backend, vec!["test-model".to_string()]);
    Editor::new(config, gateway)
}

/// Wait (bounded) for the first event matching `pred`.
async fn wait_for(
    rx: &mut broadcast::Receiver<EditorEvent>,
    pred: impl Fn(&EditorEvent) -> bool,
) -> EditorEvent {
    tokio::time::timeout(Duration::from_secs(30), async {
        loop {
            let event = rx.recv().await.expect("event channel closed");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("expected event never arrived")
}

// ─── Suggestion pipeline ──────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn debounce_coalesces_rapid_edits() {
    let backend = ScriptedBackend::new(vec![Ok(" and beyond".into())]);
    let editor = editor_with(backend.clone(), |_| {});

    // Three edits in quick succession: well inside the debounce window.
    editor.insert_text_at_cursor("Hello ").await.unwrap();
    editor.insert_text_at_cursor("brave ").await.unwrap();
    editor.insert_text_at_cursor("new world").await.unwrap();

    tokio::time::sleep(Duration::from_millis(600)).await;

    // One fetch, with the context captured at the last edit.
    let calls = backend.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].contains("Hello brave new world"));

    let ghost = editor.ghost().await.expect("ghost installed");
    assert_eq!(ghost.text, " and beyond");
    assert_eq!(ghost.anchor_offset, 21);
}

#[tokio::test(start_paused = true)]
async fn short_context_skips_fetch() {
    let backend = ScriptedBackend::new(vec![Ok("never".into())]);
    let editor = editor_with(backend.clone(), |_| {});

    // Exactly the minimum is still too short.
    editor.insert_text_at_cursor("12345").await.unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;

    assert!(backend.calls().is_empty());
    assert!(editor.ghost().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn staleness_guard_discards_result_after_edit() {
    let backend = GatedBackend::new("stale completion");
    let editor = editor_with(backend.clone(), |_| {});

    editor.insert_text_at_cursor("Hello world").await.unwrap();
    // Debounce elapses, the fetch is now held in flight.
    backend.started.notified().await;

    // The document moves while the fetch is pending.
    editor.insert_text_at_cursor("!").await.unwrap();

    backend.release(1);
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The resolved completion was issued against a dead revision: no ghost.
    assert!(editor.ghost().await.is_none());

    // The restarted cycle fetches again with fresh context.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(backend.calls().len(), 2);
    assert!(backend.calls()[1].contains("Hello world!"));
}

#[tokio::test(start_paused = true)]
async fn selection_move_during_fetch_discards_result() {
    let backend = GatedBackend::new("stale completion");
    let editor = editor_with(backend.clone(), |_| {});

    editor.insert_text_at_cursor("Hello world").await.unwrap();
    backend.started.notified().await;

    editor.set_selection(0, 0).await.unwrap();
    backend.release(1);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(editor.ghost().await.is_none());
    assert_eq!(backend.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn accept_inserts_suggestion_at_anchor() {
    let backend = ScriptedBackend::new(vec![Ok(" there".into())]);
    let editor = editor_with(backend.clone(), |_| {});

    editor.insert_text_at_cursor("Hello world").await.unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(editor.ghost().await.is_some());

    assert!(editor.accept_suggestion().await.unwrap());
    assert_eq!(editor.get_text().await, "Hello world there");
    assert!(editor.ghost().await.is_none());
    // The caret rode the insertion to its end.
    assert_eq!(editor.selection().await.end(), 17);
}

#[tokio::test(start_paused = true)]
async fn any_edit_discards_displayed_ghost() {
    let backend = ScriptedBackend::new(vec![Ok(" there".into())]);
    let editor = editor_with(backend.clone(), |_| {});

    editor.insert_text_at_cursor("Hello world").await.unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(editor.ghost().await.is_some());

    // A deletion far from the anchor still invalidates the overlay.
    editor
        .apply_edit(EditOp::Delete { from: 0, to: 1 })
        .await
        .unwrap();
    assert!(editor.ghost().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn selection_change_discards_displayed_ghost() {
    let backend = ScriptedBackend::new(vec![Ok(" there".into())]);
    let editor = editor_with(backend.clone(), |_| {});

    editor.insert_text_at_cursor("Hello world").await.unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(editor.ghost().await.is_some());

    editor.set_selection(0, 0).await.unwrap();
    assert!(editor.ghost().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn disabled_autocomplete_never_fetches() {
    let backend = ScriptedBackend::new(vec![Ok("never".into())]);
    let editor = editor_with(backend.clone(), |_| {});

    editor.set_autocomplete(false).await;
    editor.insert_text_at_cursor("Hello world").await.unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;

    assert!(backend.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn toggle_mid_debounce_takes_effect_at_next_decision_point() {
    let backend = ScriptedBackend::new(vec![Ok(" tail".into())]);
    let editor = editor_with(backend.clone(), |_| {});

    editor.insert_text_at_cursor("Hello world").await.unwrap();
    // Disabled before the timer elapses: the pending cycle must see it.
    editor.set_autocomplete(false).await;
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(backend.calls().is_empty());

    // Re-enabled: the next edit fetches normally.
    editor.set_autocomplete(true).await;
    editor.insert_text_at_cursor("!").await.unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(backend.calls().len(), 1);
    assert!(editor.ghost().await.is_some());
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_pending_debounce() {
    let backend = ScriptedBackend::new(vec![Ok("never".into())]);
    let editor = editor_with(backend.clone(), |_| {});

    editor.insert_text_at_cursor("Hello world").await.unwrap();
    editor.shutdown().await;
    tokio::time::sleep(Duration::from_millis(600)).await;

    assert!(backend.calls().is_empty());
}

// ─── Continue-writing session ─────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn reveal_then_reject_restores_snapshot() {
    let backend = ScriptedBackend::new(vec![Ok("DEF".into())]);
    let editor = editor_with(backend.clone(), |c| c.stream.chunk_chars = 2);
    editor.set_autocomplete(false).await;
    editor.insert_text_at_cursor("ABC").await.unwrap();

    let mut rx = editor.subscribe();
    assert!(editor.continue_writing().await);
    wait_for(&mut rx, |e| matches!(e, EditorEvent::StreamFinished)).await;

    // Revealed as "DE" then "F".
    assert_eq!(editor.get_text().await, "ABCDEF");
    assert!(editor.review_pending().await);
    assert_eq!(editor.activity().await, Activity::Idle);
    assert!(backend.calls()[0].contains("ABC"));

    assert!(editor.reject_last_insertion().await);
    assert_eq!(editor.get_text().await, "ABC");
    assert!(!editor.review_pending().await);

    // Idempotent: a second reject with no live snapshot is a no-op.
    assert!(!editor.reject_last_insertion().await);
    assert_eq!(editor.get_text().await, "ABC");
}

#[tokio::test(start_paused = true)]
async fn reject_mid_reveal_cancels_and_restores() {
    let backend = ScriptedBackend::new(vec![Ok("DEFGHI".into())]);
    let editor = editor_with(backend.clone(), |c| c.stream.chunk_chars = 1);
    editor.set_autocomplete(false).await;
    editor.insert_text_at_cursor("ABC").await.unwrap();

    let mut rx = editor.subscribe();
    assert!(editor.continue_writing().await);
    // At least one chunk has landed.
    wait_for(&mut rx, |e| matches!(e, EditorEvent::DocumentChanged { .. })).await;

    assert!(editor.reject_last_insertion().await);
    assert_eq!(editor.get_text().await, "ABC");
    assert_eq!(editor.activity().await, Activity::Idle);

    // The reveal timer is dead: nothing else arrives.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(editor.get_text().await, "ABC");
}

#[tokio::test(start_paused = true)]
async fn continue_is_single_flight() {
    let backend = GatedBackend::new("MORE");
    let editor = editor_with(backend.clone(), |_| {});
    editor.set_autocomplete(false).await;
    editor.insert_text_at_cursor("ABC").await.unwrap();

    let mut rx = editor.subscribe();
    assert!(editor.continue_writing().await);
    backend.started.notified().await;
    assert_eq!(editor.activity().await, Activity::Requesting);

    // Second start while the request is in flight: no-op.
    assert!(!editor.continue_writing().await);

    backend.release(1);
    wait_for(&mut rx, |e| matches!(e, EditorEvent::StreamFinished)).await;
    assert_eq!(editor.get_text().await, "ABCMORE");
    assert_eq!(backend.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn new_session_implicitly_accepts_previous() {
    let backend = ScriptedBackend::new(vec![Ok("DEF".into()), Ok("GHI".into())]);
    let editor = editor_with(backend.clone(), |_| {});
    editor.set_autocomplete(false).await;
    editor.insert_text_at_cursor("ABC").await.unwrap();

    let mut rx = editor.subscribe();
    assert!(editor.continue_writing().await);
    wait_for(&mut rx, |e| matches!(e, EditorEvent::StreamFinished)).await;
    assert_eq!(editor.get_text().await, "ABCDEF");
    assert!(editor.review_pending().await);

    // Starting again finalizes the first continuation and snapshots anew.
    assert!(editor.continue_writing().await);
    wait_for(&mut rx, |e| matches!(e, EditorEvent::StreamFinished)).await;
    assert_eq!(editor.get_text().await, "ABCDEFGHI");

    // Reject only rolls back the most recent session.
    assert!(editor.reject_last_insertion().await);
    assert_eq!(editor.get_text().await, "ABCDEF");
}

#[tokio::test(start_paused = true)]
async fn failed_continuation_leaves_document_and_allows_retry() {
    let backend = ScriptedBackend::new(vec![
        Err(anyhow::anyhow!("API Error 503")),
        Ok("XYZ".into()),
    ]);
    let editor = editor_with(backend.clone(), |_| {});
    editor.set_autocomplete(false).await;
    editor.insert_text_at_cursor("ABC").await.unwrap();

    let mut rx = editor.subscribe();
    assert!(editor.continue_writing().await);
    wait_for(&mut rx, |e| matches!(e, EditorEvent::StreamFailed)).await;

    assert_eq!(editor.get_text().await, "ABC");
    assert!(!editor.review_pending().await);
    assert_eq!(editor.activity().await, Activity::Idle);

    // The activity flag was released: retry succeeds.
    assert!(editor.continue_writing().await);
    wait_for(&mut rx, |e| matches!(e, EditorEvent::StreamFinished)).await;
    assert_eq!(editor.get_text().await, "ABCXYZ");
}

#[tokio::test(start_paused = true)]
async fn dismissing_review_finalizes_text() {
    let backend = ScriptedBackend::new(vec![Ok("DEF".into())]);
    let editor = editor_with(backend.clone(), |_| {});
    editor.set_autocomplete(false).await;
    editor.insert_text_at_cursor("ABC").await.unwrap();

    let mut rx = editor.subscribe();
    assert!(editor.continue_writing().await);
    wait_for(&mut rx, |e| matches!(e, EditorEvent::StreamFinished)).await;
    assert!(editor.review_pending().await);

    editor.show_review_buttons(false).await;
    assert!(!editor.review_pending().await);

    // The snapshot is gone: reject can no longer roll back.
    assert!(!editor.reject_last_insertion().await);
    assert_eq!(editor.get_text().await, "ABCDEF");
}

// ─── Pipeline/session interleavings ───────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn suggestions_suppressed_while_streaming() {
    let backend = ScriptedBackend::new(vec![Ok("CONTINUATION".into())]);
    let editor = editor_with(backend.clone(), |c| {
        // Debounce fires squarely inside the reveal window.
        c.suggest.debounce_ms = 10;
        c.stream.chunk_chars = 1;
    });

    editor.insert_text_at_cursor("Hello world").await.unwrap();
    let mut rx = editor.subscribe();
    assert!(editor.continue_writing().await);
    wait_for(&mut rx, |e| matches!(e, EditorEvent::StreamFinished)).await;

    assert_eq!(editor.get_text().await, "Hello worldCONTINUATION");
    assert!(editor.ghost().await.is_none());
    // Only the continuation call went out: the pending suggestion cycle
    // saw a busy engine and stood down.
    assert_eq!(backend.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn stream_insertion_discards_displayed_ghost() {
    let backend = ScriptedBackend::new(vec![Ok(" there".into()), Ok("MORE".into())]);
    let editor = editor_with(backend.clone(), |_| {});

    editor.insert_text_at_cursor("Hello world").await.unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(editor.ghost().await.is_some());

    let mut rx = editor.subscribe();
    assert!(editor.continue_writing().await);
    wait_for(&mut rx, |e| matches!(e, EditorEvent::StreamFinished)).await;

    // The first revealed chunk is a document change like any other: the
    // overlay went away, and only its text made it into the buffer.
    assert!(editor.ghost().await.is_none());
    assert_eq!(editor.get_text().await, "Hello worldMORE");
}
