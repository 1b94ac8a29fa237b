// SPDX-License-Identifier: MIT
//! Editor event broadcasting.
//!
//! The engine never calls into the UI directly. Everything a front end
//! needs to react to (ghost overlay updates, stream lifecycle, the review
//! affordance) is published as an [`EditorEvent`] on a broadcast channel.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::document::Revision;

/// Signals published by the engine for the surrounding UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum EditorEvent {
    /// A ghost suggestion is now displayed at `anchor`.
    #[serde(rename_all = "camelCase")]
    GhostShown { text: String, anchor: usize },
    /// The ghost overlay was removed (accepted, invalidated, or replaced).
    GhostCleared,
    /// A continue-writing session started; the gateway call is in flight.
    StreamStarted,
    /// The reveal finished; the inserted text is up for review.
    StreamFinished,
    /// The session aborted before any document mutation.
    StreamFailed,
    /// Show or hide the reject affordance.
    ReviewButtons { show: bool },
    /// The document changed (any source). Carries the new revision.
    #[serde(rename_all = "camelCase")]
    DocumentChanged { revision: Revision },
}

/// Fans [`EditorEvent`]s out to all subscribed UI listeners.
#[derive(Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<EditorEvent>,
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBroadcaster {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1024);
        Self { tx }
    }

    /// Publish an event. No subscribers is fine: the engine never depends
    /// on anyone listening.
    pub fn publish(&self, event: EditorEvent) {
        let _ = self.tx.send(event);
    }

    /// Subscribe to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<EditorEvent> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_subscriber() {
        let events = EventBroadcaster::new();
        let mut rx = events.subscribe();
        events.publish(EditorEvent::ReviewButtons { show: true });
        assert_eq!(
            rx.recv().await.unwrap(),
            EditorEvent::ReviewButtons { show: true }
        );
    }

    #[test]
    fn publish_without_subscribers_is_ok() {
        let events = EventBroadcaster::new();
        events.publish(EditorEvent::GhostCleared);
    }
}
