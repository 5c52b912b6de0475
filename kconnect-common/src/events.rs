//! Event types for the K-Connect player event system
//!
//! Provides the shared event definitions and the EventBus used by the playback
//! core to push state changes to UI consumers.

use crate::models::{Category, TrackId};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Coarse playback state as seen by UI consumers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Playing,
    Paused,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
        }
    }
}

/// Player event types
///
/// Events are broadcast via EventBus and serialize with a `type` tag so they
/// can be forwarded as-is to any UI transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// Current track changed (new track requested, or crossfade swap completed)
    TrackChanged {
        /// Track now designated as current
        track_id: TrackId,
        /// Category the track was started from
        category: Category,
        /// When the change happened
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback state changed (Playing ↔ Paused)
    ///
    /// Triggers:
    /// - UI: Update transport controls
    /// - Platform Integration: Update media session
    PlaybackStateChanged {
        /// Playback state before change
        old_state: PlaybackState,
        /// Playback state after change
        new_state: PlaybackState,
        /// When state changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback progress update (emitted on media time updates)
    PlaybackProgress {
        /// Current track
        track_id: TrackId,
        /// Elapsed seconds
        position: f64,
        /// Total seconds
        duration: f64,
    },

    /// Volume or mute changed
    VolumeChanged {
        /// Configured volume (0.0-1.0)
        volume: f32,
        /// Mute flag
        muted: bool,
    },

    /// Track loading flag changed
    LoadingChanged {
        /// True while a track is buffering
        loading: bool,
    },

    /// A category list was replaced or extended
    CatalogUpdated {
        /// Affected category
        category: Category,
        /// Tracks now in the list
        track_count: usize,
        /// Whether further pages exist
        has_more: bool,
    },

    /// Crossfade transition started
    CrossfadeStarted {
        /// Outgoing track
        from_track_id: TrackId,
        /// Incoming track
        to_track_id: TrackId,
    },

    /// Crossfade transition finished and roles were swapped
    CrossfadeCompleted {
        /// Track now current
        track_id: TrackId,
    },

    /// Media playback failed for a track
    ///
    /// Playback stays paused; the UI decides whether to tell the user.
    PlaybackError {
        /// Track that failed to load or play
        track_id: TrackId,
        /// Diagnostic message
        message: String,
    },
}

/// Central event distribution bus for player events
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    pub fn emit(
        &self,
        event: PlayerEvent,
    ) -> Result<usize, broadcast::error::SendError<PlayerEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the no-subscriber case
    pub fn emit_lossy(&self, event: PlayerEvent) {
        let _ = self.tx.send(event);
    }

    /// Channel capacity this bus was created with
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_bus_delivers_to_subscribers() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(PlayerEvent::LoadingChanged { loading: true }).unwrap();

        match rx.recv().await.unwrap() {
            PlayerEvent::LoadingChanged { loading } => assert!(loading),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_emit_without_subscribers_is_error_but_lossy_is_not() {
        let bus = EventBus::new(4);
        assert!(bus.emit(PlayerEvent::LoadingChanged { loading: false }).is_err());
        bus.emit_lossy(PlayerEvent::LoadingChanged { loading: false });
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.capacity(), 4);
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = PlayerEvent::CatalogUpdated {
            category: Category::Random,
            track_count: 40,
            has_more: true,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "CatalogUpdated");
        assert_eq!(json["category"], "random");
        assert_eq!(json["track_count"], 40);
    }
}
