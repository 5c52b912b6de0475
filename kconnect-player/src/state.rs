//! Shared player state
//!
//! Event broadcasting plus the coarse playing/paused flag, so that
//! `PlaybackStateChanged` is only emitted on real transitions.

use kconnect_common::events::{EventBus, PlayerEvent};
use std::sync::{PoisonError, RwLock};
use tokio::sync::broadcast;

pub use kconnect_common::events::PlaybackState;

/// Default event channel capacity
pub const EVENT_CAPACITY: usize = 256;

/// State shared between the engine and its consumers
pub struct SharedState {
    playback_state: RwLock<PlaybackState>,
    events: EventBus,
}

impl SharedState {
    pub fn new(events: EventBus) -> Self {
        Self {
            playback_state: RwLock::new(PlaybackState::Paused),
            events,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Broadcast to all subscribers (no subscribers is fine)
    pub fn broadcast_event(&self, event: PlayerEvent) {
        self.events.emit_lossy(event);
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    pub fn playback_state(&self) -> PlaybackState {
        *self
            .playback_state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Record `new_state`; emits `PlaybackStateChanged` only if it differs
    pub fn set_playback_state(&self, new_state: PlaybackState) -> bool {
        let old_state = {
            let mut state = self
                .playback_state
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *state, new_state)
        };
        if old_state == new_state {
            return false;
        }
        self.broadcast_event(PlayerEvent::PlaybackStateChanged {
            old_state,
            new_state,
            timestamp: chrono::Utc::now(),
        });
        true
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new(EventBus::new(EVENT_CAPACITY))
    }
}
