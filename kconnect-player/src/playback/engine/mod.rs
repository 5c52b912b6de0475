//! Playback engine
//!
//! **Module Structure:**
//! - `core.rs`: engine struct, construction, snapshot, shutdown, event pumps
//! - `transport.rs`: transport controls (play, toggle, next, previous, seek,
//!   volume, mute) and media-command dispatch
//! - `events.rs`: output handle events (buffered, error, progress, ended,
//!   native play/pause)
//! - `transition.rs`: crossfade start, ramp ticks, swap and cancellation;
//!   next-track preloading

mod core;
mod events;
mod transition;
mod transport;

pub use self::core::PlaybackEngine;

use crate::catalog::TrackCatalog;
use crate::config::PlaybackConfig;
use crate::media::MediaSessionBridge;
use crate::playback::output::OutputFactory;
use crate::playback::persistence::SessionStore;
use crate::presence::PresenceReporter;
use crate::state::SharedState;
use std::sync::Arc;

/// `prev_track` below this many elapsed seconds changes track; at or above
/// it rewinds the current one
pub const PREV_RESTART_THRESHOLD: f64 = 3.0;

/// Engine behavior switches
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub enable_crossfade: bool,
    pub initial_volume: f32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            enable_crossfade: true,
            initial_volume: 0.8,
        }
    }
}

impl From<&PlaybackConfig> for EngineOptions {
    fn from(config: &PlaybackConfig) -> Self {
        Self {
            enable_crossfade: config.enable_crossfade,
            initial_volume: config.initial_volume,
        }
    }
}

/// Collaborators the engine is built from
pub struct EngineParts {
    pub catalog: TrackCatalog,
    pub outputs: Arc<dyn OutputFactory>,
    pub presence: PresenceReporter,
    pub media: MediaSessionBridge,
    pub store: Arc<dyn SessionStore>,
    pub state: Arc<SharedState>,
    pub options: EngineOptions,
}
