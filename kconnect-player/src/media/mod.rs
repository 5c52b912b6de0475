//! OS media integration
//!
//! Publishes the current track and playback state to the platform media
//! surface (lock screen, desktop media keys) and carries system transport
//! controls back as [`MediaCommand`]s.
//!
//! **Backends:**
//! - [`LoggingMediaSession`]: publishes through `tracing` (headless default)
//! - [`NullMediaSession`]: discards everything
//! - `mpris::MprisMediaSession`: Linux D-Bus (feature `mpris`)

#[cfg(feature = "mpris")]
pub mod mpris;

use kconnect_common::Track;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Seconds moved by a seek-forward/backward without an explicit offset
pub const DEFAULT_SEEK_OFFSET: f64 = 10.0;

/// Track description shown by the platform
#[derive(Debug, Clone, PartialEq)]
pub struct MediaMetadata {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub artwork_url: Option<String>,
    pub duration: f64,
}

impl From<&Track> for MediaMetadata {
    fn from(track: &Track) -> Self {
        Self {
            title: track.title.clone(),
            artist: track.artist.clone(),
            album: track.album.clone(),
            artwork_url: (!track.cover_path.is_empty()).then(|| track.cover_path.clone()),
            duration: track.duration,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaPlaybackState {
    /// Nothing loaded
    None,
    Playing,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionState {
    pub position: f64,
    pub duration: f64,
    pub playback_rate: f64,
}

/// A platform media surface
pub trait MediaSession: Send + Sync {
    fn set_metadata(&self, metadata: Option<&MediaMetadata>);
    fn set_playback_state(&self, state: MediaPlaybackState);
    fn set_position(&self, position: PositionState);
}

/// System transport control
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaCommand {
    Play,
    Pause,
    PlayPause,
    Stop,
    Next,
    Previous,
    /// Absolute position in seconds
    SeekTo(f64),
    /// Relative seek; `None` uses [`DEFAULT_SEEK_OFFSET`]
    SeekForward(Option<f64>),
    SeekBackward(Option<f64>),
}

pub type MediaCommandSender = mpsc::UnboundedSender<MediaCommand>;
pub type MediaCommandReceiver = mpsc::UnboundedReceiver<MediaCommand>;

/// True on mobile platforms whose lock screens drift out of sync with
/// in-app state
pub fn platform_has_lockscreen_quirks() -> bool {
    cfg!(any(target_os = "ios", target_os = "android"))
}

/// Engine-facing publisher over a [`MediaSession`]
pub struct MediaSessionBridge {
    session: Arc<dyn MediaSession>,
    lockscreen_quirks: bool,
}

impl MediaSessionBridge {
    /// `lockscreen_quirks` is OR-ed with platform detection
    pub fn new(session: Arc<dyn MediaSession>, lockscreen_quirks: bool) -> Self {
        Self {
            session,
            lockscreen_quirks: lockscreen_quirks || platform_has_lockscreen_quirks(),
        }
    }

    pub fn lockscreen_quirks(&self) -> bool {
        self.lockscreen_quirks
    }

    /// Publish metadata and state for the current track
    pub fn publish(&self, track: Option<&Track>, is_playing: bool) {
        match track {
            Some(track) => {
                self.session.set_metadata(Some(&MediaMetadata::from(track)));
                self.session.set_playback_state(if is_playing {
                    MediaPlaybackState::Playing
                } else {
                    MediaPlaybackState::Paused
                });
            }
            None => {
                self.session.set_metadata(None);
                self.session.set_playback_state(MediaPlaybackState::None);
            }
        }
    }

    pub fn publish_position(&self, position: f64, duration: f64) {
        if duration.is_nan() || duration <= 0.0 {
            return;
        }
        self.session.set_position(PositionState {
            position: position.clamp(0.0, duration),
            duration,
            playback_rate: 1.0,
        });
    }

    /// A native play/pause event fired on the output; re-publish only where
    /// the platform needs it
    pub fn on_native_state(&self, track: Option<&Track>, is_playing: bool) {
        if self.lockscreen_quirks {
            debug!(is_playing, "Re-publishing media state after native event");
            self.publish(track, is_playing);
        }
    }
}

/// Media surface that writes to the log
#[derive(Debug, Default)]
pub struct LoggingMediaSession;

impl MediaSession for LoggingMediaSession {
    fn set_metadata(&self, metadata: Option<&MediaMetadata>) {
        match metadata {
            Some(m) => info!(title = %m.title, artist = %m.artist, "Media metadata"),
            None => info!("Media metadata cleared"),
        }
    }

    fn set_playback_state(&self, state: MediaPlaybackState) {
        debug!(?state, "Media playback state");
    }

    fn set_position(&self, _position: PositionState) {}
}

/// Media surface that does nothing
#[derive(Debug, Default)]
pub struct NullMediaSession;

impl MediaSession for NullMediaSession {
    fn set_metadata(&self, _metadata: Option<&MediaMetadata>) {}
    fn set_playback_state(&self, _state: MediaPlaybackState) {}
    fn set_position(&self, _position: PositionState) {}
}
