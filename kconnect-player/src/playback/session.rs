//! Playback session state
//!
//! One [`PlaybackSession`] exists per engine. Only the engine mutates it;
//! everything else reads a [`PlayerSnapshot`].

use kconnect_common::{Category, Track};
use serde::Serialize;

/// Per-track lifecycle
///
/// `Idle → Loading → Ready → Playing ⇄ Paused → Ended`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackState {
    #[default]
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Ended,
}

/// Mutable playback state owned by the engine
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    pub current_track: Option<Track>,
    pub current_category: Category,
    pub is_playing: bool,
    /// Elapsed seconds of the current track
    pub current_time: f64,
    /// Total seconds of the current track
    pub duration: f64,
    /// Configured volume (0.0-1.0); kept while muted
    pub volume: f32,
    pub is_muted: bool,
    /// Guards every transport operation while a track buffers
    pub is_track_loading: bool,
    pub track_state: TrackState,
}

impl PlaybackSession {
    pub fn new(volume: f32) -> Self {
        Self {
            current_track: None,
            current_category: Category::All,
            is_playing: false,
            current_time: 0.0,
            duration: 0.0,
            volume: volume.clamp(0.0, 1.0),
            is_muted: false,
            is_track_loading: false,
            track_state: TrackState::Idle,
        }
    }

    /// Restore a persisted track without starting it
    pub fn rehydrate(&mut self, track: Track, category: Category) {
        self.duration = track.duration;
        self.current_time = 0.0;
        self.current_track = Some(track);
        self.current_category = category;
        self.is_playing = false;
        self.track_state = TrackState::Idle;
    }

    /// Enter `Loading` for `track`
    pub fn begin_loading(&mut self, track: Track, category: Category) {
        self.duration = track.duration;
        self.current_time = 0.0;
        self.current_track = Some(track);
        self.current_category = category;
        self.is_playing = false;
        self.is_track_loading = true;
        self.track_state = TrackState::Loading;
    }

    /// Loading aborted (media error or rejected play)
    pub fn fail_loading(&mut self) {
        self.is_track_loading = false;
        self.is_playing = false;
        self.track_state = TrackState::Paused;
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.is_playing = playing;
        self.track_state = if playing {
            TrackState::Playing
        } else {
            TrackState::Paused
        };
    }

    /// Promote the crossfade target to current
    pub fn promote(&mut self, track: Track) {
        self.duration = track.duration;
        self.current_time = 0.0;
        self.current_track = Some(track);
        self.is_playing = true;
        self.track_state = TrackState::Playing;
    }

    pub fn snapshot(&self, has_more_tracks: bool) -> PlayerSnapshot {
        PlayerSnapshot {
            current_track: self.current_track.clone(),
            current_category: self.current_category,
            is_playing: self.is_playing,
            current_time: self.current_time,
            duration: self.duration,
            volume: self.volume,
            is_muted: self.is_muted,
            has_more_tracks,
            is_track_loading: self.is_track_loading,
            track_state: self.track_state,
        }
    }
}

/// Read-only view of the engine handed to UI consumers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSnapshot {
    pub current_track: Option<Track>,
    pub current_category: Category,
    pub is_playing: bool,
    pub current_time: f64,
    pub duration: f64,
    pub volume: f32,
    pub is_muted: bool,
    /// More pages exist for the current category
    pub has_more_tracks: bool,
    pub is_track_loading: bool,
    pub track_state: TrackState,
}
