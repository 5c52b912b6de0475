//! Transport controls
//!
//! While a track is loading, `toggle_play`, `next_track` and `prev_track`
//! (and `play_track` with a different track) are rejected as no-ops.

use super::core::PreloadState;
use super::{PlaybackEngine, PREV_RESTART_THRESHOLD};
use crate::media::{MediaCommand, DEFAULT_SEEK_OFFSET};
use crate::playback::output::MediaSource;
use kconnect_common::events::PlayerEvent;
use kconnect_common::{Category, Track};
use tracing::{debug, info, warn};

enum ToggleOutcome {
    Rejected,
    NothingLoaded,
    /// Rehydrated track with no source yet
    NeedsLoad(Track, Category),
    Paused(Track),
    Resumed(Track),
    Failed(Track, String),
}

impl PlaybackEngine {
    /// Play `track` from `category`
    ///
    /// The current track degrades to [`toggle_play`](Self::toggle_play).
    pub fn play_track(&self, track: Track, category: Category) {
        let same_track = {
            let st = self.lock();
            if st.session.is_track_loading {
                debug!(track_id = %track.id, "play_track rejected: track loading");
                return;
            }
            st.session
                .current_track
                .as_ref()
                .is_some_and(|current| current.id == track.id)
        };
        if same_track {
            self.toggle_play();
            return;
        }
        self.start_track(track, category);
    }

    /// Switch to `track` unconditionally
    ///
    /// Cancels any crossfade, silences both handles, persists the session,
    /// installs a fresh current handle and starts buffering. Playback begins
    /// on the handle's "can play through" event.
    pub(super) fn start_track(&self, track: Track, category: Category) {
        self.persist(&track, category);

        {
            let mut st = self.lock();
            self.cancel_crossfade_locked(&mut st);
            st.outputs.silence_all();
            st.preload = PreloadState::default();

            let output = self.create_output();
            st.outputs.replace_current(output.clone());
            st.session.begin_loading(track.clone(), category);

            output.set_volume(st.session.volume);
            output.set_muted(st.session.is_muted);
            output.load(&MediaSource::for_track(&track));
            debug!(output = %output.id(), track_id = %track.id, "Loading track");
        }

        info!(track_id = %track.id, title = %track.title, category = %category, "Starting track");
        self.emit_track_changed(track.id, category);
        self.emit(PlayerEvent::LoadingChanged { loading: true });
        self.emit_playing(false);
        self.inner.media.publish(Some(&track), false);
    }

    /// Pause if playing, resume if paused
    ///
    /// A restored track with no source yet starts loading instead.
    pub fn toggle_play(&self) {
        let outcome = {
            let mut st = self.lock();
            if st.session.is_track_loading {
                ToggleOutcome::Rejected
            } else if let Some(track) = st.session.current_track.clone() {
                match st.outputs.current().filter(|o| o.has_source()).cloned() {
                    None => ToggleOutcome::NeedsLoad(track, st.session.current_category),
                    Some(output) if st.session.is_playing => {
                        self.cancel_crossfade_locked(&mut st);
                        output.pause();
                        st.session.set_playing(false);
                        ToggleOutcome::Paused(track)
                    }
                    Some(output) => {
                        output.set_volume(st.session.volume);
                        output.set_muted(st.session.is_muted);
                        match output.play() {
                            Ok(()) => {
                                st.session.set_playing(true);
                                ToggleOutcome::Resumed(track)
                            }
                            Err(e) => {
                                st.session.set_playing(false);
                                ToggleOutcome::Failed(track, e.to_string())
                            }
                        }
                    }
                }
            } else {
                ToggleOutcome::NothingLoaded
            }
        };

        match outcome {
            ToggleOutcome::Rejected => debug!("toggle_play rejected: track loading"),
            ToggleOutcome::NothingLoaded => debug!("toggle_play with no track"),
            ToggleOutcome::NeedsLoad(track, category) => self.start_track(track, category),
            ToggleOutcome::Paused(track) => {
                self.emit_playing(false);
                self.inner.presence.playback_paused();
                self.inner.media.publish(Some(&track), false);
            }
            ToggleOutcome::Resumed(track) => {
                self.emit_playing(true);
                self.inner.presence.playback_started(&track);
                self.inner.media.publish(Some(&track), true);
            }
            ToggleOutcome::Failed(track, message) => {
                warn!(track_id = %track.id, "Resume failed: {}", message);
                self.emit(PlayerEvent::PlaybackError {
                    track_id: track.id,
                    message,
                });
                self.emit_playing(false);
                self.inner.media.publish(Some(&track), false);
            }
        }
    }

    /// Play the next track in the current category
    pub async fn next_track(&self) {
        let (current, category) = {
            let st = self.lock();
            if st.session.is_track_loading {
                debug!("next_track rejected: track loading");
                return;
            }
            (st.session.current_track.clone(), st.session.current_category)
        };

        let Some(next) = self
            .inner
            .navigator
            .resolve_next(current.as_ref(), category)
            .await
        else {
            debug!(category = %category, "No next track");
            return;
        };

        if self.is_track_loading() {
            debug!("next_track superseded while resolving");
            return;
        }
        self.start_track(next, category);
    }

    /// Previous track, or rewind if at least
    /// [`PREV_RESTART_THRESHOLD`] seconds have played
    pub fn prev_track(&self) {
        let (current, category) = {
            let mut st = self.lock();
            if st.session.is_track_loading {
                debug!("prev_track rejected: track loading");
                return;
            }
            let rewind = st.session.current_track.is_some()
                && st.session.current_time >= PREV_RESTART_THRESHOLD;
            if !rewind {
                (st.session.current_track.clone(), st.session.current_category)
            } else {
                self.cancel_crossfade_locked(&mut st);
                if let Some(output) = st.outputs.current() {
                    output.seek(0.0);
                }
                st.session.current_time = 0.0;
                st.preload.requested_for = None;
                drop(st);
                debug!("Rewound current track");
                self.emit_progress();
                return;
            }
        };

        match self
            .inner
            .navigator
            .resolve_previous(current.as_ref(), category)
        {
            Some(previous) => self.start_track(previous, category),
            None => debug!(category = %category, "No previous track"),
        }
    }

    /// Jump to `seconds` within the current track
    pub fn seek_to(&self, seconds: f64) {
        if !seconds.is_finite() {
            return;
        }
        {
            let mut st = self.lock();
            let Some(output) = st.outputs.current().filter(|o| o.has_source()).cloned() else {
                return;
            };
            self.cancel_crossfade_locked(&mut st);
            let duration = st.session.duration;
            let target = if duration > 0.0 {
                seconds.clamp(0.0, duration)
            } else {
                seconds.max(0.0)
            };
            output.seek(target);
            st.session.current_time = target;
        }
        self.emit_progress();
    }

    /// Set the configured volume (clamped to 0.0-1.0)
    pub fn set_volume(&self, volume: f32) {
        if volume.is_nan() {
            return;
        }
        let volume = volume.clamp(0.0, 1.0);
        let muted = {
            let mut st = self.lock();
            st.session.volume = volume;
            match st.crossfade.ramp.as_mut() {
                Some(ramp) => ramp.retarget(volume),
                None => {
                    if let Some(output) = st.outputs.current() {
                        output.set_volume(volume);
                    }
                }
            }
            st.session.is_muted
        };
        self.emit(PlayerEvent::VolumeChanged { volume, muted });
    }

    /// Flip mute; unmuting restores the configured volume
    pub fn toggle_mute(&self) {
        let (volume, muted) = {
            let mut st = self.lock();
            st.session.is_muted = !st.session.is_muted;
            let muted = st.session.is_muted;
            let ramping = st.crossfade.ramp.is_some();
            for output in [st.outputs.current(), st.outputs.next()].into_iter().flatten() {
                output.set_muted(muted);
            }
            if !muted && !ramping {
                if let Some(output) = st.outputs.current() {
                    output.set_volume(st.session.volume);
                }
            }
            (st.session.volume, muted)
        };
        self.emit(PlayerEvent::VolumeChanged { volume, muted });
    }

    /// Dispatch a system transport control
    pub async fn handle_media_command(&self, command: MediaCommand) {
        debug!(?command, "Media command");
        let (is_playing, position) = {
            let st = self.lock();
            (st.session.is_playing, st.session.current_time)
        };
        match command {
            MediaCommand::Play if !is_playing => self.toggle_play(),
            MediaCommand::Pause if is_playing => self.toggle_play(),
            MediaCommand::Play | MediaCommand::Pause => {}
            MediaCommand::PlayPause => self.toggle_play(),
            MediaCommand::Stop => {
                if is_playing {
                    self.toggle_play();
                }
                self.seek_to(0.0);
            }
            MediaCommand::Next => self.next_track().await,
            MediaCommand::Previous => self.prev_track(),
            MediaCommand::SeekTo(seconds) => self.seek_to(seconds),
            MediaCommand::SeekForward(offset) => {
                self.seek_to(position + offset.unwrap_or(DEFAULT_SEEK_OFFSET))
            }
            MediaCommand::SeekBackward(offset) => {
                self.seek_to(position - offset.unwrap_or(DEFAULT_SEEK_OFFSET))
            }
        }
    }

    fn emit_progress(&self) {
        let progress = {
            let st = self.lock();
            st.session
                .current_track
                .as_ref()
                .map(|t| (t.id, st.session.current_time, st.session.duration))
        };
        if let Some((track_id, position, duration)) = progress {
            self.emit(PlayerEvent::PlaybackProgress {
                track_id,
                position,
                duration,
            });
            self.inner.media.publish_position(position, duration);
        }
    }
}
