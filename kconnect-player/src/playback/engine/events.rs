//! Output handle event handling
//!
//! Events are routed by handle id: anything from a handle the engine no
//! longer holds is dropped, and the next slot only reports failures.

use super::PlaybackEngine;
use crate::playback::crossfade::{classify, FadeWindow};
use crate::playback::output::{OutputEvent, OutputEventKind, SlotRole};
use crate::playback::session::TrackState;
use kconnect_common::events::PlayerEvent;
use kconnect_common::{Category, Track};
use tracing::{debug, info, warn};

enum TimeAction {
    StartCrossfade { epoch: u64, current: Track, category: Category },
    Preload { current: Track, category: Category },
}

impl PlaybackEngine {
    /// Apply one output event
    pub async fn handle_output_event(&self, event: OutputEvent) {
        let role = self.lock().outputs.role_of(event.output);
        let Some(role) = role else {
            debug!(output = %event.output, kind = ?event.kind, "Dropping event from detached output");
            return;
        };

        match (role, event.kind) {
            (SlotRole::Current, OutputEventKind::LoadStart) => {
                debug!(output = %event.output, "Load started");
            }
            (SlotRole::Current, OutputEventKind::CanPlayThrough) => self.on_can_play_through(),
            (SlotRole::Current, OutputEventKind::Error(message)) => self.on_media_error(message),
            (SlotRole::Current, OutputEventKind::TimeUpdate { position, duration }) => {
                self.on_time_update(position, duration).await
            }
            (SlotRole::Current, OutputEventKind::Ended) => self.on_ended().await,
            (SlotRole::Current, OutputEventKind::Played) => self.on_native_state(true),
            (SlotRole::Current, OutputEventKind::Paused) => self.on_native_state(false),
            (SlotRole::Next, OutputEventKind::Error(message)) => self.on_next_error(message),
            (SlotRole::Next, _) => {}
        }
    }

    /// Buffered enough: apply volume/mute and start playing
    fn on_can_play_through(&self) {
        let started = {
            let mut st = self.lock();
            if !st.session.is_track_loading {
                return;
            }
            let (Some(output), Some(track)) =
                (st.outputs.current().cloned(), st.session.current_track.clone())
            else {
                return;
            };
            st.session.track_state = TrackState::Ready;
            output.set_volume(st.session.volume);
            output.set_muted(st.session.is_muted);
            match output.play() {
                Ok(()) => {
                    st.session.is_track_loading = false;
                    st.session.set_playing(true);
                    Ok((track, st.session.current_category))
                }
                Err(e) => {
                    st.session.fail_loading();
                    Err((track, e.to_string()))
                }
            }
        };

        self.emit(PlayerEvent::LoadingChanged { loading: false });
        match started {
            Ok((track, category)) => {
                info!(track_id = %track.id, "Playback started");
                self.emit_playing(true);
                self.inner.presence.playback_started(&track);
                self.inner.media.publish(Some(&track), true);
                self.inner.navigator.prefetch_around(&track, category);
            }
            Err((track, message)) => {
                warn!(track_id = %track.id, "Play rejected: {}", message);
                self.emit(PlayerEvent::PlaybackError {
                    track_id: track.id,
                    message,
                });
                self.emit_playing(false);
                self.inner.media.publish(Some(&track), false);
            }
        }
    }

    /// Current source failed: stay paused, no retry
    fn on_media_error(&self, message: String) {
        let (track, was_loading) = {
            let mut st = self.lock();
            self.cancel_crossfade_locked(&mut st);
            let was_loading = st.session.is_track_loading;
            st.session.fail_loading();
            if let Some(output) = st.outputs.current() {
                output.pause();
            }
            (st.session.current_track.clone(), was_loading)
        };

        if let Some(track) = &track {
            warn!(track_id = %track.id, "Media error: {}", message);
            self.emit(PlayerEvent::PlaybackError {
                track_id: track.id,
                message,
            });
        }
        if was_loading {
            self.emit(PlayerEvent::LoadingChanged { loading: false });
        }
        self.emit_playing(false);
        self.inner.media.publish(track.as_ref(), false);
    }

    /// Next-slot source failed: abandon the preload or the fade
    fn on_next_error(&self, message: String) {
        let mut st = self.lock();
        warn!(track_id = ?st.preload.track, "Next track failed to load: {}", message);
        self.cancel_crossfade_locked(&mut st);
        if let Some(output) = st.outputs.next() {
            output.clear_source();
        }
        st.preload.track = None;
    }

    async fn on_time_update(&self, position: f64, duration: f64) {
        let (progress, action) = {
            let mut st = self.lock();
            st.session.current_time = position;
            if duration > 0.0 {
                st.session.duration = duration;
            }
            let Some(current) = st.session.current_track.clone() else {
                return;
            };
            let progress = (current.id, position, st.session.duration);

            let eligible = self.inner.options.enable_crossfade
                && st.session.is_playing
                && !st.session.is_track_loading
                && !st.crossfade.phase.in_flight();
            let category = st.session.current_category;
            let action = match classify(position, st.session.duration) {
                FadeWindow::Crossfade if eligible => {
                    Some(TimeAction::StartCrossfade {
                        epoch: self.mark_crossfade_starting(&mut st),
                        current,
                        category,
                    })
                }
                FadeWindow::Preload
                    if eligible && st.preload.requested_for != Some(current.id) =>
                {
                    st.preload.requested_for = Some(current.id);
                    Some(TimeAction::Preload { current, category })
                }
                _ => None,
            };
            (progress, action)
        };

        let (track_id, position, duration) = progress;
        self.emit(PlayerEvent::PlaybackProgress {
            track_id,
            position,
            duration,
        });
        self.inner.media.publish_position(position, duration);

        match action {
            Some(TimeAction::StartCrossfade {
                epoch,
                current,
                category,
            }) => self.begin_crossfade(epoch, current, category).await,
            Some(TimeAction::Preload { current, category }) => {
                self.preload_next(current, category).await
            }
            None => {}
        }
    }

    /// Natural end: a live crossfade owns the transition, otherwise advance
    async fn on_ended(&self) {
        {
            let mut st = self.lock();
            if st.crossfade.phase.in_flight() {
                debug!("Ended during crossfade, swap pending");
                return;
            }
            st.session.is_playing = false;
            st.session.track_state = TrackState::Ended;
        }
        debug!("Track ended, advancing");
        self.emit_playing(false);
        self.next_track().await;
    }

    /// Native play/pause fired (possibly OS-initiated)
    fn on_native_state(&self, playing: bool) {
        let (track, changed) = {
            let mut st = self.lock();
            if st.session.is_track_loading {
                return;
            }
            let changed = st.session.current_track.is_some() && st.session.is_playing != playing;
            if changed {
                st.session.set_playing(playing);
            }
            (st.session.current_track.clone(), changed)
        };

        if changed {
            debug!(playing, "Playback state changed outside the engine");
            self.emit_playing(playing);
            match (&track, playing) {
                (Some(track), true) => self.inner.presence.playback_started(track),
                (Some(_), false) => self.inner.presence.playback_paused(),
                (None, _) => {}
            }
            self.inner.media.publish(track.as_ref(), playing);
        }
        self.inner.media.on_native_state(track.as_ref(), playing);
    }
}
