//! Crossfade driver and next-track preloading
//!
//! A crossfade is `Starting` while the next track resolves, `Ramping` while
//! the ticker moves volumes, and `Swapping` for the final tick. A single
//! ticker task owns the timing; cancelling it is one `abort` plus an epoch
//! bump that invalidates any start still resolving.

use super::core::{CrossfadeState, EngineState};
use super::PlaybackEngine;
use crate::playback::crossfade::{CrossfadePhase, CrossfadeRamp, CROSSFADE_TICK};
use crate::playback::output::MediaSource;
use kconnect_common::events::PlayerEvent;
use kconnect_common::{Category, Track};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info, warn};

impl PlaybackEngine {
    /// Claim the crossfade slot; returns the epoch the start must match
    pub(super) fn mark_crossfade_starting(&self, st: &mut EngineState) -> u64 {
        st.crossfade.phase = CrossfadePhase::Starting;
        st.crossfade.epoch
    }

    /// Resolve the next track, put it on the next slot at volume 0 and start
    /// the ramp
    pub(super) async fn begin_crossfade(&self, epoch: u64, current: Track, category: Category) {
        let next = self
            .inner
            .navigator
            .resolve_next(Some(&current), category)
            .await;

        let started = {
            let mut st = self.lock();
            if st.crossfade.epoch != epoch || st.crossfade.phase != CrossfadePhase::Starting {
                debug!("Crossfade start superseded");
                return;
            }
            let still_current = st
                .session
                .current_track
                .as_ref()
                .is_some_and(|t| t.id == current.id);
            let Some(next) = next.filter(|_| still_current && st.session.is_playing) else {
                st.crossfade.phase = CrossfadePhase::Idle;
                debug!(track_id = %current.id, "No crossfade target");
                return;
            };

            let preloaded = st.preload.track == Some(next.id)
                && st.outputs.next().is_some_and(|o| o.has_source());
            let incoming = match st.outputs.next().filter(|_| preloaded).cloned() {
                Some(output) => output,
                None => {
                    let output = self.create_output();
                    output.load(&MediaSource::for_track(&next));
                    if let Some(old) = st.outputs.replace_next(output.clone()) {
                        old.pause();
                        old.clear_source();
                    }
                    output
                }
            };
            st.preload.track = None;

            incoming.set_volume(0.0);
            incoming.set_muted(st.session.is_muted);
            if let Err(e) = incoming.play() {
                warn!(track_id = %next.id, "Crossfade target refused to play: {}", e);
                incoming.pause();
                incoming.clear_source();
                st.crossfade.phase = CrossfadePhase::Idle;
                return;
            }

            let volume = st.session.volume;
            st.crossfade.ramp = Some(CrossfadeRamp::new(volume, volume));
            st.crossfade.incoming = Some(next.clone());
            st.crossfade.phase = CrossfadePhase::Ramping;
            st.crossfade.ticker = Some(self.spawn_crossfade_ticker());
            next
        };

        info!(from = %current.id, to = %started.id, "Crossfade started");
        self.emit(PlayerEvent::CrossfadeStarted {
            from_track_id: current.id,
            to_track_id: started.id,
        });
    }

    fn spawn_crossfade_ticker(&self) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + CROSSFADE_TICK, CROSSFADE_TICK);
            loop {
                ticks.tick().await;
                if !engine.crossfade_tick() {
                    break;
                }
            }
        })
    }

    /// Advance the ramp one step; returns false once the fade is over
    ///
    /// On the final step the outgoing handle is paused, the slots swap and
    /// the incoming track becomes current.
    pub fn crossfade_tick(&self) -> bool {
        let promoted = {
            let mut st = self.lock();
            if st.crossfade.phase != CrossfadePhase::Ramping {
                return false;
            }
            let Some(ramp) = st.crossfade.ramp.as_mut() else {
                return false;
            };
            let step = ramp.step();

            let (Some(outgoing), Some(incoming)) =
                (st.outputs.current().cloned(), st.outputs.next().cloned())
            else {
                self.cancel_crossfade_locked(&mut st);
                return false;
            };
            outgoing.set_volume(step.outgoing);
            incoming.set_volume(step.incoming);
            if !step.complete {
                return true;
            }

            st.crossfade.phase = CrossfadePhase::Swapping;
            outgoing.pause();
            st.outputs.swap();

            // The ticker is the caller; dropping its handle detaches it
            st.crossfade.ticker = None;
            st.crossfade.ramp = None;
            st.crossfade.phase = CrossfadePhase::Idle;
            let Some(track) = st.crossfade.incoming.take() else {
                return false;
            };
            st.session.promote(track.clone());
            st.session.current_time = incoming.position();
            st.preload.requested_for = None;
            (track, st.session.current_category)
        };

        let (track, category) = promoted;
        info!(track_id = %track.id, "Crossfade complete");
        self.persist(&track, category);
        self.emit_track_changed(track.id, category);
        self.emit(PlayerEvent::CrossfadeCompleted { track_id: track.id });
        self.emit_playing(true);
        self.inner.presence.playback_started(&track);
        self.inner.media.publish(Some(&track), true);
        self.inner.navigator.prefetch_around(&track, category);
        false
    }

    /// Abort any live crossfade and restore the current handle's volume
    pub(super) fn cancel_crossfade_locked(&self, st: &mut EngineState) {
        let CrossfadeState {
            phase,
            ticker,
            ramp,
            incoming,
            epoch,
        } = &mut st.crossfade;
        *epoch += 1;
        if !phase.in_flight() {
            return;
        }
        if let Some(ticker) = ticker.take() {
            ticker.abort();
        }
        let was_ramping = *phase == CrossfadePhase::Ramping;
        *phase = CrossfadePhase::Idle;
        *ramp = None;
        let abandoned = incoming.take();

        if was_ramping {
            if let Some(next) = st.outputs.next() {
                next.pause();
                next.clear_source();
            }
            if let Some(current) = st.outputs.current() {
                current.set_volume(st.session.volume);
            }
        }
        debug!(track_id = ?abandoned.map(|t| t.id), "Crossfade cancelled");
    }

    /// Buffer the resolved next track on the next slot without playing it
    pub(super) async fn preload_next(&self, current: Track, category: Category) {
        let Some(next) = self
            .inner
            .navigator
            .resolve_next(Some(&current), category)
            .await
        else {
            return;
        };

        let mut st = self.lock();
        let still_current = st
            .session
            .current_track
            .as_ref()
            .is_some_and(|t| t.id == current.id);
        if !still_current || st.crossfade.phase.in_flight() || st.preload.track == Some(next.id) {
            return;
        }

        let output = self.create_output();
        output.set_volume(0.0);
        output.load(&MediaSource::for_track(&next));
        if let Some(old) = st.outputs.replace_next(output) {
            old.pause();
            old.clear_source();
        }
        st.preload.track = Some(next.id);
        debug!(track_id = %next.id, "Preloaded next track");
    }
}
