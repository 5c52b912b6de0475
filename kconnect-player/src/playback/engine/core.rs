//! Core playback engine - construction and lifecycle
//!
//! **Responsibilities:**
//! - PlaybackEngine struct and rehydration from the last session
//! - Output handle creation
//! - Snapshot (pull-side public surface)
//! - Event and media-command pumps
//! - Shutdown

use super::{EngineOptions, EngineParts};
use crate::catalog::TrackCatalog;
use crate::media::{MediaCommandReceiver, MediaSessionBridge};
use crate::playback::crossfade::{CrossfadePhase, CrossfadeRamp};
use crate::playback::navigation::Navigator;
use crate::playback::output::{
    AudioOutput, OutputEventReceiver, OutputEventSender, OutputFactory, OutputId, OutputSlots,
};
use crate::playback::persistence::{PersistedSession, SessionStore};
use crate::playback::session::{PlaybackSession, PlayerSnapshot};
use crate::presence::PresenceReporter;
use crate::state::{PlaybackState, SharedState};
use kconnect_common::events::PlayerEvent;
use kconnect_common::{Category, Track, TrackId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Live crossfade bookkeeping
#[derive(Default)]
pub(super) struct CrossfadeState {
    pub(super) phase: CrossfadePhase,
    pub(super) ramp: Option<CrossfadeRamp>,
    /// Track being faded in
    pub(super) incoming: Option<Track>,
    pub(super) ticker: Option<JoinHandle<()>>,
    /// Bumped on every cancellation; a start that resolves late checks it
    pub(super) epoch: u64,
}

/// Next-slot preload bookkeeping
#[derive(Debug, Default)]
pub(super) struct PreloadState {
    /// Track buffered in the next slot
    pub(super) track: Option<TrackId>,
    /// Current track a preload was already requested for
    pub(super) requested_for: Option<TrackId>,
}

pub(super) struct EngineState {
    pub(super) session: PlaybackSession,
    pub(super) outputs: OutputSlots,
    pub(super) crossfade: CrossfadeState,
    pub(super) preload: PreloadState,
}

pub(super) struct EngineInner {
    pub(super) catalog: TrackCatalog,
    pub(super) navigator: Navigator,
    pub(super) factory: Arc<dyn OutputFactory>,
    pub(super) presence: PresenceReporter,
    pub(super) media: MediaSessionBridge,
    pub(super) store: Arc<dyn SessionStore>,
    pub(super) shared: Arc<SharedState>,
    pub(super) options: EngineOptions,
    pub(super) output_events: OutputEventSender,
    next_output_id: AtomicU64,
    pub(super) state: Mutex<EngineState>,
}

/// Playback engine - owns the session and both output handles
///
/// Cheap to clone; clones drive the same engine.
#[derive(Clone)]
pub struct PlaybackEngine {
    pub(super) inner: Arc<EngineInner>,
}

impl PlaybackEngine {
    /// Build the engine and restore the last session (without playing it)
    ///
    /// Output handle events arrive on the returned receiver; feed them to
    /// [`handle_output_event`](Self::handle_output_event), or hand the
    /// receiver to [`spawn_event_pump`](Self::spawn_event_pump).
    pub fn new(parts: EngineParts) -> (Self, OutputEventReceiver) {
        let EngineParts {
            catalog,
            outputs,
            presence,
            media,
            store,
            state,
            options,
        } = parts;

        let mut session = PlaybackSession::new(options.initial_volume);
        match store.load() {
            Ok(Some(PersistedSession {
                current_track,
                current_section,
            })) => {
                info!(
                    track_id = %current_track.id,
                    category = %current_section,
                    "Restored last session"
                );
                session.rehydrate(current_track, current_section);
            }
            Ok(None) => {}
            Err(e) => warn!("Ignoring unreadable last session: {}", e),
        }
        media.publish(session.current_track.as_ref(), false);

        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Self {
            inner: Arc::new(EngineInner {
                navigator: Navigator::new(catalog.clone()),
                catalog,
                factory: outputs,
                presence,
                media,
                store,
                shared: state,
                options,
                output_events: tx,
                next_output_id: AtomicU64::new(1),
                state: Mutex::new(EngineState {
                    session,
                    outputs: OutputSlots::new(),
                    crossfade: CrossfadeState::default(),
                    preload: PreloadState::default(),
                }),
            }),
        };
        (engine, rx)
    }

    pub(super) fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fresh output handle wired to the engine's event channel
    pub(super) fn create_output(&self) -> Arc<dyn AudioOutput> {
        let id = OutputId(self.inner.next_output_id.fetch_add(1, Ordering::Relaxed));
        self.inner
            .factory
            .create(id, self.inner.output_events.clone())
    }

    pub(super) fn emit(&self, event: PlayerEvent) {
        self.inner.shared.broadcast_event(event);
    }

    pub(super) fn emit_track_changed(&self, track_id: TrackId, category: Category) {
        self.emit(PlayerEvent::TrackChanged {
            track_id,
            category,
            timestamp: chrono::Utc::now(),
        });
    }

    pub(super) fn emit_playing(&self, playing: bool) {
        self.inner.shared.set_playback_state(if playing {
            PlaybackState::Playing
        } else {
            PlaybackState::Paused
        });
    }

    pub(super) fn persist(&self, track: &Track, category: Category) {
        let persisted = PersistedSession {
            current_track: track.clone(),
            current_section: category,
        };
        if let Err(e) = self.inner.store.save(&persisted) {
            warn!(track_id = %track.id, "Failed to persist session: {}", e);
        }
    }

    pub fn catalog(&self) -> &TrackCatalog {
        &self.inner.catalog
    }

    pub fn navigator(&self) -> &Navigator {
        &self.inner.navigator
    }

    pub fn shared_state(&self) -> &Arc<SharedState> {
        &self.inner.shared
    }

    /// Current public state
    pub fn snapshot(&self) -> PlayerSnapshot {
        let (session, category) = {
            let st = self.lock();
            (st.session.clone(), st.session.current_category)
        };
        session.snapshot(self.inner.catalog.has_more(category))
    }

    pub fn current_track(&self) -> Option<Track> {
        self.lock().session.current_track.clone()
    }

    pub fn is_track_loading(&self) -> bool {
        self.lock().session.is_track_loading
    }

    pub fn crossfade_phase(&self) -> CrossfadePhase {
        self.lock().crossfade.phase
    }

    /// Ids of the (current, next) output handles
    pub fn output_ids(&self) -> (Option<OutputId>, Option<OutputId>) {
        let st = self.lock();
        (
            st.outputs.current().map(|o| o.id()),
            st.outputs.next().map(|o| o.id()),
        )
    }

    /// Toggle the like state of `track_id` (default: the current track)
    ///
    /// Keeps the session's copy of the current track in step with the
    /// catalog.
    pub async fn toggle_like(&self, track_id: Option<TrackId>) -> Option<bool> {
        let id = match track_id {
            Some(id) => id,
            None => self.lock().session.current_track.as_ref()?.id,
        };
        let liked = self.inner.catalog.toggle_like(id).await?;
        let updated = self.inner.catalog.find_track(id);

        let mut st = self.lock();
        if let Some(current) = st.session.current_track.as_mut().filter(|t| t.id == id) {
            current.is_liked = liked;
            if let Some(updated) = updated {
                current.likes_count = updated.likes_count;
            }
        }
        Some(liked)
    }

    /// Feed output events to the engine until the channel closes
    pub fn spawn_event_pump(&self, mut events: OutputEventReceiver) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                engine.handle_output_event(event).await;
            }
            debug!("Output event pump stopped");
        })
    }

    /// Dispatch system transport controls until the channel closes
    pub fn spawn_media_command_pump(&self, mut commands: MediaCommandReceiver) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move {
            while let Some(command) = commands.recv().await {
                engine.handle_media_command(command).await;
            }
            debug!("Media command pump stopped");
        })
    }

    /// Tear down: cancel any crossfade, silence both handles, clear
    /// now-playing
    pub async fn shutdown(&self) {
        {
            let mut st = self.lock();
            self.cancel_crossfade_locked(&mut st);
            st.outputs.silence_all();
            st.preload = PreloadState::default();
            if st.session.is_playing {
                st.session.set_playing(false);
            }
            st.session.is_track_loading = false;
        }
        self.emit_playing(false);
        self.inner.presence.shutdown().await;
        info!("Playback engine shut down");
    }
}
