//! Test helpers for kconnect-player integration tests
//!
//! - FakeApi: scripted backend with call recording
//! - FakeOutputFactory / FakeOutput: output handles driven by the test
//! - RecordingMediaSession: captures media surface updates
//! - TestPlayer: engine wired to all of the above

#![allow(dead_code)]

pub mod fake_api;
pub mod fake_output;

pub use fake_api::{ids, track, tracks, FakeApi};
pub use fake_output::{FakeOutput, FakeOutputFactory, RecordingMediaSession};

use kconnect_common::events::{EventBus, PlayerEvent};
use kconnect_common::{Category, Track};
use kconnect_player::api::MusicApi;
use kconnect_player::catalog::{CatalogOptions, TrackCatalog};
use kconnect_player::media::MediaSessionBridge;
use kconnect_player::playback::output::OutputEventReceiver;
use kconnect_player::playback::persistence::{MemorySessionStore, PersistedSession};
use kconnect_player::playback::{EngineOptions, EngineParts, OutputEvent, OutputEventKind, PlaybackEngine};
use kconnect_player::presence::PresenceReporter;
use kconnect_player::SharedState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Catalog over `api` without background prefetch
pub fn catalog(api: &Arc<FakeApi>) -> TrackCatalog {
    catalog_with(api, false)
}

pub fn catalog_with(api: &Arc<FakeApi>, background_prefetch: bool) -> TrackCatalog {
    let api: Arc<dyn MusicApi> = api.clone();
    TrackCatalog::new(
        api,
        EventBus::new(64),
        CatalogOptions {
            background_prefetch,
        },
    )
}

/// Let spawned tasks run to quiescence (paused clock)
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

pub struct PlayerBuilder {
    api: Arc<FakeApi>,
    options: EngineOptions,
    presence: bool,
    lockscreen_quirks: bool,
    persisted: Option<PersistedSession>,
}

impl PlayerBuilder {
    pub fn crossfade(mut self, enabled: bool) -> Self {
        self.options.enable_crossfade = enabled;
        self
    }

    pub fn volume(mut self, volume: f32) -> Self {
        self.options.initial_volume = volume;
        self
    }

    pub fn presence(mut self, enabled: bool) -> Self {
        self.presence = enabled;
        self
    }

    pub fn lockscreen_quirks(mut self) -> Self {
        self.lockscreen_quirks = true;
        self
    }

    pub fn persisted(mut self, track: Track, category: Category) -> Self {
        self.persisted = Some(PersistedSession {
            current_track: track,
            current_section: category,
        });
        self
    }

    pub fn build(self) -> TestPlayer {
        let bus = EventBus::new(1024);
        let events = bus.subscribe();
        let dyn_api: Arc<dyn MusicApi> = self.api.clone();
        let catalog = TrackCatalog::new(
            Arc::clone(&dyn_api),
            bus.clone(),
            CatalogOptions {
                background_prefetch: false,
            },
        );
        let outputs = Arc::new(FakeOutputFactory::default());
        let media = Arc::new(RecordingMediaSession::default());
        let store = Arc::new(match self.persisted {
            Some(session) => MemorySessionStore::with_session(session),
            None => MemorySessionStore::new(),
        });

        let (engine, output_events) = PlaybackEngine::new(EngineParts {
            catalog,
            outputs: outputs.clone(),
            presence: PresenceReporter::new(dyn_api, self.presence),
            media: MediaSessionBridge::new(media.clone(), self.lockscreen_quirks),
            store: store.clone(),
            state: Arc::new(SharedState::new(bus)),
            options: self.options,
        });

        TestPlayer {
            engine,
            api: self.api,
            outputs,
            media,
            store,
            events,
            _output_events: output_events,
        }
    }
}

pub struct TestPlayer {
    pub engine: PlaybackEngine,
    pub api: Arc<FakeApi>,
    pub outputs: Arc<FakeOutputFactory>,
    pub media: Arc<RecordingMediaSession>,
    pub store: Arc<MemorySessionStore>,
    pub events: broadcast::Receiver<PlayerEvent>,
    _output_events: OutputEventReceiver,
}

impl TestPlayer {
    pub fn builder(api: FakeApi) -> PlayerBuilder {
        PlayerBuilder {
            api: Arc::new(api),
            options: EngineOptions {
                enable_crossfade: true,
                initial_volume: 0.8,
            },
            presence: false,
            lockscreen_quirks: false,
            persisted: None,
        }
    }

    /// Player over a single `all` catalog
    pub fn with_tracks(all: Vec<Track>) -> TestPlayer {
        Self::builder(FakeApi::new().with_catalog(Category::All, all)).build()
    }

    pub fn current_output(&self) -> Arc<FakeOutput> {
        let id = self.engine.output_ids().0.expect("no current output");
        self.outputs.get(id)
    }

    pub fn next_output(&self) -> Option<Arc<FakeOutput>> {
        self.engine.output_ids().1.map(|id| self.outputs.get(id))
    }

    pub async fn send_current(&self, kind: OutputEventKind) {
        let output = self.engine.output_ids().0.expect("no current output");
        self.engine
            .handle_output_event(OutputEvent { output, kind })
            .await;
    }

    pub async fn send_next(&self, kind: OutputEventKind) {
        let output = self.engine.output_ids().1.expect("no next output");
        self.engine
            .handle_output_event(OutputEvent { output, kind })
            .await;
    }

    /// Current handle reports it can play through
    pub async fn buffered(&self) {
        self.send_current(OutputEventKind::CanPlayThrough).await;
    }

    pub async fn time_update(&self, position: f64, duration: f64) {
        self.send_current(OutputEventKind::TimeUpdate { position, duration })
            .await;
    }

    /// Load `category`, then play and buffer the track at `index`
    pub async fn start_at(&self, category: Category, index: usize) -> Track {
        let tracks = self.engine.catalog().load_category(category).await;
        let track = tracks[index].clone();
        self.engine.play_track(track.clone(), category);
        self.buffered().await;
        track
    }

    pub fn current_id(&self) -> Option<u64> {
        self.engine.current_track().map(|t| t.id.0)
    }

    pub fn drain_events(&mut self) -> Vec<PlayerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}
