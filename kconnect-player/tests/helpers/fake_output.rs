//! Output handles that record what the engine asks of them
//!
//! Nothing is emitted on their own; tests inject events through
//! `PlaybackEngine::handle_output_event`.

use kconnect_player::error::{Error, Result};
use kconnect_player::media::{MediaMetadata, MediaPlaybackState, MediaSession, PositionState};
use kconnect_player::playback::output::OutputEventSender;
use kconnect_player::playback::{AudioOutput, MediaSource, OutputFactory, OutputId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct FakeOutputState {
    source: Option<MediaSource>,
    playing: bool,
    volume: f32,
    muted: bool,
    position: f64,
    volume_history: Vec<f32>,
    play_calls: usize,
    pause_calls: usize,
}

pub struct FakeOutput {
    id: OutputId,
    refuse_play: bool,
    state: Mutex<FakeOutputState>,
}

impl FakeOutput {
    pub fn source_url(&self) -> Option<String> {
        self.state.lock().unwrap().source.as_ref().map(|s| s.url.clone())
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().unwrap().playing
    }

    pub fn is_muted(&self) -> bool {
        self.state.lock().unwrap().muted
    }

    pub fn volume_history(&self) -> Vec<f32> {
        self.state.lock().unwrap().volume_history.clone()
    }

    pub fn play_calls(&self) -> usize {
        self.state.lock().unwrap().play_calls
    }

    pub fn pause_calls(&self) -> usize {
        self.state.lock().unwrap().pause_calls
    }
}

impl AudioOutput for FakeOutput {
    fn id(&self) -> OutputId {
        self.id
    }

    fn load(&self, source: &MediaSource) {
        let mut st = self.state.lock().unwrap();
        st.source = Some(source.clone());
        st.playing = false;
        st.position = 0.0;
    }

    fn clear_source(&self) {
        let mut st = self.state.lock().unwrap();
        st.source = None;
        st.playing = false;
    }

    fn has_source(&self) -> bool {
        self.state.lock().unwrap().source.is_some()
    }

    fn play(&self) -> Result<()> {
        let mut st = self.state.lock().unwrap();
        st.play_calls += 1;
        if self.refuse_play {
            return Err(Error::AudioOutput("autoplay blocked".to_string()));
        }
        if st.source.is_none() {
            return Err(Error::AudioOutput("no source".to_string()));
        }
        st.playing = true;
        Ok(())
    }

    fn pause(&self) {
        let mut st = self.state.lock().unwrap();
        st.pause_calls += 1;
        st.playing = false;
    }

    fn is_paused(&self) -> bool {
        !self.state.lock().unwrap().playing
    }

    fn seek(&self, position: f64) {
        self.state.lock().unwrap().position = position;
    }

    fn set_volume(&self, volume: f32) {
        let mut st = self.state.lock().unwrap();
        st.volume = volume;
        st.volume_history.push(volume);
    }

    fn volume(&self) -> f32 {
        self.state.lock().unwrap().volume
    }

    fn set_muted(&self, muted: bool) {
        self.state.lock().unwrap().muted = muted;
    }

    fn position(&self) -> f64 {
        self.state.lock().unwrap().position
    }

    fn duration(&self) -> f64 {
        let st = self.state.lock().unwrap();
        st.source.as_ref().and_then(|s| s.duration_hint).unwrap_or(0.0)
    }
}

#[derive(Default)]
pub struct FakeOutputFactory {
    created: Mutex<Vec<Arc<FakeOutput>>>,
    refuse_play: AtomicBool,
}

impl FakeOutputFactory {
    /// Handles created from now on reject `play`
    pub fn refuse_play(&self) {
        self.refuse_play.store(true, Ordering::SeqCst);
    }

    pub fn created(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub fn get(&self, id: OutputId) -> Arc<FakeOutput> {
        self.created
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.id == id)
            .cloned()
            .unwrap_or_else(|| panic!("no output {}", id))
    }
}

impl OutputFactory for FakeOutputFactory {
    fn create(&self, id: OutputId, _events: OutputEventSender) -> Arc<dyn AudioOutput> {
        let output = Arc::new(FakeOutput {
            id,
            refuse_play: self.refuse_play.load(Ordering::SeqCst),
            state: Mutex::new(FakeOutputState::default()),
        });
        self.created.lock().unwrap().push(Arc::clone(&output));
        output
    }
}

/// Media surface that keeps everything published to it
#[derive(Default)]
pub struct RecordingMediaSession {
    titles: Mutex<Vec<Option<String>>>,
    states: Mutex<Vec<MediaPlaybackState>>,
    positions: Mutex<Vec<PositionState>>,
}

impl RecordingMediaSession {
    pub fn titles(&self) -> Vec<Option<String>> {
        self.titles.lock().unwrap().clone()
    }

    pub fn states(&self) -> Vec<MediaPlaybackState> {
        self.states.lock().unwrap().clone()
    }

    pub fn last_state(&self) -> Option<MediaPlaybackState> {
        self.states.lock().unwrap().last().copied()
    }

    pub fn positions(&self) -> Vec<PositionState> {
        self.positions.lock().unwrap().clone()
    }
}

impl MediaSession for RecordingMediaSession {
    fn set_metadata(&self, metadata: Option<&MediaMetadata>) {
        self.titles
            .lock()
            .unwrap()
            .push(metadata.map(|m| m.title.clone()));
    }

    fn set_playback_state(&self, state: MediaPlaybackState) {
        self.states.lock().unwrap().push(state);
    }

    fn set_position(&self, position: PositionState) {
        self.positions.lock().unwrap().push(position);
    }
}
