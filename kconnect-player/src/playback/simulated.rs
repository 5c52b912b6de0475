//! Simulated output handles
//!
//! Wall-clock driven stand-ins for a media element: buffering takes a fixed
//! delay, position advances in real time while playing, and the usual event
//! sequence (`LoadStart`, `CanPlayThrough`, `TimeUpdate`..., `Ended`) is
//! emitted. Used by the headless binary where no audio device is wired up.

use crate::error::{Error, Result};
use crate::playback::output::{
    AudioOutput, MediaSource, OutputEvent, OutputEventKind, OutputEventSender, OutputFactory,
    OutputId,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Duration assumed when a source carries no hint
pub const DEFAULT_DURATION: f64 = 180.0;

#[derive(Debug, Clone)]
pub struct SimulatedOutputFactory {
    /// Progress report interval
    pub tick: Duration,
    /// Time from `load` to `CanPlayThrough`
    pub buffer_delay: Duration,
}

impl Default for SimulatedOutputFactory {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(250),
            buffer_delay: Duration::from_millis(300),
        }
    }
}

impl OutputFactory for SimulatedOutputFactory {
    fn create(&self, id: OutputId, events: OutputEventSender) -> Arc<dyn AudioOutput> {
        Arc::new(SimulatedOutput {
            id,
            events,
            tick: self.tick,
            buffer_delay: self.buffer_delay,
            state: Arc::new(Mutex::new(SimState::default())),
        })
    }
}

#[derive(Default)]
struct SimState {
    source: Option<MediaSource>,
    /// Bumped per `load`/`clear_source` so stale loaders stay quiet
    generation: u64,
    playing: bool,
    volume: f32,
    muted: bool,
    position: f64,
    duration: f64,
    clock: Option<JoinHandle<()>>,
    loader: Option<JoinHandle<()>>,
}

impl SimState {
    fn stop_clock(&mut self) {
        if let Some(clock) = self.clock.take() {
            clock.abort();
        }
    }
}

type SharedSimState = Arc<Mutex<SimState>>;

fn lock(state: &SharedSimState) -> MutexGuard<'_, SimState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct SimulatedOutput {
    id: OutputId,
    events: OutputEventSender,
    tick: Duration,
    buffer_delay: Duration,
    state: SharedSimState,
}

impl SimulatedOutput {
    fn send(&self, kind: OutputEventKind) {
        send(&self.events, self.id, kind);
    }

    fn start_clock(&self, st: &mut SimState) {
        st.stop_clock();
        let state = Arc::clone(&self.state);
        let events = self.events.clone();
        let id = self.id;
        let tick = self.tick;
        st.clock = Some(tokio::spawn(async move {
            let mut ticks = tokio::time::interval_at(tokio::time::Instant::now() + tick, tick);
            loop {
                ticks.tick().await;
                let (position, duration, ended) = {
                    let mut st = lock(&state);
                    st.position = (st.position + tick.as_secs_f64()).min(st.duration);
                    let ended = st.position >= st.duration;
                    if ended {
                        st.playing = false;
                        st.clock = None;
                    }
                    (st.position, st.duration, ended)
                };
                send(&events, id, OutputEventKind::TimeUpdate { position, duration });
                if ended {
                    send(&events, id, OutputEventKind::Ended);
                    break;
                }
            }
        }));
    }
}

fn send(events: &OutputEventSender, output: OutputId, kind: OutputEventKind) {
    if events.send(OutputEvent { output, kind }).is_err() {
        debug!(%output, "Output event receiver gone");
    }
}

impl AudioOutput for SimulatedOutput {
    fn id(&self) -> OutputId {
        self.id
    }

    fn load(&self, source: &MediaSource) {
        let generation = {
            let mut st = lock(&self.state);
            st.stop_clock();
            if let Some(loader) = st.loader.take() {
                loader.abort();
            }
            st.generation += 1;
            st.source = Some(source.clone());
            st.playing = false;
            st.position = 0.0;
            st.duration = source.duration_hint.unwrap_or(DEFAULT_DURATION);
            st.generation
        };
        self.send(OutputEventKind::LoadStart);

        let state = Arc::clone(&self.state);
        let events = self.events.clone();
        let id = self.id;
        let delay = self.buffer_delay;
        let loader = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if lock(&state).generation == generation {
                send(&events, id, OutputEventKind::CanPlayThrough);
            }
        });
        lock(&self.state).loader = Some(loader);
    }

    fn clear_source(&self) {
        let mut st = lock(&self.state);
        st.stop_clock();
        if let Some(loader) = st.loader.take() {
            loader.abort();
        }
        st.generation += 1;
        st.source = None;
        st.playing = false;
        st.position = 0.0;
    }

    fn has_source(&self) -> bool {
        lock(&self.state).source.is_some()
    }

    fn play(&self) -> Result<()> {
        {
            let mut st = lock(&self.state);
            if st.source.is_none() {
                return Err(Error::AudioOutput(format!("{} has no source", self.id)));
            }
            if st.playing {
                return Ok(());
            }
            if st.position >= st.duration {
                st.position = 0.0;
            }
            st.playing = true;
            self.start_clock(&mut st);
        }
        self.send(OutputEventKind::Played);
        Ok(())
    }

    fn pause(&self) {
        let was_playing = {
            let mut st = lock(&self.state);
            st.stop_clock();
            std::mem::replace(&mut st.playing, false)
        };
        if was_playing {
            self.send(OutputEventKind::Paused);
        }
    }

    fn is_paused(&self) -> bool {
        !lock(&self.state).playing
    }

    fn seek(&self, position: f64) {
        let mut st = lock(&self.state);
        st.position = position.clamp(0.0, st.duration.max(0.0));
    }

    fn set_volume(&self, volume: f32) {
        lock(&self.state).volume = volume.clamp(0.0, 1.0);
    }

    fn volume(&self) -> f32 {
        lock(&self.state).volume
    }

    fn set_muted(&self, muted: bool) {
        lock(&self.state).muted = muted;
    }

    fn position(&self) -> f64 {
        lock(&self.state).position
    }

    fn duration(&self) -> f64 {
        lock(&self.state).duration
    }
}

impl Drop for SimulatedOutput {
    fn drop(&mut self) {
        let mut st = lock(&self.state);
        st.stop_clock();
        if let Some(loader) = st.loader.take() {
            loader.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn source(duration: f64) -> MediaSource {
        MediaSource {
            url: "/music/1.mp3".to_string(),
            duration_hint: Some(duration),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_buffers_plays_and_ends() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let factory = SimulatedOutputFactory {
            tick: Duration::from_millis(500),
            buffer_delay: Duration::from_millis(100),
        };
        let output = factory.create(OutputId(1), tx);

        output.load(&source(1.0));
        assert_eq!(rx.recv().await.unwrap().kind, OutputEventKind::LoadStart);
        assert_eq!(rx.recv().await.unwrap().kind, OutputEventKind::CanPlayThrough);

        output.play().unwrap();
        assert_eq!(rx.recv().await.unwrap().kind, OutputEventKind::Played);
        assert_eq!(
            rx.recv().await.unwrap().kind,
            OutputEventKind::TimeUpdate {
                position: 0.5,
                duration: 1.0
            }
        );
        assert_eq!(
            rx.recv().await.unwrap().kind,
            OutputEventKind::TimeUpdate {
                position: 1.0,
                duration: 1.0
            }
        );
        assert_eq!(rx.recv().await.unwrap().kind, OutputEventKind::Ended);
        assert!(output.is_paused());
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_without_source_fails() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let output = SimulatedOutputFactory::default().create(OutputId(2), tx);
        assert!(output.play().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleared_source_never_reports_ready() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let output = SimulatedOutputFactory::default().create(OutputId(3), tx);

        output.load(&source(10.0));
        output.clear_source();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(rx.recv().await.unwrap().kind, OutputEventKind::LoadStart);
        assert!(rx.try_recv().is_err());
    }
}
