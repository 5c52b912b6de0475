//! Audio output handles
//!
//! An [`AudioOutput`] is one playable media element: it takes a source URL,
//! buffers it, plays, pauses and reports progress. Handles are created by an
//! [`OutputFactory`] and report back asynchronously through an
//! [`OutputEvent`] channel, each event tagged with the id of the handle that
//! produced it. The engine ignores events from handles it no longer holds,
//! which is how listeners on a replaced handle are detached.
//!
//! [`OutputSlots`] holds the two handles the engine owns. "Current" is always
//! `slots[active]`; promoting the crossfade target is an index flip.

use crate::error::Result;
use kconnect_common::Track;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Identity of one output handle instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputId(pub u64);

impl fmt::Display for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "output-{}", self.0)
    }
}

/// Something an output handle can load
#[derive(Debug, Clone, PartialEq)]
pub struct MediaSource {
    pub url: String,
    /// Catalog duration, used until the media reports its own
    pub duration_hint: Option<f64>,
}

impl MediaSource {
    pub fn for_track(track: &Track) -> Self {
        Self {
            url: track.file_path.clone(),
            duration_hint: (track.duration > 0.0).then_some(track.duration),
        }
    }
}

/// Notification from an output handle
#[derive(Debug, Clone, PartialEq)]
pub struct OutputEvent {
    pub output: OutputId,
    pub kind: OutputEventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutputEventKind {
    /// Source assigned, buffering started
    LoadStart,
    /// Enough is buffered to play to the end without stalling
    CanPlayThrough,
    /// Source failed to load or decode
    Error(String),
    /// Periodic position report while playing
    TimeUpdate { position: f64, duration: f64 },
    /// Reached the end of the source
    Ended,
    /// Native playback started (also fires for OS-initiated resumes)
    Played,
    /// Native playback paused
    Paused,
}

pub type OutputEventSender = mpsc::UnboundedSender<OutputEvent>;
pub type OutputEventReceiver = mpsc::UnboundedReceiver<OutputEvent>;

/// One playable media handle
///
/// Methods are non-blocking; loading progress and failures arrive as
/// [`OutputEvent`]s.
pub trait AudioOutput: Send + Sync {
    fn id(&self) -> OutputId;

    /// Assign `source` and start buffering
    fn load(&self, source: &MediaSource);

    /// Drop the current source so nothing can auto-play from it
    fn clear_source(&self);

    fn has_source(&self) -> bool;

    /// Start playback; `Err` if the platform refuses
    fn play(&self) -> Result<()>;

    fn pause(&self);

    fn is_paused(&self) -> bool;

    /// Jump to `position` seconds
    fn seek(&self, position: f64);

    /// Element volume (0.0-1.0)
    fn set_volume(&self, volume: f32);

    fn volume(&self) -> f32;

    fn set_muted(&self, muted: bool);

    /// Playback position in seconds
    fn position(&self) -> f64;

    /// Source duration in seconds (0 when unknown)
    fn duration(&self) -> f64;
}

/// Creates fresh output handles
pub trait OutputFactory: Send + Sync {
    fn create(&self, id: OutputId, events: OutputEventSender) -> Arc<dyn AudioOutput>;
}

/// Which engine slot a handle occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRole {
    Current,
    Next,
}

/// The engine's two output handles
#[derive(Default)]
pub struct OutputSlots {
    slots: [Option<Arc<dyn AudioOutput>>; 2],
    active: usize,
}

impl OutputSlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Arc<dyn AudioOutput>> {
        self.slots[self.active].as_ref()
    }

    pub fn next(&self) -> Option<&Arc<dyn AudioOutput>> {
        self.slots[1 - self.active].as_ref()
    }

    /// Install `output` as current, returning the handle it replaced
    pub fn replace_current(&mut self, output: Arc<dyn AudioOutput>) -> Option<Arc<dyn AudioOutput>> {
        self.slots[self.active].replace(output)
    }

    /// Install `output` as next, returning the handle it replaced
    pub fn replace_next(&mut self, output: Arc<dyn AudioOutput>) -> Option<Arc<dyn AudioOutput>> {
        self.slots[1 - self.active].replace(output)
    }

    /// Promote next to current
    pub fn swap(&mut self) {
        self.active = 1 - self.active;
    }

    /// Slot held by handle `id`, if any
    pub fn role_of(&self, id: OutputId) -> Option<SlotRole> {
        if self.current().is_some_and(|o| o.id() == id) {
            Some(SlotRole::Current)
        } else if self.next().is_some_and(|o| o.id() == id) {
            Some(SlotRole::Next)
        } else {
            None
        }
    }

    /// Pause both handles and clear their sources
    pub fn silence_all(&self) {
        for output in self.slots.iter().flatten() {
            output.pause();
            output.clear_source();
        }
    }

    /// Index of the current slot (0 or 1)
    pub fn active_index(&self) -> usize {
        self.active
    }
}

impl fmt::Debug for OutputSlots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputSlots")
            .field("active", &self.active)
            .field("slots", &self.slots.iter().map(|s| s.as_ref().map(|o| o.id())).collect::<Vec<_>>())
            .finish()
    }
}
