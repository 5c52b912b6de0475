//! Playback: output handles, session state, crossfade, navigation and the
//! engine that ties them together

pub mod crossfade;
pub mod engine;
pub mod navigation;
pub mod output;
pub mod persistence;
pub mod session;
pub mod simulated;

pub use engine::{EngineOptions, EngineParts, PlaybackEngine};
pub use navigation::Navigator;
pub use output::{AudioOutput, MediaSource, OutputEvent, OutputEventKind, OutputFactory, OutputId};
pub use session::{PlaybackSession, PlayerSnapshot, TrackState};
