//! Crossfade timing and volume ramp
//!
//! The engine drives the transition; this module holds the pieces that do
//! not touch output handles: window classification of a time update and the
//! per-tick volume ramp.
//!
//! **Phases:** `Idle → Starting → Ramping → Swapping → Idle`. `Starting`
//! covers next-track resolution (which may await pagination); `Swapping` is
//! the instant between the final tick and the role flip.

use std::time::Duration;

/// Remaining seconds at which the transition starts
pub const CROSSFADE_WINDOW: f64 = 3.0;

/// Remaining seconds at which the next track is buffered
pub const PRELOAD_WINDOW: f64 = 10.0;

/// Ramp tick interval
pub const CROSSFADE_TICK: Duration = Duration::from_millis(100);

/// Volume moved per tick on each handle
pub const CROSSFADE_STEP: f32 = 0.1;

const VOLUME_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CrossfadePhase {
    #[default]
    Idle,
    Starting,
    Ramping,
    Swapping,
}

impl CrossfadePhase {
    /// A transition owns the handles
    pub fn in_flight(self) -> bool {
        !matches!(self, CrossfadePhase::Idle)
    }
}

/// Where a time update falls relative to the end of the track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeWindow {
    /// `0 < remaining ≤ 3`
    Crossfade,
    /// `3 < remaining ≤ 10`
    Preload,
    Outside,
}

pub fn classify(position: f64, duration: f64) -> FadeWindow {
    if duration.is_nan() || duration <= 0.0 || !position.is_finite() {
        return FadeWindow::Outside;
    }
    let remaining = duration - position;
    if remaining > 0.0 && remaining <= CROSSFADE_WINDOW {
        FadeWindow::Crossfade
    } else if remaining > CROSSFADE_WINDOW && remaining <= PRELOAD_WINDOW {
        FadeWindow::Preload
    } else {
        FadeWindow::Outside
    }
}

/// Handle volumes after one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RampStep {
    pub outgoing: f32,
    pub incoming: f32,
    /// Incoming reached its target; time to swap
    pub complete: bool,
}

/// Linear two-handle volume ramp
///
/// Outgoing moves toward 0 and incoming toward `target`, one
/// [`CROSSFADE_STEP`] each per tick. Neither overshoots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossfadeRamp {
    outgoing: f32,
    incoming: f32,
    target: f32,
}

impl CrossfadeRamp {
    /// Start from the outgoing handle's volume with incoming silent
    pub fn new(outgoing: f32, target: f32) -> Self {
        let target = target.clamp(0.0, 1.0);
        Self {
            outgoing: outgoing.clamp(0.0, target),
            incoming: 0.0,
            target,
        }
    }

    pub fn step(&mut self) -> RampStep {
        self.outgoing = (self.outgoing - CROSSFADE_STEP).max(0.0);
        self.incoming = (self.incoming + CROSSFADE_STEP).min(self.target);
        RampStep {
            outgoing: self.outgoing,
            incoming: self.incoming,
            complete: self.is_complete(),
        }
    }

    /// Follow a volume change made mid-fade
    pub fn retarget(&mut self, target: f32) {
        self.target = target.clamp(0.0, 1.0);
        self.incoming = self.incoming.min(self.target);
        self.outgoing = self.outgoing.min(self.target);
    }

    pub fn is_complete(&self) -> bool {
        self.incoming >= self.target - VOLUME_EPSILON
    }

    pub fn outgoing(&self) -> f32 {
        self.outgoing
    }

    pub fn incoming(&self) -> f32 {
        self.incoming
    }

    pub fn target(&self) -> f32 {
        self.target
    }
}
