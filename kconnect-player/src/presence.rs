//! Presence Reporter
//!
//! Fire-and-forget "play" and "now playing" signals. Nothing here blocks
//! playback on a network result; failures are logged and dropped.
//!
//! After [`IDLE_CLEAR_AFTER`] without a start/resume or pause, the
//! now-playing status is cleared. Clearing is throttled to once per
//! [`CLEAR_THROTTLE`] however many triggers fire.

use crate::api::{MusicApi, NowPlaying};
use kconnect_common::Track;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Inactivity before now-playing is cleared
pub const IDLE_CLEAR_AFTER: Duration = Duration::from_secs(5 * 60);

/// Minimum spacing of clear requests
pub const CLEAR_THROTTLE: Duration = Duration::from_secs(15);

#[derive(Default)]
struct PresenceState {
    last_clear: Option<Instant>,
    idle_timer: Option<JoinHandle<()>>,
}

struct PresenceInner {
    api: Arc<dyn MusicApi>,
    enabled: bool,
    state: Mutex<PresenceState>,
}

impl PresenceInner {
    fn lock(&self) -> MutexGuard<'_, PresenceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Shared handle to the presence reporter
#[derive(Clone)]
pub struct PresenceReporter {
    inner: Arc<PresenceInner>,
}

impl PresenceReporter {
    pub fn new(api: Arc<dyn MusicApi>, enabled: bool) -> Self {
        Self {
            inner: Arc::new(PresenceInner {
                api,
                enabled,
                state: Mutex::new(PresenceState::default()),
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled
    }

    /// Playback of `track` started or resumed
    pub fn playback_started(&self, track: &Track) {
        if !self.inner.enabled {
            return;
        }
        let api = Arc::clone(&self.inner.api);
        let track_id = track.id;
        let status = NowPlaying::for_track(track);
        tokio::spawn(async move {
            if let Err(e) = api.record_play(track_id).await {
                warn!(track_id = %track_id, "Failed to record play: {}", e);
            }
            if let Err(e) = api.set_now_playing(&status).await {
                warn!(track_id = %track_id, "Failed to update now playing: {}", e);
            }
        });
        self.arm_idle_timer();
    }

    /// Playback paused with a track still loaded
    pub fn playback_paused(&self) {
        if !self.inner.enabled {
            return;
        }
        self.arm_idle_timer();
    }

    /// Clear now-playing, unless a clear went out within [`CLEAR_THROTTLE`]
    ///
    /// Returns true if a request was sent.
    pub async fn clear_now_playing(&self) -> bool {
        if !self.inner.enabled {
            return false;
        }
        {
            let mut st = self.inner.lock();
            if let Some(last) = st.last_clear {
                if last.elapsed() < CLEAR_THROTTLE {
                    debug!("Now-playing clear throttled");
                    return false;
                }
            }
            st.last_clear = Some(Instant::now());
        }

        match self.inner.api.clear_now_playing().await {
            Ok(()) => info!("Cleared now playing"),
            Err(e) => warn!("Failed to clear now playing: {}", e),
        }
        true
    }

    /// Stop the idle timer and clear now-playing (throttled)
    pub async fn shutdown(&self) {
        if let Some(timer) = self.inner.lock().idle_timer.take() {
            timer.abort();
        }
        self.clear_now_playing().await;
    }

    fn arm_idle_timer(&self) {
        let reporter = self.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(IDLE_CLEAR_AFTER).await;
            debug!("Presence idle timeout");
            reporter.clear_now_playing().await;
        });
        if let Some(previous) = self.inner.lock().idle_timer.replace(timer) {
            previous.abort();
        }
    }
}
