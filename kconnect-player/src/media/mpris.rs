//! MPRIS media surface (Linux desktops, D-Bus session bus)
//!
//! Registers `org.mpris.MediaPlayer2.kconnect` on a dedicated thread and
//! forwards player method calls as [`MediaCommand`]s. Properties are served
//! from state the engine publishes through [`MediaSession`].

use super::{MediaCommand, MediaCommandSender, MediaMetadata, MediaPlaybackState, MediaSession, PositionState};
use async_io::{block_on, Timer};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{info, warn};
use zbus::{interface, Connection};
use zvariant::{OwnedValue, Value};

const BUS_NAME: &str = "org.mpris.MediaPlayer2.kconnect";
const OBJECT_PATH: &str = "/org/mpris/MediaPlayer2";
const MICROS_PER_SECOND: f64 = 1_000_000.0;

#[derive(Debug)]
struct MprisState {
    playback: MediaPlaybackState,
    metadata: Option<MediaMetadata>,
    position: f64,
}

impl Default for MprisState {
    fn default() -> Self {
        Self {
            playback: MediaPlaybackState::None,
            metadata: None,
            position: 0.0,
        }
    }
}

type SharedMprisState = Arc<Mutex<MprisState>>;

fn lock(state: &SharedMprisState) -> MutexGuard<'_, MprisState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn owned(value: Value<'_>) -> Option<OwnedValue> {
    OwnedValue::try_from(value).ok()
}

fn micros(seconds: f64) -> i64 {
    (seconds * MICROS_PER_SECOND) as i64
}

/// [`MediaSession`] backed by an MPRIS service
pub struct MprisMediaSession {
    state: SharedMprisState,
}

impl MprisMediaSession {
    /// Start the D-Bus service; commands arrive on `commands`
    pub fn spawn(commands: MediaCommandSender) -> Self {
        let state: SharedMprisState = Arc::new(Mutex::new(MprisState::default()));
        let service_state = Arc::clone(&state);

        std::thread::spawn(move || {
            block_on(async move {
                let connection = match Connection::session().await {
                    Ok(c) => c,
                    Err(e) => {
                        warn!("MPRIS: failed to connect to session bus: {}", e);
                        return;
                    }
                };

                if let Err(e) = connection.request_name(BUS_NAME).await {
                    warn!("MPRIS: failed to acquire {}: {}", BUS_NAME, e);
                    return;
                }

                let object_server = connection.object_server();
                let root = RootIface {
                    commands: commands.clone(),
                };
                if let Err(e) = object_server.at(OBJECT_PATH, root).await {
                    warn!("MPRIS: failed to register root interface: {}", e);
                    return;
                }
                let player = PlayerIface {
                    commands,
                    state: service_state,
                };
                if let Err(e) = object_server.at(OBJECT_PATH, player).await {
                    warn!("MPRIS: failed to register player interface: {}", e);
                    return;
                }

                info!(bus_name = BUS_NAME, "MPRIS service registered");
                loop {
                    Timer::after(Duration::from_secs(3600)).await;
                }
            });
        });

        Self { state }
    }
}

impl MediaSession for MprisMediaSession {
    fn set_metadata(&self, metadata: Option<&MediaMetadata>) {
        lock(&self.state).metadata = metadata.cloned();
    }

    fn set_playback_state(&self, playback: MediaPlaybackState) {
        lock(&self.state).playback = playback;
    }

    fn set_position(&self, position: PositionState) {
        lock(&self.state).position = position.position;
    }
}

struct RootIface {
    commands: MediaCommandSender,
}

#[interface(name = "org.mpris.MediaPlayer2")]
impl RootIface {
    fn raise(&self) {}

    fn quit(&self) {
        let _ = self.commands.send(MediaCommand::Stop);
    }

    #[zbus(property)]
    fn can_quit(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_raise(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn has_track_list(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn identity(&self) -> &str {
        "K-Connect"
    }

    #[zbus(property)]
    fn supported_uri_schemes(&self) -> Vec<String> {
        vec![]
    }

    #[zbus(property)]
    fn supported_mime_types(&self) -> Vec<String> {
        vec![]
    }
}

struct PlayerIface {
    commands: MediaCommandSender,
    state: SharedMprisState,
}

impl PlayerIface {
    fn send(&self, command: MediaCommand) {
        if self.commands.send(command).is_err() {
            warn!(?command, "MPRIS: engine no longer listening");
        }
    }
}

#[interface(name = "org.mpris.MediaPlayer2.Player")]
impl PlayerIface {
    fn next(&self) {
        self.send(MediaCommand::Next);
    }

    fn previous(&self) {
        self.send(MediaCommand::Previous);
    }

    fn play(&self) {
        self.send(MediaCommand::Play);
    }

    fn pause(&self) {
        self.send(MediaCommand::Pause);
    }

    fn play_pause(&self) {
        self.send(MediaCommand::PlayPause);
    }

    fn stop(&self) {
        self.send(MediaCommand::Stop);
    }

    /// Relative seek in microseconds
    fn seek(&self, offset: i64) {
        let seconds = (offset as f64 / MICROS_PER_SECOND).abs();
        if offset >= 0 {
            self.send(MediaCommand::SeekForward(Some(seconds)));
        } else {
            self.send(MediaCommand::SeekBackward(Some(seconds)));
        }
    }

    #[zbus(property)]
    fn playback_status(&self) -> String {
        match lock(&self.state).playback {
            MediaPlaybackState::None => "Stopped",
            MediaPlaybackState::Playing => "Playing",
            MediaPlaybackState::Paused => "Paused",
        }
        .to_string()
    }

    #[zbus(property)]
    fn position(&self) -> i64 {
        micros(lock(&self.state).position)
    }

    #[zbus(property)]
    fn can_control(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_play(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_pause(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_seek(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_go_next(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_go_previous(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn metadata(&self) -> HashMap<String, OwnedValue> {
        let mut map = HashMap::new();
        let Some(metadata) = lock(&self.state).metadata.clone() else {
            return map;
        };

        if let Some(title) = owned(Value::from(metadata.title)) {
            map.insert("xesam:title".to_string(), title);
        }
        if let Some(artist) = owned(Value::from(vec![metadata.artist])) {
            map.insert("xesam:artist".to_string(), artist);
        }
        if let Some(album) = metadata.album.and_then(|a| owned(Value::from(a))) {
            map.insert("xesam:album".to_string(), album);
        }
        if let Some(art) = metadata.artwork_url.and_then(|a| owned(Value::from(a))) {
            map.insert("mpris:artUrl".to_string(), art);
        }
        if let Some(length) = owned(Value::from(micros(metadata.duration))) {
            map.insert("mpris:length".to_string(), length);
        }
        map
    }
}
