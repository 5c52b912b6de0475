//! K-Connect Player (kconnect-player) - Main entry point
//!
//! Headless player: wires the catalog, engine, presence reporter and media
//! surface together and reads transport commands from stdin.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use kconnect_common::config::ConfigFileResolver;
use kconnect_common::events::EventBus;
use kconnect_common::Category;
use kconnect_player::api::{HttpMusicApi, MusicApi};
use kconnect_player::catalog::{CatalogOptions, TrackCatalog};
use kconnect_player::config::PlayerConfig;
use kconnect_player::console::{self, Command};
use kconnect_player::media::{MediaCommandSender, MediaSession, MediaSessionBridge};
use kconnect_player::playback::persistence::FileSessionStore;
use kconnect_player::playback::simulated::SimulatedOutputFactory;
use kconnect_player::playback::{EngineOptions, EngineParts, PlaybackEngine};
use kconnect_player::presence::PresenceReporter;
use kconnect_player::state::EVENT_CAPACITY;
use kconnect_player::SharedState;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for kconnect-player
#[derive(Parser, Debug)]
#[command(name = "kconnect-player")]
#[command(about = "Headless K-Connect music player")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// REST backend base URL (overrides the config file)
    #[arg(long, env = "KCONNECT_API_URL")]
    api_url: Option<String>,

    /// Category loaded at startup
    #[arg(long, default_value = "all")]
    category: Category,

    /// Start playing the first track of the startup category
    #[arg(long)]
    autoplay: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = ConfigFileResolver::new().resolve(args.config.as_deref());
    let mut config = PlayerConfig::load(config_path.as_deref())
        .context("Failed to load configuration")?;
    if let Some(url) = args.api_url {
        config.api.base_url = url;
    }

    init_tracing(&config)?;

    info!("Starting K-Connect player against {}", config.api.base_url);
    if let Some(path) = &config_path {
        info!("Config file: {}", path.display());
    }

    let events = EventBus::new(EVENT_CAPACITY);
    let api: Arc<dyn MusicApi> =
        Arc::new(HttpMusicApi::new(&config.api).context("Failed to build HTTP client")?);

    let catalog = TrackCatalog::new(
        Arc::clone(&api),
        events.clone(),
        CatalogOptions::from(&config.catalog),
    );
    let presence = PresenceReporter::new(Arc::clone(&api), config.presence.enabled);

    let (media_tx, media_rx) = mpsc::unbounded_channel();
    let session: Arc<dyn MediaSession> = media_session(media_tx);
    let media = MediaSessionBridge::new(session, config.media.lockscreen_quirks);

    let session_file = config.session_file();
    debug!("Session file: {}", session_file.display());

    let (engine, output_events) = PlaybackEngine::new(EngineParts {
        catalog: catalog.clone(),
        outputs: Arc::new(SimulatedOutputFactory::default()),
        presence,
        media,
        store: Arc::new(FileSessionStore::new(session_file)),
        state: Arc::new(SharedState::new(events.clone())),
        options: EngineOptions::from(&config.playback),
    });
    info!("Playback engine initialized");

    let event_pump = engine.spawn_event_pump(output_events);
    let command_pump = engine.spawn_media_command_pump(media_rx);
    let event_log = spawn_event_log(&events);

    let tracks = catalog.load_category(args.category).await;
    info!("Loaded {} tracks from {}", tracks.len(), args.category);
    if args.autoplay {
        match tracks.first() {
            Some(first) => engine.play_track(first.clone(), args.category),
            None => warn!("Nothing to autoplay in {}", args.category),
        }
    }

    tokio::select! {
        result = run_console(&engine) => {
            result.context("Console input failed")?;
        }
        _ = shutdown_signal() => {}
    }

    engine.shutdown().await;
    event_pump.abort();
    command_pump.abort();
    event_log.abort();

    info!("Player shutdown complete");
    Ok(())
}

fn init_tracing(config: &PlayerConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .context("Invalid log level")?;

    let file_layer = match &config.logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

#[cfg(feature = "mpris")]
fn media_session(commands: MediaCommandSender) -> Arc<dyn MediaSession> {
    Arc::new(kconnect_player::media::mpris::MprisMediaSession::spawn(commands))
}

#[cfg(not(feature = "mpris"))]
fn media_session(_commands: MediaCommandSender) -> Arc<dyn MediaSession> {
    Arc::new(kconnect_player::media::LoggingMediaSession)
}

/// Log player events at debug level
fn spawn_event_log(events: &EventBus) -> tokio::task::JoinHandle<()> {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => debug!(target: "kconnect_player::events", "{}", json),
                    Err(e) => warn!("Unserializable event: {}", e),
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Event log lagged by {} events", n);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Read commands from stdin until EOF or `quit`
async fn run_console(engine: &PlaybackEngine) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{}", console::HELP);
    while let Some(line) = lines.next_line().await? {
        match console::parse(&line) {
            Ok(None) => {}
            Ok(Some(Command::Quit)) => break,
            Ok(Some(command)) => println!("{}", console::execute(engine, command).await),
            Err(e) => println!("{}", e),
        }
    }
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
