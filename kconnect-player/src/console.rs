//! Line-oriented command console for the headless player
//!
//! One command per line, e.g. `load popular`, `play 3`, `next`, `seek 42`,
//! `vol 0.5`, `search lo-fi`, `like`, `status`.

use crate::api::UploadMetadata;
use crate::playback::PlaybackEngine;
use kconnect_common::{Category, TrackId};
use std::fmt::Write as _;
use std::path::PathBuf;
use thiserror::Error;

pub const HELP: &str = "\
commands:
  load <category>            load and list a category (all|popular|liked|new|random|search)
  list [category]            list loaded tracks
  play <index> [category]    play a track from a list
  toggle | p                 play/pause
  next | n                   next track
  prev | b                   previous track (or restart)
  seek <seconds>             jump within the current track
  vol <0.0-1.0>              set volume
  mute                       toggle mute
  like [track-id]            like/unlike (default: current track)
  search <query>             search and list results
  more [category]            load the next page
  reset <category> [shuffle] refetch the first page
  upload <path> <artist> - <title>
  status                     show player state
  quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Load(Category),
    List(Option<Category>),
    Play { index: usize, category: Option<Category> },
    Toggle,
    Next,
    Prev,
    Seek(f64),
    Volume(f32),
    Mute,
    Like(Option<TrackId>),
    Search(String),
    More(Option<Category>),
    Reset { category: Category, shuffle: bool },
    Upload { path: PathBuf, metadata: UploadMetadata },
    Status,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),

    #[error("missing {0}")]
    Missing(&'static str),

    #[error("invalid {what}: '{value}'")]
    Invalid { what: &'static str, value: String },
}

fn category(value: &str) -> Result<Category, ParseError> {
    value.parse().map_err(|_| ParseError::Invalid {
        what: "category",
        value: value.to_string(),
    })
}

fn optional_category(value: Option<&str>) -> Result<Option<Category>, ParseError> {
    value.map(category).transpose()
}

fn number<T: std::str::FromStr>(value: Option<&str>, what: &'static str) -> Result<T, ParseError> {
    let value = value.ok_or(ParseError::Missing(what))?;
    value.parse().map_err(|_| ParseError::Invalid {
        what,
        value: value.to_string(),
    })
}

/// Parse one console line; blank lines yield `None`
pub fn parse(line: &str) -> Result<Option<Command>, ParseError> {
    let line = line.trim();
    let Some((verb, rest)) = line
        .split_once(char::is_whitespace)
        .map(|(v, r)| (v, r.trim()))
        .or_else(|| (!line.is_empty()).then_some((line, "")))
    else {
        return Ok(None);
    };
    let mut args = rest.split_whitespace();

    let command = match verb.to_ascii_lowercase().as_str() {
        "load" => Command::Load(category(args.next().ok_or(ParseError::Missing("category"))?)?),
        "list" | "ls" => Command::List(optional_category(args.next())?),
        "play" => Command::Play {
            index: number(args.next(), "index")?,
            category: optional_category(args.next())?,
        },
        "toggle" | "p" | "pause" => Command::Toggle,
        "next" | "n" => Command::Next,
        "prev" | "b" => Command::Prev,
        "seek" => Command::Seek(number(args.next(), "seconds")?),
        "vol" | "volume" => Command::Volume(number(args.next(), "volume")?),
        "mute" => Command::Mute,
        "like" => Command::Like(
            args.next()
                .map(|id| number(Some(id), "track id").map(TrackId))
                .transpose()?,
        ),
        "search" => Command::Search(rest.to_string()),
        "more" => Command::More(optional_category(args.next())?),
        "reset" => Command::Reset {
            category: category(args.next().ok_or(ParseError::Missing("category"))?)?,
            shuffle: matches!(args.next(), Some("shuffle") | Some("random")),
        },
        "upload" => {
            let path = args.next().ok_or(ParseError::Missing("path"))?;
            let description: Vec<&str> = args.collect();
            let description = description.join(" ");
            let (artist, title) = description
                .split_once(" - ")
                .ok_or(ParseError::Missing("'<artist> - <title>'"))?;
            Command::Upload {
                path: PathBuf::from(path),
                metadata: UploadMetadata {
                    title: title.trim().to_string(),
                    artist: artist.trim().to_string(),
                    ..Default::default()
                },
            }
        }
        "status" | "st" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(ParseError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

/// Run `command` against `engine`, returning text for the operator
pub async fn execute(engine: &PlaybackEngine, command: Command) -> String {
    let catalog = engine.catalog();
    match command {
        Command::Load(category) => {
            catalog.load_category(category).await;
            list(engine, category)
        }
        Command::List(category) => {
            list(engine, category.unwrap_or(engine.snapshot().current_category))
        }
        Command::Play { index, category } => {
            let category = category.unwrap_or(engine.snapshot().current_category);
            match catalog.tracks(category).get(index).cloned() {
                Some(track) => {
                    let line = format!("playing {} - {}", track.artist, track.title);
                    engine.play_track(track, category);
                    line
                }
                None => format!("no track {} in {}", index, category),
            }
        }
        Command::Toggle => {
            engine.toggle_play();
            status(engine)
        }
        Command::Next => {
            engine.next_track().await;
            status(engine)
        }
        Command::Prev => {
            engine.prev_track();
            status(engine)
        }
        Command::Seek(seconds) => {
            engine.seek_to(seconds);
            status(engine)
        }
        Command::Volume(volume) => {
            engine.set_volume(volume);
            status(engine)
        }
        Command::Mute => {
            engine.toggle_mute();
            status(engine)
        }
        Command::Like(track_id) => match engine.toggle_like(track_id).await {
            Some(true) => "liked".to_string(),
            Some(false) => "unliked".to_string(),
            None => "like not applied".to_string(),
        },
        Command::Search(query) => {
            catalog.search(&query).await;
            list(engine, Category::Search)
        }
        Command::More(category) => {
            let category = category.unwrap_or(engine.snapshot().current_category);
            if catalog.load_more(category).await {
                list(engine, category)
            } else {
                format!("no new tracks in {}", category)
            }
        }
        Command::Reset { category, shuffle } => {
            if catalog.reset_pagination(category, shuffle).await {
                list(engine, category)
            } else {
                format!("reset of {} failed", category)
            }
        }
        Command::Upload { path, metadata } => match catalog.upload(&path, metadata).await {
            Ok(track) => format!("uploaded #{} {} - {}", track.id, track.artist, track.title),
            Err(e) => format!("upload failed: {}", e),
        },
        Command::Status => status(engine),
        Command::Help => HELP.to_string(),
        Command::Quit => String::new(),
    }
}

fn list(engine: &PlaybackEngine, category: Category) -> String {
    let snapshot = engine.catalog().snapshot(category);
    let current = engine.current_track().map(|t| t.id);
    let mut out = format!(
        "{} ({} tracks, page {}{})",
        category,
        snapshot.tracks.len(),
        snapshot.page,
        if snapshot.has_more { ", more available" } else { "" }
    );
    for (index, track) in snapshot.tracks.iter().enumerate() {
        let marker = if Some(track.id) == current { '>' } else { ' ' };
        let heart = if track.is_liked { " ♥" } else { "" };
        let _ = write!(
            out,
            "\n{}{:>3}  {} - {} [{}]{}",
            marker, index, track.artist, track.title, track.id, heart
        );
    }
    out
}

fn status(engine: &PlaybackEngine) -> String {
    let s = engine.snapshot();
    let track = s
        .current_track
        .as_ref()
        .map(|t| format!("{} - {}", t.artist, t.title))
        .unwrap_or_else(|| "nothing loaded".to_string());
    format!(
        "{} [{:?}] {:.1}/{:.1}s vol {:.2}{}{} ({})",
        track,
        s.track_state,
        s.current_time,
        s.duration,
        s.volume,
        if s.is_muted { " muted" } else { "" },
        if s.is_track_loading { " loading" } else { "" },
        s.current_category,
    )
}
