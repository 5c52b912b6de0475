//! Playback engine integration tests
//!
//! Output handles are fakes; the test plays the part of the media element by
//! injecting its events.

mod helpers;

use helpers::{settle, track, tracks, FakeApi, TestPlayer};
use kconnect_common::events::{PlaybackState, PlayerEvent};
use kconnect_common::{Category, TrackId};
use kconnect_player::media::{MediaCommand, MediaPlaybackState};
use kconnect_player::playback::{AudioOutput, OutputEvent, OutputEventKind, TrackState};

#[tokio::test(start_paused = true)]
async fn test_play_track_loads_then_plays_on_buffered() {
    let mut player =
        TestPlayer::builder(FakeApi::new().with_catalog(Category::All, tracks(1..=3)))
            .presence(true)
            .build();
    let list = player.engine.catalog().load_category(Category::All).await;
    let a = list[0].clone();

    player.engine.play_track(a.clone(), Category::All);
    let loading = player.engine.snapshot();
    assert!(loading.is_track_loading);
    assert!(!loading.is_playing);
    assert_eq!(loading.track_state, TrackState::Loading);
    assert_eq!(
        player.current_output().source_url().as_deref(),
        Some(a.file_path.as_str())
    );

    player.buffered().await;
    let playing = player.engine.snapshot();
    assert!(playing.is_playing);
    assert!(!playing.is_track_loading);
    assert_eq!(playing.track_state, TrackState::Playing);
    assert!(player.current_output().is_playing());

    settle().await;
    assert_eq!(player.api.plays(), vec![a.id]);
    assert_eq!(player.api.now_playing()[0].track_id, a.id);

    let events = player.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        PlayerEvent::TrackChanged { track_id, category: Category::All, .. } if *track_id == a.id
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        PlayerEvent::PlaybackStateChanged { new_state: PlaybackState::Playing, .. }
    )));
    assert_eq!(player.media.last_state(), Some(MediaPlaybackState::Playing));
    assert_eq!(player.media.titles().last().cloned().flatten(), Some(a.title));
}

#[tokio::test(start_paused = true)]
async fn test_transport_rejected_while_loading() {
    let player = TestPlayer::with_tracks(tracks(1..=3));
    let list = player.engine.catalog().load_category(Category::All).await;

    player.engine.play_track(list[1].clone(), Category::All);
    assert!(player.engine.is_track_loading());

    player.engine.toggle_play();
    player.engine.next_track().await;
    player.engine.prev_track();
    player.engine.play_track(list[2].clone(), Category::All);

    assert_eq!(player.current_id(), Some(2));
    assert!(player.engine.is_track_loading());
    assert_eq!(player.outputs.created(), 1);
    assert_eq!(player.current_output().play_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_prev_changes_track_before_threshold() {
    let player = TestPlayer::with_tracks(tracks(1..=3));
    player.start_at(Category::All, 1).await;

    player.time_update(2.9, 200.0).await;
    player.engine.prev_track();

    assert_eq!(player.current_id(), Some(1));
    assert!(player.engine.is_track_loading());
}

#[tokio::test(start_paused = true)]
async fn test_prev_rewinds_after_threshold() {
    let player = TestPlayer::with_tracks(tracks(1..=3));
    player.start_at(Category::All, 1).await;

    player.time_update(3.1, 200.0).await;
    player.engine.prev_track();

    let snapshot = player.engine.snapshot();
    assert_eq!(player.current_id(), Some(2));
    assert_eq!(snapshot.current_time, 0.0);
    assert!(snapshot.is_playing);
    assert_eq!(player.current_output().position(), 0.0);
    assert_eq!(player.outputs.created(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_prev_from_first_track_loops_to_last() {
    let player = TestPlayer::with_tracks(tracks(1..=3));
    player.start_at(Category::All, 0).await;

    player.engine.prev_track();
    assert_eq!(player.current_id(), Some(3));
}

#[tokio::test(start_paused = true)]
async fn test_playing_same_track_toggles() {
    let player = TestPlayer::with_tracks(tracks(1..=3));
    let a = player.start_at(Category::All, 0).await;

    player.engine.play_track(a.clone(), Category::All);
    assert!(!player.engine.snapshot().is_playing);
    assert!(!player.current_output().is_playing());

    player.engine.play_track(a, Category::All);
    assert!(player.engine.snapshot().is_playing);
    assert_eq!(player.outputs.created(), 1, "same track never reloads");
}

#[tokio::test(start_paused = true)]
async fn test_next_track_and_natural_end_advance() {
    let player = TestPlayer::with_tracks(tracks(1..=3));
    player.start_at(Category::All, 0).await;

    player.engine.next_track().await;
    assert_eq!(player.current_id(), Some(2));
    player.buffered().await;

    player.send_current(OutputEventKind::Ended).await;
    assert_eq!(player.current_id(), Some(3));
    player.buffered().await;

    player.send_current(OutputEventKind::Ended).await;
    assert_eq!(player.current_id(), Some(1), "loops to the start");
}

#[tokio::test(start_paused = true)]
async fn test_events_from_replaced_output_are_ignored() {
    let player = TestPlayer::with_tracks(tracks(1..=3));
    player.start_at(Category::All, 0).await;
    let (stale, _) = player.engine.output_ids();
    let stale = stale.unwrap();

    player.engine.next_track().await;
    player
        .engine
        .handle_output_event(OutputEvent {
            output: stale,
            kind: OutputEventKind::CanPlayThrough,
        })
        .await;
    assert!(player.engine.is_track_loading());

    player
        .engine
        .handle_output_event(OutputEvent {
            output: stale,
            kind: OutputEventKind::Ended,
        })
        .await;
    assert_eq!(player.current_id(), Some(2));

    player.buffered().await;
    assert!(player.engine.snapshot().is_playing);
    assert!(!player.outputs.get(stale).is_playing());
}

#[tokio::test(start_paused = true)]
async fn test_media_error_stops_without_retry() {
    let mut player = TestPlayer::with_tracks(tracks(1..=3));
    let list = player.engine.catalog().load_category(Category::All).await;
    player.engine.play_track(list[0].clone(), Category::All);

    player
        .send_current(OutputEventKind::Error("decode failed".to_string()))
        .await;

    let snapshot = player.engine.snapshot();
    assert!(!snapshot.is_track_loading);
    assert!(!snapshot.is_playing);
    assert_eq!(snapshot.current_track.map(|t| t.id), Some(TrackId(1)));
    assert_eq!(player.outputs.created(), 1);

    let events = player.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        PlayerEvent::PlaybackError { track_id: TrackId(1), message } if message == "decode failed"
    )));
    assert!(events
        .iter()
        .any(|e| matches!(e, PlayerEvent::LoadingChanged { loading: false })));
}

#[tokio::test(start_paused = true)]
async fn test_refused_play_is_reported() {
    let mut player = TestPlayer::with_tracks(tracks(1..=3));
    player.outputs.refuse_play();
    let list = player.engine.catalog().load_category(Category::All).await;
    player.engine.play_track(list[0].clone(), Category::All);
    player.buffered().await;

    let snapshot = player.engine.snapshot();
    assert!(!snapshot.is_playing);
    assert!(!snapshot.is_track_loading);
    assert!(player
        .drain_events()
        .iter()
        .any(|e| matches!(e, PlayerEvent::PlaybackError { .. })));

    // Not stuck: the next request goes through
    player.engine.next_track().await;
    assert_eq!(player.current_id(), Some(2));
}

#[tokio::test(start_paused = true)]
async fn test_track_changes_are_persisted() {
    let player = TestPlayer::builder(FakeApi::new().with_catalog(Category::Popular, tracks(4..=6)))
        .build();
    player.start_at(Category::Popular, 2).await;

    let saved = player.store.saved().unwrap();
    assert_eq!(saved.current_track.id, TrackId(6));
    assert_eq!(saved.current_section, Category::Popular);
}

#[tokio::test(start_paused = true)]
async fn test_restored_session_is_paused_until_toggled() {
    let restored = track(8);
    let player = TestPlayer::builder(FakeApi::new().with_catalog(Category::New, tracks(7..=9)))
        .persisted(restored.clone(), Category::New)
        .build();

    let snapshot = player.engine.snapshot();
    assert_eq!(snapshot.current_track.as_ref().map(|t| t.id), Some(restored.id));
    assert_eq!(snapshot.current_category, Category::New);
    assert!(!snapshot.is_playing);
    assert_eq!(snapshot.track_state, TrackState::Idle);
    assert_eq!(player.outputs.created(), 0);
    assert_eq!(player.media.last_state(), Some(MediaPlaybackState::Paused));

    player.engine.toggle_play();
    assert!(player.engine.is_track_loading());
    assert_eq!(
        player.current_output().source_url().as_deref(),
        Some(restored.file_path.as_str())
    );

    player.buffered().await;
    assert!(player.engine.snapshot().is_playing);
}

#[tokio::test(start_paused = true)]
async fn test_volume_and_mute() {
    let mut player = TestPlayer::with_tracks(tracks(1..=2));
    player.start_at(Category::All, 0).await;
    assert!((player.current_output().volume() - 0.8).abs() < 1e-6);

    player.engine.set_volume(0.5);
    assert!((player.current_output().volume() - 0.5).abs() < 1e-6);

    player.engine.set_volume(1.7);
    assert_eq!(player.engine.snapshot().volume, 1.0);

    player.engine.toggle_mute();
    assert!(player.current_output().is_muted());
    assert!(player.engine.snapshot().is_muted);
    assert_eq!(player.engine.snapshot().volume, 1.0, "mute keeps the volume");

    player.engine.toggle_mute();
    assert!(!player.current_output().is_muted());
    assert!((player.current_output().volume() - 1.0).abs() < 1e-6);

    let volume_events = player
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, PlayerEvent::VolumeChanged { .. }))
        .count();
    assert_eq!(volume_events, 4);
}

#[tokio::test(start_paused = true)]
async fn test_mute_carries_over_to_next_track() {
    let player = TestPlayer::with_tracks(tracks(1..=2));
    player.start_at(Category::All, 0).await;
    player.engine.toggle_mute();

    player.engine.next_track().await;
    assert!(player.current_output().is_muted());
}

#[tokio::test(start_paused = true)]
async fn test_seek_clamps_to_duration() {
    let player = TestPlayer::with_tracks(tracks(1..=2));
    player.start_at(Category::All, 0).await;

    player.engine.seek_to(42.0);
    assert_eq!(player.current_output().position(), 42.0);
    assert_eq!(player.engine.snapshot().current_time, 42.0);

    player.engine.seek_to(900.0);
    assert_eq!(player.current_output().position(), 200.0);

    player.engine.seek_to(-5.0);
    assert_eq!(player.current_output().position(), 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_media_commands_drive_transport() {
    let player = TestPlayer::with_tracks(tracks(1..=3));
    player.start_at(Category::All, 0).await;

    player.engine.handle_media_command(MediaCommand::Play).await;
    assert!(player.engine.snapshot().is_playing, "play while playing is a no-op");

    player.engine.handle_media_command(MediaCommand::Pause).await;
    assert!(!player.engine.snapshot().is_playing);

    player.engine.handle_media_command(MediaCommand::PlayPause).await;
    assert!(player.engine.snapshot().is_playing);

    player.engine.handle_media_command(MediaCommand::SeekTo(30.0)).await;
    player.engine.handle_media_command(MediaCommand::SeekForward(None)).await;
    assert_eq!(player.current_output().position(), 40.0);
    player.engine.handle_media_command(MediaCommand::SeekBackward(Some(15.0))).await;
    assert_eq!(player.current_output().position(), 25.0);

    player.engine.handle_media_command(MediaCommand::Stop).await;
    assert!(!player.engine.snapshot().is_playing);
    assert_eq!(player.current_output().position(), 0.0);

    player.engine.handle_media_command(MediaCommand::Next).await;
    assert_eq!(player.current_id(), Some(2));
}

#[tokio::test(start_paused = true)]
async fn test_native_pause_syncs_session() {
    let player = TestPlayer::builder(FakeApi::new().with_catalog(Category::All, tracks(1..=2)))
        .lockscreen_quirks()
        .build();
    player.start_at(Category::All, 0).await;
    let published = player.media.states().len();

    player.send_current(OutputEventKind::Paused).await;
    assert!(!player.engine.snapshot().is_playing);
    assert_eq!(player.media.last_state(), Some(MediaPlaybackState::Paused));

    // Lock-screen quirk mode re-publishes even when nothing changed
    player.send_current(OutputEventKind::Paused).await;
    assert!(player.media.states().len() > published + 1);
}

#[tokio::test(start_paused = true)]
async fn test_progress_updates_session_and_media() {
    let mut player = TestPlayer::with_tracks(tracks(1..=2));
    player.start_at(Category::All, 0).await;

    player.time_update(12.5, 201.0).await;
    let snapshot = player.engine.snapshot();
    assert_eq!(snapshot.current_time, 12.5);
    assert_eq!(snapshot.duration, 201.0);

    let position = player.media.positions().pop().unwrap();
    assert_eq!(position.position, 12.5);
    assert!(player.drain_events().iter().any(|e| matches!(
        e,
        PlayerEvent::PlaybackProgress { position, .. } if *position == 12.5
    )));
}

#[tokio::test(start_paused = true)]
async fn test_playing_near_end_of_list_prefetches_next_page() {
    let player = TestPlayer::with_tracks(tracks(1..=100));
    player.start_at(Category::All, 37).await;
    settle().await;

    let requests = player.api.page_requests_for(Category::All);
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].page, 3);
    assert_eq!(player.engine.catalog().tracks(Category::All).len(), 60);
    assert!(player.engine.snapshot().has_more_tracks);
}

#[tokio::test(start_paused = true)]
async fn test_toggle_like_updates_current_track() {
    let player = TestPlayer::with_tracks(tracks(1..=2));
    player.start_at(Category::All, 0).await;

    assert_eq!(player.engine.toggle_like(None).await, Some(true));
    let current = player.engine.current_track().unwrap();
    assert!(current.is_liked);
    assert_eq!(current.likes_count, 1);
    assert_eq!(player.api.like_calls(), vec![TrackId(1)]);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_silences_and_clears_presence() {
    let player = TestPlayer::builder(FakeApi::new().with_catalog(Category::All, tracks(1..=2)))
        .presence(true)
        .build();
    player.start_at(Category::All, 0).await;
    settle().await;

    player.engine.shutdown().await;
    assert!(!player.engine.snapshot().is_playing);
    assert!(!player.current_output().is_playing());
    assert_eq!(player.api.clears(), 1);
    assert_eq!(
        player.engine.shared_state().playback_state(),
        PlaybackState::Paused
    );
}
