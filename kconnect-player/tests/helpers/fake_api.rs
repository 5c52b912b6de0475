//! Scripted in-memory backend
//!
//! Serves per-category catalogs page by page, records every call, and can be
//! told to fail, delay, or answer 404 past the end.

use async_trait::async_trait;
use kconnect_common::{Category, Track, TrackId};
use kconnect_player::api::{
    ApiError, LikeResponse, MusicApi, NowPlaying, PageRequest, TrackPage, TrackUpload,
    UploadResponse,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

pub fn track(id: u64) -> Track {
    Track {
        id: TrackId(id),
        title: format!("Track {}", id),
        artist: format!("Artist {}", id % 7),
        album: None,
        duration: 200.0,
        file_path: format!("/music/{}.mp3", id),
        cover_path: format!("/covers/{}.jpg", id),
        is_liked: false,
        likes_count: 0,
        plays_count: 0,
    }
}

pub fn tracks(ids: std::ops::RangeInclusive<u64>) -> Vec<Track> {
    ids.map(track).collect()
}

pub fn ids(tracks: &[Track]) -> Vec<u64> {
    tracks.iter().map(|t| t.id.0).collect()
}

#[derive(Default)]
struct ApiState {
    catalogs: HashMap<Category, Vec<Track>>,
    /// Always answer `has_more: true` (backend that only signals the end with 404)
    advertise_more: bool,
    not_found_past_end: bool,
    failing_pages: HashSet<Category>,
    liked: Vec<Track>,
    liked_ids: HashSet<TrackId>,
    search_results: Vec<Track>,
    like_script: VecDeque<Result<LikeResponse, ApiError>>,
    fail_presence: bool,
    delay: Duration,

    page_requests: Vec<PageRequest>,
    liked_calls: usize,
    search_calls: Vec<String>,
    plays: Vec<TrackId>,
    now_playing: Vec<NowPlaying>,
    clears: usize,
    like_calls: Vec<TrackId>,
    uploads: Vec<TrackUpload>,
}

#[derive(Default)]
pub struct FakeApi {
    state: Mutex<ApiState>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ApiState> {
        self.state.lock().unwrap()
    }

    pub fn with_catalog(self, category: Category, tracks: Vec<Track>) -> Self {
        self.set_catalog(category, tracks);
        self
    }

    pub fn with_liked(self, tracks: Vec<Track>) -> Self {
        self.set_liked(tracks);
        self
    }

    pub fn with_search_results(self, tracks: Vec<Track>) -> Self {
        self.lock().search_results = tracks;
        self
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        self.lock().delay = delay;
        self
    }

    pub fn advertising_more(self) -> Self {
        self.lock().advertise_more = true;
        self
    }

    pub fn not_found_past_end(self) -> Self {
        self.lock().not_found_past_end = true;
        self
    }

    pub fn set_catalog(&self, category: Category, tracks: Vec<Track>) {
        self.lock().catalogs.insert(category, tracks);
    }

    pub fn set_liked(&self, tracks: Vec<Track>) {
        let mut st = self.lock();
        st.liked_ids = tracks.iter().map(|t| t.id).collect();
        st.liked = tracks;
    }

    pub fn fail_pages(&self, category: Category) {
        self.lock().failing_pages.insert(category);
    }

    pub fn fail_presence(&self) {
        self.lock().fail_presence = true;
    }

    pub fn script_like(&self, response: Result<LikeResponse, ApiError>) {
        self.lock().like_script.push_back(response);
    }

    pub fn page_requests(&self) -> Vec<PageRequest> {
        self.lock().page_requests.clone()
    }

    pub fn page_requests_for(&self, category: Category) -> Vec<PageRequest> {
        self.page_requests()
            .into_iter()
            .filter(|r| r.category == category)
            .collect()
    }

    pub fn liked_calls(&self) -> usize {
        self.lock().liked_calls
    }

    pub fn search_calls(&self) -> Vec<String> {
        self.lock().search_calls.clone()
    }

    pub fn plays(&self) -> Vec<TrackId> {
        self.lock().plays.clone()
    }

    pub fn now_playing(&self) -> Vec<NowPlaying> {
        self.lock().now_playing.clone()
    }

    pub fn clears(&self) -> usize {
        self.lock().clears
    }

    pub fn like_calls(&self) -> Vec<TrackId> {
        self.lock().like_calls.clone()
    }

    pub fn uploads(&self) -> Vec<TrackUpload> {
        self.lock().uploads.clone()
    }

    async fn pause(&self) {
        let delay = self.lock().delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl MusicApi for FakeApi {
    async fn fetch_page(&self, request: &PageRequest) -> Result<TrackPage, ApiError> {
        self.lock().page_requests.push(request.clone());
        self.pause().await;

        let st = self.lock();
        if st.failing_pages.contains(&request.category) {
            return Err(ApiError::Network("connection reset".to_string()));
        }
        let all = st.catalogs.get(&request.category).cloned().unwrap_or_default();
        let per_page = request.per_page as usize;
        let start = (request.page.saturating_sub(1) as usize) * per_page;
        if start >= all.len() && st.not_found_past_end {
            return Err(ApiError::NotFound(format!("/music?page={}", request.page)));
        }
        let end = (start + per_page).min(all.len());
        let tracks = all.get(start..end).map(<[Track]>::to_vec).unwrap_or_default();
        Ok(TrackPage {
            tracks,
            has_more: Some(st.advertise_more || end < all.len()),
            pages: None,
        })
    }

    async fn fetch_liked(&self) -> Result<Vec<Track>, ApiError> {
        self.lock().liked_calls += 1;
        self.pause().await;
        Ok(self.lock().liked.clone())
    }

    async fn search(&self, query: &str) -> Result<Vec<Track>, ApiError> {
        self.lock().search_calls.push(query.to_string());
        self.pause().await;
        Ok(self.lock().search_results.clone())
    }

    async fn record_play(&self, track_id: TrackId) -> Result<(), ApiError> {
        let mut st = self.lock();
        st.plays.push(track_id);
        if st.fail_presence {
            return Err(ApiError::Status(500, "boom".to_string()));
        }
        Ok(())
    }

    async fn toggle_like(&self, track_id: TrackId) -> Result<LikeResponse, ApiError> {
        self.lock().like_calls.push(track_id);
        self.pause().await;

        let mut st = self.lock();
        if let Some(scripted) = st.like_script.pop_front() {
            return scripted;
        }
        let is_liked = if st.liked_ids.remove(&track_id) {
            false
        } else {
            st.liked_ids.insert(track_id);
            true
        };
        Ok(LikeResponse {
            success: true,
            is_liked,
            likes_count: None,
        })
    }

    async fn set_now_playing(&self, status: &NowPlaying) -> Result<(), ApiError> {
        let mut st = self.lock();
        st.now_playing.push(status.clone());
        if st.fail_presence {
            return Err(ApiError::Network("offline".to_string()));
        }
        Ok(())
    }

    async fn clear_now_playing(&self) -> Result<(), ApiError> {
        let mut st = self.lock();
        st.clears += 1;
        if st.fail_presence {
            return Err(ApiError::Network("offline".to_string()));
        }
        Ok(())
    }

    async fn upload_track(&self, upload: TrackUpload) -> Result<UploadResponse, ApiError> {
        let mut created = track(9000 + self.lock().uploads.len() as u64);
        created.title = upload.metadata.title.clone();
        created.artist = upload.metadata.artist.clone();
        self.lock().uploads.push(upload);
        Ok(UploadResponse {
            success: true,
            track: Some(created),
            message: None,
        })
    }
}
