//! REST backend access
//!
//! The playback core only talks to the backend through [`MusicApi`], so tests
//! and alternative transports can stand in for the HTTP client.

mod client;
mod types;

pub use client::HttpMusicApi;
pub use types::{
    LikeResponse, LikedTracks, NowPlaying, PageRequest, SearchResponse, TrackPage, TrackUpload,
    UploadMetadata, UploadResponse,
};

use async_trait::async_trait;
use kconnect_common::{Track, TrackId};
use thiserror::Error;

/// Backend client errors
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Transport-level failure (connect, timeout, TLS)
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP 404; for pagination this means "no more pages"
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other non-success status
    #[error("API error {0}: {1}")]
    Status(u16, String),

    /// Body did not match the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Server answered `success: false`
    #[error("Rejected: {0}")]
    Rejected(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

/// Logical backend operations used by the playback core
#[async_trait]
pub trait MusicApi: Send + Sync {
    /// `GET /music?page,per_page,sort,random,nocache`
    async fn fetch_page(&self, request: &PageRequest) -> Result<TrackPage, ApiError>;

    /// `GET /music/liked` (full list, cache-busting)
    async fn fetch_liked(&self) -> Result<Vec<Track>, ApiError>;

    /// `GET /music/search?query`
    async fn search(&self, query: &str) -> Result<Vec<Track>, ApiError>;

    /// `POST /music/{id}/play`
    async fn record_play(&self, track_id: TrackId) -> Result<(), ApiError>;

    /// `POST /music/{id}/like`
    async fn toggle_like(&self, track_id: TrackId) -> Result<LikeResponse, ApiError>;

    /// `POST /user/now-playing`
    async fn set_now_playing(&self, status: &NowPlaying) -> Result<(), ApiError>;

    /// `POST /user/clear-now-playing`
    async fn clear_now_playing(&self) -> Result<(), ApiError>;

    /// `POST /music/upload`
    async fn upload_track(&self, upload: TrackUpload) -> Result<UploadResponse, ApiError>;
}
