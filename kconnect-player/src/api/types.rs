//! Wire types for the K-Connect music endpoints

use kconnect_common::{Category, Track, TrackId};
use serde::{Deserialize, Serialize};

/// `GET /music` response
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TrackPage {
    #[serde(default)]
    pub tracks: Vec<Track>,
    /// Explicit "more pages" flag (newer backends)
    #[serde(default)]
    pub has_more: Option<bool>,
    /// Total page count (older backends)
    #[serde(default)]
    pub pages: Option<u32>,
}

impl TrackPage {
    /// Whether pages exist after `request`
    ///
    /// Prefers `has_more`, then `pages`, then "the page came back full".
    pub fn has_more_after(&self, request: &PageRequest) -> bool {
        if let Some(has_more) = self.has_more {
            return has_more;
        }
        if let Some(pages) = self.pages {
            return pages > request.page;
        }
        self.tracks.len() >= request.per_page as usize
    }
}

/// `GET /music/liked` response (always the full list)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LikedTracks {
    #[serde(default)]
    pub tracks: Vec<Track>,
}

/// `GET /music/search` response
///
/// Some deployments return a bare array, others wrap it.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SearchResponse {
    List(Vec<Track>),
    Wrapped {
        #[serde(default)]
        tracks: Vec<Track>,
    },
}

impl SearchResponse {
    pub fn into_tracks(self) -> Vec<Track> {
        match self {
            SearchResponse::List(tracks) => tracks,
            SearchResponse::Wrapped { tracks } => tracks,
        }
    }
}

/// `POST /music/{id}/like` response
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LikeResponse {
    pub success: bool,
    pub is_liked: bool,
    #[serde(default)]
    pub likes_count: Option<u64>,
}

/// `POST /user/now-playing` body
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NowPlaying {
    pub track_id: TrackId,
    pub artist: String,
    pub title: String,
}

impl NowPlaying {
    pub fn for_track(track: &Track) -> Self {
        Self {
            track_id: track.id,
            artist: track.artist.clone(),
            title: track.title.clone(),
        }
    }
}

/// Metadata fields sent with an upload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadMetadata {
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Multipart upload payload
#[derive(Debug, Clone)]
pub struct TrackUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub metadata: UploadMetadata,
}

/// `POST /music/upload` response
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    #[serde(default)]
    pub track: Option<Track>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Query parameters for one `GET /music` page
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub category: Category,
    pub page: u32,
    pub per_page: u32,
    pub sort: Option<&'static str>,
    pub random: bool,
    /// Cache-busting timestamp (random pages only)
    pub nocache: Option<i64>,
}

impl PageRequest {
    /// Build the request for `category`
    pub fn new(category: Category, page: u32, per_page: u32) -> Self {
        let (sort, random) = match category {
            Category::Popular => (Some("popular"), false),
            Category::New => (Some("date"), false),
            Category::Random => (None, true),
            Category::All | Category::Liked | Category::Search => (None, false),
        };
        Self {
            category,
            page,
            per_page,
            sort,
            random,
            nocache: random.then(|| chrono::Utc::now().timestamp_millis()),
        }
    }

    /// Query string pairs in the order the backend logs them
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("per_page", self.per_page.to_string()),
        ];
        if let Some(sort) = self.sort {
            pairs.push(("sort", sort.to_string()));
        }
        if self.random {
            pairs.push(("random", "true".to_string()));
        }
        if let Some(nocache) = self.nocache {
            pairs.push(("nocache", nocache.to_string()));
        }
        pairs
    }
}
