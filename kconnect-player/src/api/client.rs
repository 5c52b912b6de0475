//! reqwest-backed [`MusicApi`] implementation

use super::{
    ApiError, LikeResponse, LikedTracks, MusicApi, NowPlaying, PageRequest, SearchResponse,
    TrackPage, TrackUpload, UploadResponse,
};
use crate::config::ApiConfig;
use async_trait::async_trait;
use kconnect_common::{Track, TrackId};
use reqwest::{header, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("kconnect-player/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the K-Connect REST backend
pub struct HttpMusicApi {
    http_client: reqwest::Client,
    base_url: String,
    session_token: Option<String>,
}

impl HttpMusicApi {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session_token: config.session_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http_client.request(method, self.url(path));
        match &self.session_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        let url = response.url().to_string();

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(url));
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ApiError::Status(status.as_u16(), error_text));
        }

        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        self.send(builder)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }
}

#[async_trait]
impl MusicApi for HttpMusicApi {
    async fn fetch_page(&self, request: &PageRequest) -> Result<TrackPage, ApiError> {
        debug!(
            category = %request.category,
            page = request.page,
            per_page = request.per_page,
            "Fetching track page"
        );
        let builder = self
            .request(Method::GET, "music")
            .query(&request.query_pairs());
        self.send_json(builder).await
    }

    async fn fetch_liked(&self) -> Result<Vec<Track>, ApiError> {
        let builder = self
            .request(Method::GET, "music/liked")
            .query(&[("_", chrono::Utc::now().timestamp_millis().to_string())])
            .header(header::CACHE_CONTROL, "no-cache, no-store, must-revalidate")
            .header(header::PRAGMA, "no-cache")
            .header(header::EXPIRES, "0");
        let liked: LikedTracks = self.send_json(builder).await?;
        Ok(liked.tracks)
    }

    async fn search(&self, query: &str) -> Result<Vec<Track>, ApiError> {
        let builder = self
            .request(Method::GET, "music/search")
            .query(&[("query", query)]);
        let response: SearchResponse = self.send_json(builder).await?;
        Ok(response.into_tracks())
    }

    async fn record_play(&self, track_id: TrackId) -> Result<(), ApiError> {
        let builder = self.request(Method::POST, &format!("music/{}/play", track_id));
        self.send(builder).await.map(|_| ())
    }

    async fn toggle_like(&self, track_id: TrackId) -> Result<LikeResponse, ApiError> {
        let builder = self.request(Method::POST, &format!("music/{}/like", track_id));
        self.send_json(builder).await
    }

    async fn set_now_playing(&self, status: &NowPlaying) -> Result<(), ApiError> {
        let builder = self.request(Method::POST, "user/now-playing").json(status);
        self.send(builder).await.map(|_| ())
    }

    async fn clear_now_playing(&self) -> Result<(), ApiError> {
        let builder = self.request(Method::POST, "user/clear-now-playing");
        self.send(builder).await.map(|_| ())
    }

    async fn upload_track(&self, upload: TrackUpload) -> Result<UploadResponse, ApiError> {
        let TrackUpload {
            file_name,
            bytes,
            metadata,
        } = upload;

        let mut form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name),
            )
            .text("title", metadata.title)
            .text("artist", metadata.artist);
        if let Some(album) = metadata.album {
            form = form.text("album", album);
        }
        if let Some(genre) = metadata.genre {
            form = form.text("genre", genre);
        }
        if let Some(description) = metadata.description {
            form = form.text("description", description);
        }

        let builder = self.request(Method::POST, "music/upload").multipart(form);
        let response: UploadResponse = self.send_json(builder).await?;
        if !response.success {
            return Err(ApiError::Rejected(
                response.message.unwrap_or_else(|| "upload rejected".to_string()),
            ));
        }
        Ok(response)
    }
}
