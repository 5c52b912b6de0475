//! User-driven catalog mutations: likes and uploads

use super::{CatalogState, TrackCatalog};
use crate::api::{ApiError, TrackUpload, UploadMetadata};
use crate::error::Result;
use kconnect_common::{Category, Track, TrackId};
use std::path::Path;
use tracing::{info, warn};

impl TrackCatalog {
    /// Flip the like state of `track_id`
    ///
    /// Applied optimistically to every list holding the track (and to the
    /// `liked` list), then reconciled with the server answer. A failed or
    /// refused request restores the previous state. Returns the confirmed
    /// like state, or `None` if the toggle did not stick.
    pub async fn toggle_like(&self, track_id: TrackId) -> Option<bool> {
        let (prior, liked_before, optimistic) = {
            let mut st = self.inner.lock();
            let Some(prior) = st.find(track_id) else {
                warn!(track_id = %track_id, "Cannot like unknown track");
                return None;
            };
            let liked_before = st.lists[Category::Liked].tracks().to_vec();
            let optimistic = !prior.is_liked;
            let count = if optimistic {
                prior.likes_count + 1
            } else {
                prior.likes_count.saturating_sub(1)
            };
            apply_like(&mut st, &prior, optimistic, count);
            (prior, liked_before, optimistic)
        };
        self.emit_current(Category::Liked);

        let outcome = match self.inner.api.toggle_like(track_id).await {
            Ok(response) if response.success => Ok(response),
            Ok(_) => Err(ApiError::Rejected("like not applied".to_string())),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(response) => {
                let count = response.likes_count.unwrap_or_else(|| {
                    if response.is_liked == prior.is_liked {
                        prior.likes_count
                    } else if response.is_liked {
                        prior.likes_count + 1
                    } else {
                        prior.likes_count.saturating_sub(1)
                    }
                });
                {
                    let mut st = self.inner.lock();
                    apply_like(&mut st, &prior, response.is_liked, count);
                }
                if response.is_liked != optimistic {
                    self.emit_current(Category::Liked);
                }
                info!(track_id = %track_id, liked = response.is_liked, "Like toggled");
                Some(response.is_liked)
            }
            Err(e) => {
                warn!(track_id = %track_id, "Like toggle failed, reverting: {}", e);
                {
                    let mut st = self.inner.lock();
                    apply_like(&mut st, &prior, prior.is_liked, prior.likes_count);
                    *st.lists[Category::Liked].tracks_mut() = liked_before;
                    st.liked_cache.confirmed_empty = st.lists[Category::Liked].is_empty();
                }
                self.emit_current(Category::Liked);
                None
            }
        }
    }

    /// Upload the audio file at `path` and surface the new track at the top
    /// of `all` and `new`
    pub async fn upload(&self, path: &Path, metadata: UploadMetadata) -> Result<Track> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        info!(file = %file_name, size = bytes.len(), "Uploading track");
        let response = self
            .inner
            .api
            .upload_track(TrackUpload {
                file_name,
                bytes,
                metadata,
            })
            .await?;
        let track = response
            .track
            .ok_or_else(|| ApiError::Parse("upload response carried no track".to_string()))?;

        {
            let mut st = self.inner.lock();
            for category in [Category::All, Category::New] {
                let list = &mut st.lists[category];
                if list.position(track.id).is_none() {
                    list.tracks_mut().insert(0, track.clone());
                }
            }
        }
        self.emit_current(Category::All);
        self.emit_current(Category::New);

        info!(track_id = %track.id, title = %track.title, "Upload complete");
        Ok(track)
    }
}

/// Set like fields on every copy of `template` and keep `liked` in step
fn apply_like(st: &mut CatalogState, template: &Track, liked: bool, likes_count: u64) {
    for (_, list) in st.lists.iter_mut() {
        for track in list.tracks_mut().iter_mut().filter(|t| t.id == template.id) {
            track.is_liked = liked;
            track.likes_count = likes_count;
        }
    }

    let liked_list = &mut st.lists[Category::Liked];
    match (liked, liked_list.position(template.id)) {
        (true, None) => {
            let mut track = template.clone();
            track.is_liked = true;
            track.likes_count = likes_count;
            liked_list.tracks_mut().insert(0, track);
        }
        (false, Some(index)) => {
            liked_list.tracks_mut().remove(index);
        }
        _ => {}
    }
    st.liked_cache.confirmed_empty = st.lists[Category::Liked].is_empty();
}
