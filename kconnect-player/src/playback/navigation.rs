//! Navigation Resolver
//!
//! Computes the next/previous track within the active category and keeps
//! pagination one step ahead of the listener.
//!
//! **Pagination triggers** (checked on every resolution):
//! - near end: the current index is within the last [`NEAR_END`] entries
//! - page boundary: the index is within [`BOUNDARY_RADIUS`] of a multiple of
//!   [`PAGE_SPREAD`], which spreads requests through the list
//! - near start (previous only): the index is at most [`NEAR_START`]
//!
//! "Next" at the true end of a list awaits the pending page before deciding
//! to loop. "Previous" never waits.

use crate::catalog::TrackCatalog;
use kconnect_common::{Category, Track};
use tracing::debug;

/// Pagination spread interval
pub const PAGE_SPREAD: usize = 15;

/// Distance from a spread boundary that still counts as "near"
pub const BOUNDARY_RADIUS: usize = 2;

/// Entries from the end that count as "nearing end"
pub const NEAR_END: usize = 3;

/// Highest index that counts as "nearing start"
pub const NEAR_START: usize = 2;

/// `index` sits within [`BOUNDARY_RADIUS`] of a non-zero multiple of
/// [`PAGE_SPREAD`]
pub fn near_page_boundary(index: usize) -> bool {
    if index + BOUNDARY_RADIUS < PAGE_SPREAD {
        return false;
    }
    let rem = index % PAGE_SPREAD;
    rem <= BOUNDARY_RADIUS || rem >= PAGE_SPREAD - BOUNDARY_RADIUS
}

/// `index` is among the last [`NEAR_END`] entries of a `len`-long list
pub fn near_end(index: usize, len: usize) -> bool {
    index + NEAR_END >= len
}

/// Resolves neighbors in the catalog's category lists
#[derive(Clone)]
pub struct Navigator {
    catalog: TrackCatalog,
}

impl Navigator {
    pub fn new(catalog: TrackCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &TrackCatalog {
        &self.catalog
    }

    /// Track after `current` in `category`
    ///
    /// Falls back to the first track when `current` is not in the list.
    /// At the true end with more pages, awaits the in-flight (or a fresh)
    /// pagination and returns the first newly appended track; otherwise
    /// loops to the start. Loads the category if its list is empty.
    pub async fn resolve_next(&self, current: Option<&Track>, category: Category) -> Option<Track> {
        let list = self.catalog.snapshot(category);
        if list.tracks.is_empty() {
            debug!(category = %category, "Empty list, loading category for next");
            return self.catalog.load_category(category).await.into_iter().next();
        }

        let Some(index) = current.and_then(|c| list.tracks.iter().position(|t| t.id == c.id)) else {
            return list.tracks.first().cloned();
        };

        if index + 1 < list.tracks.len() {
            if list.has_more && (near_end(index, list.tracks.len()) || near_page_boundary(index)) {
                self.spawn_load_more(category);
            }
            return list.tracks.get(index + 1).cloned();
        }

        if list.has_more {
            let old_len = list.tracks.len();
            if self.catalog.is_loading_more() {
                debug!(category = %category, "End of list, waiting for pending page");
                self.catalog.wait_for_pagination().await;
                // The settled page may have belonged to another category
                if self.catalog.tracks(category).len() == old_len
                    && self.catalog.has_more(category)
                {
                    self.catalog.load_more(category).await;
                }
            } else {
                debug!(category = %category, "End of list, fetching next page");
                self.catalog.load_more(category).await;
            }
            let tracks = self.catalog.tracks(category);
            if tracks.len() > old_len {
                return tracks.get(old_len).cloned();
            }
            return tracks.first().cloned();
        }

        list.tracks.first().cloned()
    }

    /// Track before `current` in `category`, looping to the last track
    ///
    /// Never waits on the network; backward pagination is best-effort.
    pub fn resolve_previous(&self, current: Option<&Track>, category: Category) -> Option<Track> {
        let list = self.catalog.snapshot(category);
        let last = list.tracks.last().cloned();

        let Some(index) = current.and_then(|c| list.tracks.iter().position(|t| t.id == c.id)) else {
            return last;
        };

        if list.has_more && (index <= NEAR_START || near_page_boundary(index)) {
            self.catalog.spawn_preload(category);
        }

        if index == 0 {
            last
        } else {
            list.tracks.get(index - 1).cloned()
        }
    }

    /// Kick background pagination if `track` sits near a trigger point
    ///
    /// Called when a track starts playing, so pagination runs ahead of the
    /// listener even without any explicit skip.
    pub fn prefetch_around(&self, track: &Track, category: Category) {
        let list = self.catalog.snapshot(category);
        if !list.has_more {
            return;
        }
        let Some(index) = list.tracks.iter().position(|t| t.id == track.id) else {
            return;
        };
        if near_end(index, list.tracks.len()) || near_page_boundary(index) {
            debug!(category = %category, index, "Prefetching next page");
            self.catalog.spawn_preload(category);
        }
    }

    fn spawn_load_more(&self, category: Category) {
        let catalog = self.catalog.clone();
        tokio::spawn(async move {
            catalog.load_more(category).await;
        });
    }
}
