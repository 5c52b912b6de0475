//! One category's ordered track list with its pagination cursor

use kconnect_common::{Track, TrackId};
use std::collections::HashSet;

/// Ordered tracks for one category plus pagination state
///
/// The page cursor only moves forward; `has_more = false` sticks until the
/// list is explicitly reset.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryList {
    tracks: Vec<Track>,
    page: u32,
    has_more: bool,
}

impl CategoryList {
    /// Empty list, cursor on page 1, more pages assumed
    pub fn new() -> Self {
        Self {
            tracks: Vec::new(),
            page: 1,
            has_more: true,
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Current page cursor (≥1)
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Index of the track with `id`
    pub fn position(&self, id: TrackId) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == id)
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// True before the first page has landed
    pub fn awaiting_first_page(&self) -> bool {
        self.page == 1 && self.tracks.is_empty()
    }

    /// Replace everything (initial load, reset, liked refresh)
    pub(crate) fn replace(&mut self, tracks: Vec<Track>, page: u32, has_more: bool) {
        self.tracks = tracks;
        self.page = page.max(1);
        self.has_more = has_more;
    }

    /// Append a page, skipping tracks already present; returns how many landed
    pub(crate) fn append(&mut self, tracks: Vec<Track>, page: u32, has_more: bool) -> usize {
        let mut seen: HashSet<TrackId> = self.tracks.iter().map(|t| t.id).collect();
        let before = self.tracks.len();
        self.tracks
            .extend(tracks.into_iter().filter(|t| seen.insert(t.id)));
        self.page = self.page.max(page);
        self.has_more = has_more;
        self.tracks.len() - before
    }

    /// Mark the list exhausted (404 on pagination)
    pub(crate) fn mark_exhausted(&mut self) {
        self.has_more = false;
    }

    pub(crate) fn tracks_mut(&mut self) -> &mut Vec<Track> {
        &mut self.tracks
    }
}

impl Default for CategoryList {
    fn default() -> Self {
        Self::new()
    }
}
