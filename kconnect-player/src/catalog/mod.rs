//! Track Catalog Cache
//!
//! In-memory, per-category ordered track lists with independent pagination.
//! This is the leaf of the playback core: the engine and the navigator only
//! read lists, every mutation happens here.
//!
//! **Mutual exclusion:** plain busy flags checked before a request starts and
//! cleared by a drop guard, so they reset on success, failure and task
//! cancellation alike. The state mutex is never held across an await.
//!
//! **Staleness:** every request takes a per-category generation number; a
//! response is applied only if no newer request for that category was issued
//! in the meantime.

mod list;
mod mutations;

pub use list::CategoryList;

use crate::api::{MusicApi, PageRequest};
use crate::config::CatalogConfig;
use kconnect_common::events::{EventBus, PlayerEvent};
use kconnect_common::{Category, CategoryMap, Track, TrackId};
use rand::seq::SliceRandom;
use rand::Rng;
use std::ops::RangeInclusive;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Tracks requested for a category's first page
pub const INITIAL_PAGE_SIZE: u32 = 40;

/// Tracks requested per incremental page
pub const LOAD_MORE_PAGE_SIZE: u32 = 20;

/// Liked list freshness after a non-empty result
pub const LIKED_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Liked list freshness after a confirmed-empty result
pub const LIKED_EMPTY_CACHE_TTL: Duration = Duration::from_secs(15 * 60);

/// Minimum spacing of navigation-triggered preloads per category
pub const PRELOAD_THROTTLE: Duration = Duration::from_secs(30);

/// Background prefetch delay after a full page (milliseconds)
const PREFETCH_DELAY_MS: RangeInclusive<u64> = 1000..=2000;

/// Catalog behavior switches
#[derive(Debug, Clone)]
pub struct CatalogOptions {
    /// Schedule an automatic `load_more` after every full page
    pub background_prefetch: bool,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            background_prefetch: true,
        }
    }
}

impl From<&CatalogConfig> for CatalogOptions {
    fn from(config: &CatalogConfig) -> Self {
        Self {
            background_prefetch: config.background_prefetch,
        }
    }
}

/// Point-in-time copy of one category list
#[derive(Debug, Clone, PartialEq)]
pub struct ListSnapshot {
    pub tracks: Vec<Track>,
    pub page: u32,
    pub has_more: bool,
}

#[derive(Debug, Clone, Default)]
struct LikedCache {
    last_loaded: Option<Instant>,
    checked: bool,
    confirmed_empty: bool,
}

impl LikedCache {
    fn is_fresh(&self) -> bool {
        if !self.checked {
            return false;
        }
        let ttl = if self.confirmed_empty {
            LIKED_EMPTY_CACHE_TTL
        } else {
            LIKED_CACHE_TTL
        };
        self.last_loaded.is_some_and(|at| at.elapsed() < ttl)
    }

    fn record(&mut self, empty: bool) {
        self.last_loaded = Some(Instant::now());
        self.checked = true;
        self.confirmed_empty = empty;
    }
}

#[derive(Debug, Clone, Copy)]
enum Flag {
    LoadingMore,
    LoadingLiked,
    Searching,
    Loading(Category),
}

struct CatalogState {
    lists: CategoryMap<CategoryList>,
    /// Latest request generation issued per category
    generations: CategoryMap<u64>,
    loading: CategoryMap<bool>,
    loading_more: bool,
    loading_liked: bool,
    searching: bool,
    liked_cache: LikedCache,
    last_preload: CategoryMap<Option<Instant>>,
}

impl CatalogState {
    fn new() -> Self {
        Self {
            lists: CategoryMap::default(),
            generations: CategoryMap::default(),
            loading: CategoryMap::default(),
            loading_more: false,
            loading_liked: false,
            searching: false,
            liked_cache: LikedCache::default(),
            last_preload: CategoryMap::default(),
        }
    }

    fn flag_mut(&mut self, flag: Flag) -> &mut bool {
        match flag {
            Flag::LoadingMore => &mut self.loading_more,
            Flag::LoadingLiked => &mut self.loading_liked,
            Flag::Searching => &mut self.searching,
            Flag::Loading(category) => &mut self.loading[category],
        }
    }

    fn issue(&mut self, category: Category) -> u64 {
        self.generations[category] += 1;
        self.generations[category]
    }

    fn is_current(&self, category: Category, generation: u64) -> bool {
        self.generations[category] == generation
    }

    fn find(&self, id: TrackId) -> Option<Track> {
        self.lists
            .iter()
            .find_map(|(_, list)| list.position(id).and_then(|i| list.get(i).cloned()))
    }
}

struct CatalogInner {
    api: Arc<dyn MusicApi>,
    state: Mutex<CatalogState>,
    events: EventBus,
    options: CatalogOptions,
    pagination_settled: Notify,
}

impl CatalogInner {
    fn lock(&self) -> MutexGuard<'_, CatalogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears a busy flag when dropped
struct FlagGuard<'a> {
    inner: &'a CatalogInner,
    flag: Flag,
}

impl<'a> FlagGuard<'a> {
    fn new(inner: &'a CatalogInner, flag: Flag) -> Self {
        Self { inner, flag }
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        *self.inner.lock().flag_mut(self.flag) = false;
        if matches!(self.flag, Flag::LoadingMore) {
            self.inner.pagination_settled.notify_waiters();
        }
    }
}

/// Shared handle to the track catalog
///
/// Cheap to clone; all clones see the same lists.
#[derive(Clone)]
pub struct TrackCatalog {
    inner: Arc<CatalogInner>,
}

impl TrackCatalog {
    pub fn new(api: Arc<dyn MusicApi>, events: EventBus, options: CatalogOptions) -> Self {
        Self {
            inner: Arc::new(CatalogInner {
                api,
                state: Mutex::new(CatalogState::new()),
                events,
                options,
                pagination_settled: Notify::new(),
            }),
        }
    }

    /// Tracks for `category`, fetching the first page if the list is empty
    ///
    /// A populated list short-circuits without a request. `liked` instead
    /// honors its freshness window, and `search` only ever returns what the
    /// last [`search`](Self::search) produced. Failures are logged and leave
    /// the list as it was.
    pub async fn load_category(&self, category: Category) -> Vec<Track> {
        match category {
            Category::Liked => return self.load_liked(false).await,
            Category::Search => return self.tracks(Category::Search),
            _ => {}
        }

        let cached = {
            let st = self.inner.lock();
            let list = &st.lists[category];
            if !list.is_empty() || st.loading[category] {
                Some(list.tracks().to_vec())
            } else {
                None
            }
        };
        if let Some(tracks) = cached {
            debug!(category = %category, count = tracks.len(), "Category already populated");
            return tracks;
        }

        self.fetch_first_page(category, category == Category::Random)
            .await;
        self.tracks(category)
    }

    /// Append the next page of `category`
    ///
    /// Returns true if any new tracks landed. Serialized across all
    /// categories: a call while another pagination is in flight is a no-op.
    /// For `liked` the whole list is refetched and replaced.
    pub async fn load_more(&self, category: Category) -> bool {
        let (generation, request) = {
            let mut st = self.inner.lock();
            if st.loading_more {
                debug!(category = %category, "Pagination already in flight, skipping");
                return false;
            }
            let list = &st.lists[category];
            match category {
                Category::Search => return false,
                // The backend always serves the whole liked list
                Category::Liked if st.loading_liked => return false,
                Category::Liked => {}
                // A first page or reset in flight will replace the list
                _ if st.loading[category] => {
                    debug!(category = %category, "First page in flight, skipping pagination");
                    return false;
                }
                _ if list.awaiting_first_page() => {
                    debug!(category = %category, "First page not loaded yet, skipping pagination");
                    return false;
                }
                _ if !list.has_more() => return false,
                _ => {}
            }
            let next_page = list.len() as u32 / LOAD_MORE_PAGE_SIZE + 1;
            st.loading_more = true;
            (
                st.issue(category),
                PageRequest::new(category, next_page, LOAD_MORE_PAGE_SIZE),
            )
        };
        let _guard = FlagGuard::new(&self.inner, Flag::LoadingMore);

        if category == Category::Liked {
            return self.refresh_liked_in_place(generation).await;
        }

        let result = self.inner.api.fetch_page(&request).await;

        let (appended, track_count, has_more, full_page) = {
            let mut st = self.inner.lock();
            if !st.is_current(category, generation) {
                debug!(category = %category, "Discarding superseded page response");
                return false;
            }
            let list = &mut st.lists[category];
            match result {
                Ok(page) => {
                    let has_more = page.has_more_after(&request);
                    let mut tracks = page.tracks;
                    let full_page = tracks.len() >= LOAD_MORE_PAGE_SIZE as usize;
                    if category == Category::Random {
                        tracks.shuffle(&mut rand::thread_rng());
                    }
                    let appended = list.append(tracks, request.page, has_more);
                    (appended, list.len(), has_more, full_page)
                }
                Err(e) if e.is_not_found() => {
                    info!(category = %category, page = request.page, "No more pages");
                    list.mark_exhausted();
                    (0, list.len(), false, false)
                }
                Err(e) => {
                    warn!(category = %category, page = request.page, "Failed to load more tracks: {}", e);
                    return false;
                }
            }
        };

        debug!(
            category = %category,
            page = request.page,
            appended,
            total = track_count,
            has_more,
            "Loaded more tracks"
        );
        self.emit_updated(category, track_count, has_more);
        if appended > 0 && full_page && has_more {
            self.schedule_prefetch(category);
        }
        appended > 0
    }

    /// Refetch the first page of `category`, replacing the whole list
    ///
    /// `randomize` shuffles the fresh page client-side (`random` always is).
    /// Returns true if the fetch succeeded.
    pub async fn reset_pagination(&self, category: Category, randomize: bool) -> bool {
        {
            let mut st = self.inner.lock();
            st.last_preload[category] = None;
            if category == Category::Liked {
                st.liked_cache = LikedCache::default();
            }
        }

        match category {
            Category::Liked => {
                self.load_liked(true).await;
                self.inner.lock().liked_cache.checked
            }
            Category::Search => {
                self.replace_search(Vec::new());
                true
            }
            _ => {
                self.fetch_first_page(category, randomize || category == Category::Random)
                    .await
            }
        }
    }

    /// Navigation-triggered pagination, at most once per category per
    /// [`PRELOAD_THROTTLE`]
    pub async fn preload_next_page(&self, category: Category) -> bool {
        {
            let mut st = self.inner.lock();
            if let Some(last) = st.last_preload[category] {
                if last.elapsed() < PRELOAD_THROTTLE {
                    debug!(category = %category, "Preload throttled");
                    return false;
                }
            }
            if !st.lists[category].has_more() {
                return false;
            }
            st.last_preload[category] = Some(Instant::now());
        }
        self.load_more(category).await
    }

    /// Fire-and-forget [`preload_next_page`](Self::preload_next_page)
    pub fn spawn_preload(&self, category: Category) {
        let catalog = self.clone();
        tokio::spawn(async move {
            catalog.preload_next_page(category).await;
        });
    }

    /// Wait until no pagination is in flight
    pub async fn wait_for_pagination(&self) {
        let notified = self.inner.pagination_settled.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if !self.is_loading_more() {
            return;
        }
        notified.await;
    }

    /// Run a search and make the result the `search` list
    ///
    /// A blank query clears the list without a request.
    pub async fn search(&self, query: &str) -> Vec<Track> {
        let query = query.trim();
        if query.is_empty() {
            self.replace_search(Vec::new());
            return Vec::new();
        }

        let generation = {
            let mut st = self.inner.lock();
            st.searching = true;
            st.issue(Category::Search)
        };
        let _guard = FlagGuard::new(&self.inner, Flag::Searching);

        let result = self.inner.api.search(query).await;

        let applied = {
            let mut st = self.inner.lock();
            if !st.is_current(Category::Search, generation) {
                false
            } else {
                match result {
                    Ok(tracks) => {
                        st.lists[Category::Search].replace(tracks, 1, false);
                        true
                    }
                    Err(e) => {
                        warn!(query = %query, "Search failed: {}", e);
                        false
                    }
                }
            }
        };
        if applied {
            self.emit_current(Category::Search);
        }
        self.tracks(Category::Search)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn tracks(&self, category: Category) -> Vec<Track> {
        self.inner.lock().lists[category].tracks().to_vec()
    }

    pub fn snapshot(&self, category: Category) -> ListSnapshot {
        let st = self.inner.lock();
        let list = &st.lists[category];
        ListSnapshot {
            tracks: list.tracks().to_vec(),
            page: list.page(),
            has_more: list.has_more(),
        }
    }

    pub fn has_more(&self, category: Category) -> bool {
        self.inner.lock().lists[category].has_more()
    }

    pub fn page(&self, category: Category) -> u32 {
        self.inner.lock().lists[category].page()
    }

    pub fn is_loading(&self, category: Category) -> bool {
        self.inner.lock().loading[category]
    }

    pub fn is_loading_more(&self) -> bool {
        self.inner.lock().loading_more
    }

    pub fn is_loading_liked(&self) -> bool {
        self.inner.lock().loading_liked
    }

    pub fn is_searching(&self) -> bool {
        self.inner.lock().searching
    }

    /// First copy of track `id` in any list
    pub fn find_track(&self, id: TrackId) -> Option<Track> {
        self.inner.lock().find(id)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn fetch_first_page(&self, category: Category, shuffle: bool) -> bool {
        let generation = {
            let mut st = self.inner.lock();
            *st.flag_mut(Flag::Loading(category)) = true;
            st.issue(category)
        };
        let _guard = FlagGuard::new(&self.inner, Flag::Loading(category));

        let request = PageRequest::new(category, 1, INITIAL_PAGE_SIZE);
        let result = self.inner.api.fetch_page(&request).await;

        let (track_count, has_more, full_page) = {
            let mut st = self.inner.lock();
            if !st.is_current(category, generation) {
                debug!(category = %category, "Discarding superseded first page");
                return false;
            }
            match result {
                Ok(page) => {
                    let has_more = page.has_more_after(&request);
                    let mut tracks = page.tracks;
                    let full_page = tracks.len() >= INITIAL_PAGE_SIZE as usize;
                    if shuffle {
                        tracks.shuffle(&mut rand::thread_rng());
                    }
                    let list = &mut st.lists[category];
                    list.replace(tracks, 1, has_more);
                    (list.len(), has_more, full_page)
                }
                Err(e) => {
                    if e.is_not_found() {
                        st.lists[category].mark_exhausted();
                    }
                    warn!(category = %category, "Failed to load tracks: {}", e);
                    return false;
                }
            }
        };

        info!(category = %category, count = track_count, has_more, "Loaded first page");
        self.emit_updated(category, track_count, has_more);
        if full_page && has_more {
            self.schedule_prefetch(category);
        }
        true
    }

    async fn load_liked(&self, force: bool) -> Vec<Track> {
        let generation = {
            let mut st = self.inner.lock();
            if st.loading_liked {
                debug!("Liked tracks already loading");
                return st.lists[Category::Liked].tracks().to_vec();
            }
            if !force && st.liked_cache.is_fresh() {
                debug!("Liked tracks cache is fresh");
                return st.lists[Category::Liked].tracks().to_vec();
            }
            st.loading_liked = true;
            st.issue(Category::Liked)
        };
        let _guard = FlagGuard::new(&self.inner, Flag::LoadingLiked);

        self.apply_liked(generation).await;
        self.tracks(Category::Liked)
    }

    /// `load_more` for `liked`: the backend always returns the full list
    async fn refresh_liked_in_place(&self, generation: u64) -> bool {
        let before = self.inner.lock().lists[Category::Liked].len();
        match self.apply_liked(generation).await {
            Some(after) => after > before,
            None => false,
        }
    }

    /// Fetch the liked list and replace it if `generation` is still current
    async fn apply_liked(&self, generation: u64) -> Option<usize> {
        let result = self.inner.api.fetch_liked().await;

        let count = {
            let mut st = self.inner.lock();
            if !st.is_current(Category::Liked, generation) {
                debug!("Discarding superseded liked list");
                return None;
            }
            match result {
                Ok(tracks) => {
                    let empty = tracks.is_empty();
                    st.lists[Category::Liked].replace(tracks, 1, false);
                    st.liked_cache.record(empty);
                    st.lists[Category::Liked].len()
                }
                Err(e) => {
                    warn!("Failed to load liked tracks: {}", e);
                    return None;
                }
            }
        };

        info!(count, "Loaded liked tracks");
        self.emit_updated(Category::Liked, count, false);
        Some(count)
    }

    fn replace_search(&self, tracks: Vec<Track>) {
        {
            let mut st = self.inner.lock();
            st.issue(Category::Search);
            st.lists[Category::Search].replace(tracks, 1, false);
        }
        self.emit_current(Category::Search);
    }

    fn schedule_prefetch(&self, category: Category) {
        if !self.inner.options.background_prefetch {
            return;
        }
        let delay = Duration::from_millis(rand::thread_rng().gen_range(PREFETCH_DELAY_MS));
        let catalog = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if catalog.has_more(category) {
                debug!(category = %category, "Background prefetch");
                catalog.load_more(category).await;
            }
        });
    }

    fn emit_current(&self, category: Category) {
        let (count, has_more) = {
            let st = self.inner.lock();
            (st.lists[category].len(), st.lists[category].has_more())
        };
        self.emit_updated(category, count, has_more);
    }

    fn emit_updated(&self, category: Category, track_count: usize, has_more: bool) {
        self.inner.events.emit_lossy(PlayerEvent::CatalogUpdated {
            category,
            track_count,
            has_more,
        });
    }
}
