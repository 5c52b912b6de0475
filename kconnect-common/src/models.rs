//! Track and category model
//!
//! Mirrors the JSON shape served by the K-Connect REST backend. Tracks are plain
//! values: the same track may live in several category lists at once, and two
//! copies are considered the same track when their ids are equal.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

/// Backend track identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Track record as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Unique track id
    pub id: TrackId,
    /// Track title
    pub title: String,
    /// Display artist
    pub artist: String,
    /// Album title, if any
    #[serde(default)]
    pub album: Option<String>,
    /// Duration in seconds
    #[serde(default)]
    pub duration: f64,
    /// Playable media URL
    pub file_path: String,
    /// Artwork URL
    #[serde(default)]
    pub cover_path: String,
    /// Whether the current user liked this track
    #[serde(default)]
    pub is_liked: bool,
    /// Total like count
    #[serde(default)]
    pub likes_count: u64,
    /// Total play count
    #[serde(default)]
    pub plays_count: u64,
}

impl Track {
    /// Same-track comparison (id equality only)
    pub fn same_as(&self, other: &Track) -> bool {
        self.id == other.id
    }
}

/// Named track grouping with independent pagination state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    All,
    Popular,
    Liked,
    New,
    Random,
    Search,
}

impl Category {
    /// Every category, in map order
    pub const ALL: [Category; 6] = [
        Category::All,
        Category::Popular,
        Category::Liked,
        Category::New,
        Category::Random,
        Category::Search,
    ];

    /// Wire/storage name
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::All => "all",
            Category::Popular => "popular",
            Category::Liked => "liked",
            Category::New => "new",
            Category::Random => "random",
            Category::Search => "search",
        }
    }

    fn index(self) -> usize {
        match self {
            Category::All => 0,
            Category::Popular => 1,
            Category::Liked => 2,
            Category::New => 3,
            Category::Random => 4,
            Category::Search => 5,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Category::All),
            "popular" => Ok(Category::Popular),
            "liked" => Ok(Category::Liked),
            "new" => Ok(Category::New),
            "random" => Ok(Category::Random),
            "search" => Ok(Category::Search),
            other => Err(Error::InvalidInput(format!("unknown category: {}", other))),
        }
    }
}

/// Fixed map with one slot per [`Category`]
///
/// Lookups go through an exhaustive match, so adding a category without a
/// slot fails to compile instead of falling through a string switch.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryMap<T> {
    slots: [T; 6],
}

impl<T> CategoryMap<T> {
    /// Build a map by calling `f` once per category
    pub fn from_fn(mut f: impl FnMut(Category) -> T) -> Self {
        Self {
            slots: Category::ALL.map(&mut f),
        }
    }

    /// Iterate `(category, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (Category, &T)> {
        Category::ALL.into_iter().zip(self.slots.iter())
    }

    /// Iterate `(category, value)` pairs mutably
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Category, &mut T)> {
        Category::ALL.into_iter().zip(self.slots.iter_mut())
    }
}

impl<T: Default> Default for CategoryMap<T> {
    fn default() -> Self {
        Self::from_fn(|_| T::default())
    }
}

impl<T> Index<Category> for CategoryMap<T> {
    type Output = T;

    fn index(&self, category: Category) -> &T {
        &self.slots[category.index()]
    }
}

impl<T> IndexMut<Category> for CategoryMap<T> {
    fn index_mut(&mut self, category: Category) -> &mut T {
        &mut self.slots[category.index()]
    }
}
