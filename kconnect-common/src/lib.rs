//! # K-Connect Common Library
//!
//! Shared code for the K-Connect music client crates:
//! - Track and category model shared with the REST backend
//! - Event types (PlayerEvent enum) and the EventBus
//! - Bootstrap configuration loading
//! - Common error type

pub mod config;
pub mod error;
pub mod events;
pub mod models;

pub use error::{Error, Result};
pub use models::{Category, CategoryMap, Track, TrackId};
