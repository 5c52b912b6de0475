//! # K-Connect Player Library (kconnect-player)
//!
//! Client-side music playback core for K-Connect.
//!
//! **Purpose:** Keep per-category track lists paged in from the REST backend,
//! play through them with crossfaded transitions, report presence, and mirror
//! state to the OS media surface.
//!
//! **Architecture:** [`catalog::TrackCatalog`] is the leaf; the
//! [`playback::PlaybackEngine`] reads it through a [`playback::Navigator`],
//! drives two [`playback::AudioOutput`] handles, and notifies
//! [`presence::PresenceReporter`] and [`media::MediaSessionBridge`].

pub mod api;
pub mod catalog;
pub mod config;
pub mod console;
pub mod error;
pub mod media;
pub mod playback;
pub mod presence;
pub mod state;

pub use error::{Error, Result};
pub use state::SharedState;
