//! # wavplay Common Library
//!
//! Shared code for the wavplay audio player and its front ends:
//! - Bootstrap configuration loading (TOML)
//! - Playback state and event types (`PlayerEvent`)
//! - `EventBus` for one-to-many event distribution

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
pub use events::{EventBus, PlaybackState, PlayerEvent};
