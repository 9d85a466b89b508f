//! # MusicPatch Common Library
//!
//! Shared code for the MusicPatch services:
//! - Service configuration (TOML, environment, compiled defaults)
//! - Language profiles driving query bias and fallback selection
//! - API request/response types (`Song`, recommendation bodies)
//! - Player session state machine and time formatting
//! - Common error type

pub mod api;
pub mod config;
pub mod error;
pub mod languages;
pub mod playback;

pub use error::{Error, Result};
pub use languages::{LanguageProfile, LanguageProfiles};
