//! Player session state machine
//!
//! Owns what the browser player tracks for the currently selected song:
//! loading, playing, paused, or handed off to an external link when the
//! song has no directly playable audio. Every change goes through
//! [`PlaybackSession::apply`]; events that make no sense in the current
//! state are ignored.
//!
//! Also provides the `m:ss` formatters used by the player display.

use crate::api::Song;
use serde::{Deserialize, Serialize};

/// Volume for a fresh session
pub const DEFAULT_VOLUME: f64 = 0.8;

/// Player state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PlaybackState {
    Idle,
    Loading { song: Song },
    Playing { song: Song },
    Paused { song: Song },
    /// Song cannot be played in place; offer `url` instead
    ExternalLinkFallback { song: Song, url: String },
}

impl PlaybackState {
    /// Song the state refers to, if any
    pub fn song(&self) -> Option<&Song> {
        match self {
            PlaybackState::Idle => None,
            PlaybackState::Loading { song }
            | PlaybackState::Playing { song }
            | PlaybackState::Paused { song }
            | PlaybackState::ExternalLinkFallback { song, .. } => Some(song),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Loading { .. } => "loading",
            PlaybackState::Playing { .. } => "playing",
            PlaybackState::Paused { .. } => "paused",
            PlaybackState::ExternalLinkFallback { .. } => "external_link_fallback",
        }
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Player input
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// User picked a song from the list
    Select(Song),
    /// Audio element reported it can play
    Loaded,
    /// Audio element failed to load the source
    LoadFailed,
    TogglePlayPause,
    /// Track played to the end
    Ended,
    /// Player closed
    Close,
}

/// One player session: state plus volume
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSession {
    state: PlaybackState,
    volume: f64,
    muted: bool,
}

impl PlaybackSession {
    pub fn new() -> Self {
        Self {
            state: PlaybackState::Idle,
            volume: DEFAULT_VOLUME,
            muted: false,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    /// Apply one event and return the resulting state
    pub fn apply(&mut self, event: PlaybackEvent) -> &PlaybackState {
        let current = std::mem::replace(&mut self.state, PlaybackState::Idle);
        self.state = transition(current, event);
        &self.state
    }

    /// Configured volume, ignoring mute
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Volume actually applied to the output
    pub fn effective_volume(&self) -> f64 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }

    /// Set volume, clamped to 0.0..=1.0; NaN is ignored
    pub fn set_volume(&mut self, volume: f64) {
        if !volume.is_nan() {
            self.volume = volume.clamp(0.0, 1.0);
        }
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Flip mute and return the new mute flag
    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        self.muted
    }
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self::new()
    }
}

fn transition(state: PlaybackState, event: PlaybackEvent) -> PlaybackState {
    use PlaybackEvent as E;
    use PlaybackState as S;

    match (state, event) {
        // Selecting always starts over, whatever was active
        (_, E::Select(song)) => select(song),
        (_, E::Close) => S::Idle,

        (S::Loading { song }, E::Loaded) => S::Playing { song },
        (S::Loading { song }, E::LoadFailed) | (S::Playing { song }, E::LoadFailed) => {
            match song.external_link() {
                Some(url) => S::ExternalLinkFallback { song, url },
                None => S::Idle,
            }
        }

        (S::Playing { song }, E::TogglePlayPause) => S::Paused { song },
        (S::Paused { song }, E::TogglePlayPause) => S::Playing { song },
        (S::Playing { song }, E::Ended) => S::Paused { song },

        (state, _) => state,
    }
}

fn select(song: Song) -> PlaybackState {
    if song.audio.is_some() {
        return PlaybackState::Loading { song };
    }
    match song.external_link() {
        Some(url) => PlaybackState::ExternalLinkFallback { song, url },
        None => PlaybackState::Idle,
    }
}

/// Format a playback position in seconds as `m:ss`
///
/// Negative or non-finite input renders as `0:00`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".to_string();
    }
    let total = seconds.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Format a track duration in milliseconds as `m:ss`
pub fn format_duration(ms: u64) -> String {
    let total = ms / 1000;
    format!("{}:{:02}", total / 60, total % 60)
}
