//! Static curated fallback
//!
//! Served when the request is invalid or live composition produced nothing.
//! Entries are keyed by language; every entry carries its own unique id and
//! plays through the local audio proxy.

use mpatch_common::api::{proxy_path, Song};
use mpatch_common::LanguageProfiles;
use std::collections::HashSet;

/// Bumped whenever entries are added, removed or re-identified
pub const FALLBACK_CATALOG_VERSION: u32 = 2;

struct FallbackEntry {
    id: &'static str,
    language: &'static str,
    name: &'static str,
    artist: &'static str,
    youtube_id: &'static str,
    duration_ms: u64,
    spotify_url: &'static str,
}

const FALLBACK_ENTRIES: &[FallbackEntry] = &[
    FallbackEntry {
        id: "fallback-en-1",
        language: "english",
        name: "Blinding Lights",
        artist: "The Weeknd",
        youtube_id: "fHI8X4OXluQ",
        duration_ms: 200_000,
        spotify_url: "https://open.spotify.com/track/0VjIjW4GlUZAMYd2vXMi3b",
    },
    FallbackEntry {
        id: "fallback-en-2",
        language: "english",
        name: "Uptown Funk",
        artist: "Mark Ronson ft. Bruno Mars",
        youtube_id: "OPf0YbXqDm0",
        duration_ms: 270_000,
        spotify_url: "https://open.spotify.com/track/32OlwWuMpZ6b0aN2RZOeMS",
    },
    FallbackEntry {
        id: "fallback-en-3",
        language: "english",
        name: "Levitating",
        artist: "Dua Lipa",
        youtube_id: "TUVcZfQe-Kw",
        duration_ms: 203_000,
        spotify_url: "https://open.spotify.com/track/463CkQjx2Zk1yXoBuierM9",
    },
    FallbackEntry {
        id: "fallback-en-4",
        language: "english",
        name: "Senorita",
        artist: "Shawn Mendes & Camila Cabello",
        youtube_id: "Pkh8UtuejGw",
        duration_ms: 190_000,
        spotify_url: "https://open.spotify.com/track/0TK2YIli7K1leLovkQiNik",
    },
    FallbackEntry {
        id: "fallback-en-5",
        language: "english",
        name: "Perfect",
        artist: "Ed Sheeran",
        youtube_id: "2Vv-BfVoq4g",
        duration_ms: 263_000,
        spotify_url: "https://open.spotify.com/track/0tgVpDi06FyKpA1z0VMD4v",
    },
    FallbackEntry {
        id: "fallback-ta-1",
        language: "tamil",
        name: "Ootagatha Kattiko",
        artist: "S. P. Balasubrahmanyam & K. S. Chithra",
        youtube_id: "BthWzOAihkk",
        duration_ms: 300_000,
        spotify_url: "https://open.spotify.com/track/065hhs8MnhsgLay10eZ9En",
    },
    FallbackEntry {
        id: "fallback-ta-2",
        language: "tamil",
        name: "Anbe Anbe",
        artist: "A. R. Rahman",
        youtube_id: "WeUPSXzoeRs",
        duration_ms: 333_000,
        spotify_url: "https://open.spotify.com/track/0IvGf9t99AcOKB1yXhD3Xr",
    },
    FallbackEntry {
        id: "fallback-ta-3",
        language: "tamil",
        name: "Poopola Theepola",
        artist: "Hariharan",
        youtube_id: "rJburXBhIf0",
        duration_ms: 295_000,
        spotify_url: "https://open.spotify.com/track/0FdYyJAcAhhVWYUVvcUBYz",
    },
    FallbackEntry {
        id: "fallback-ta-4",
        language: "tamil",
        name: "Enjoy Enjaami",
        artist: "Dhee ft. Arivu",
        youtube_id: "eYq7WapuDLU",
        duration_ms: 260_000,
        spotify_url: "https://open.spotify.com/track/4sJJ2mXrAPEyHWIvKbV4ef",
    },
];

impl FallbackEntry {
    fn to_song(&self) -> Song {
        Song {
            id: self.id.to_string(),
            name: self.name.to_string(),
            artist: self.artist.to_string(),
            audio: Some(proxy_path(self.youtube_id)),
            youtube_id: Some(self.youtube_id.to_string()),
            image: format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", self.youtube_id),
            language: self.language.to_string(),
            duration_ms: self.duration_ms,
            spotify_url: Some(self.spotify_url.to_string()),
        }
    }
}

/// Curated songs for `languages`, in the languages' order
///
/// Tags are mapped through their profile's fallback key; tags without
/// curated entries contribute nothing, and a key reached twice is only
/// expanded once so ids stay unique.
pub fn fallback_songs(languages: &[String], profiles: &LanguageProfiles) -> Vec<Song> {
    let mut seen_keys = HashSet::new();
    languages
        .iter()
        .map(|tag| profiles.fallback_key(tag))
        .filter(|key| seen_keys.insert(key.clone()))
        .flat_map(|key| {
            FALLBACK_ENTRIES
                .iter()
                .filter(move |entry| entry.language == key)
                .map(FallbackEntry::to_song)
        })
        .collect()
}
