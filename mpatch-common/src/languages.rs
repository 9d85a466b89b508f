//! Language profiles
//!
//! Maps a caller-supplied language tag to the data that biases catalog
//! queries, secondary-source lookups and static fallback selection. New
//! languages are added as table entries (built-in or `[languages.<tag>]` in
//! the TOML config), never as new branches in the pipeline.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Catalog query modifier for languages without a dedicated profile
pub const DEFAULT_CATALOG_MODIFIER: &str = "genre:pop OR genre:rock";

/// Secondary-source search suffix for languages without a dedicated profile
pub const DEFAULT_LOOKUP_SUFFIX: &str = "official audio";

/// Per-language pipeline data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageProfile {
    /// Appended to catalog search queries (genre facets)
    pub catalog_modifier: String,
    /// Appended to secondary-source lookup hints
    pub lookup_suffix: String,
    /// Key into the static fallback table; `None` uses the tag itself
    #[serde(default)]
    pub fallback_key: Option<String>,
}

impl LanguageProfile {
    pub fn new(catalog_modifier: &str, lookup_suffix: &str) -> Self {
        Self {
            catalog_modifier: catalog_modifier.to_string(),
            lookup_suffix: lookup_suffix.to_string(),
            fallback_key: None,
        }
    }
}

impl Default for LanguageProfile {
    fn default() -> Self {
        Self::new(DEFAULT_CATALOG_MODIFIER, DEFAULT_LOOKUP_SUFFIX)
    }
}

/// Lookup table from normalized language tag to profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageProfiles {
    profiles: HashMap<String, LanguageProfile>,
    default_profile: LanguageProfile,
}

impl LanguageProfiles {
    /// Built-in table
    pub fn builtin() -> Self {
        let mut profiles = HashMap::new();
        profiles.insert(
            "tamil".to_string(),
            LanguageProfile::new(r#"genre:tamil OR genre:"tamil film""#, "tamil song"),
        );
        Self {
            profiles,
            default_profile: LanguageProfile::default(),
        }
    }

    /// Built-in table with the given entries added or replaced
    pub fn with_overrides(overrides: &HashMap<String, LanguageProfile>) -> Self {
        let mut table = Self::builtin();
        for (tag, profile) in overrides {
            table.insert(tag, profile.clone());
        }
        table
    }

    pub fn insert(&mut self, tag: &str, profile: LanguageProfile) {
        self.profiles.insert(normalize(tag), profile);
    }

    /// Profile for `tag`, or the default profile for unrecognized tags
    pub fn get(&self, tag: &str) -> &LanguageProfile {
        self.profiles
            .get(&normalize(tag))
            .unwrap_or(&self.default_profile)
    }

    /// Static fallback table key for `tag`
    pub fn fallback_key(&self, tag: &str) -> String {
        self.profiles
            .get(&normalize(tag))
            .and_then(|p| p.fallback_key.clone())
            .unwrap_or_else(|| normalize(tag))
    }

    /// Catalog search query biased toward the language's facets
    pub fn catalog_query(&self, query: &str, tag: &str) -> String {
        join_nonempty(query, &self.get(tag).catalog_modifier)
    }

    /// Secondary-source lookup hint biased toward the language
    pub fn lookup_hint(&self, title_artist: &str, tag: &str) -> String {
        join_nonempty(title_artist, &self.get(tag).lookup_suffix)
    }
}

impl Default for LanguageProfiles {
    fn default() -> Self {
        Self::builtin()
    }
}

fn normalize(tag: &str) -> String {
    tag.trim().to_lowercase()
}

fn join_nonempty(head: &str, tail: &str) -> String {
    format!("{} {}", head.trim(), tail.trim()).trim().to_string()
}
