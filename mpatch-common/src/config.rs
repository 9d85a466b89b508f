//! Configuration loading and resolution
//!
//! Every setting resolves with the priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`MPATCH_*`)
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is not an error: the service logs a warning and starts
//! on defaults. API keys that are absent leave the matching collaborator
//! disabled; the pipeline degrades instead of refusing to start.

use crate::languages::{LanguageProfile, LanguageProfiles};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "MPATCH_CONFIG";

/// Compiled defaults used when no other source provides a value
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub bind_address: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub lookup_concurrency: usize,
    pub lookup_rate_per_second: u32,
}

impl Default for CompiledDefaults {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 3000,
            request_timeout_secs: 10,
            lookup_concurrency: 4,
            lookup_rate_per_second: 10,
        }
    }
}

/// On-disk TOML schema; every field optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub sapling_api_key: Option<String>,
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
    pub youtube_api_key: Option<String>,
    pub audio_stream_url_template: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub lookup_concurrency: Option<usize>,
    pub lookup_rate_per_second: Option<u32>,
    /// `[languages.<tag>]` profile additions/overrides
    pub languages: HashMap<String, LanguageProfile>,
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
}

/// Fully resolved service configuration
#[derive(Clone)]
pub struct ServiceConfig {
    pub bind_address: String,
    pub port: u16,
    pub sapling_api_key: Option<String>,
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
    pub youtube_api_key: Option<String>,
    /// URL with an `{id}` placeholder returning the audio bytes for an id
    pub audio_stream_url_template: Option<String>,
    pub request_timeout_secs: u64,
    pub lookup_concurrency: usize,
    pub lookup_rate_per_second: u32,
    pub languages: LanguageProfiles,
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redact(v: &Option<String>) -> &'static str {
            if v.is_some() {
                "<set>"
            } else {
                "<unset>"
            }
        }
        f.debug_struct("ServiceConfig")
            .field("bind_address", &self.bind_address)
            .field("port", &self.port)
            .field("sapling_api_key", &redact(&self.sapling_api_key))
            .field("spotify_client_id", &redact(&self.spotify_client_id))
            .field("spotify_client_secret", &redact(&self.spotify_client_secret))
            .field("youtube_api_key", &redact(&self.youtube_api_key))
            .field("audio_stream_url_template", &self.audio_stream_url_template)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("lookup_concurrency", &self.lookup_concurrency)
            .field("lookup_rate_per_second", &self.lookup_rate_per_second)
            .finish()
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::from_sources(&CliOverrides::default(), &EnvSnapshot::default(), &TomlConfig::default())
    }
}

impl ServiceConfig {
    /// Resolve configuration from CLI, process environment and TOML file
    pub fn resolve(cli: &CliOverrides) -> Result<Self> {
        let env = EnvSnapshot::from_process();
        let toml_config = match config_file_path(cli.config_path.as_deref(), env.config_path.as_deref()) {
            Some(path) => load_toml_config(&path)?,
            None => {
                warn!("No config file found, using environment and compiled defaults");
                TomlConfig::default()
            }
        };
        Ok(Self::from_sources(cli, &env, &toml_config))
    }

    /// Merge already-loaded sources by priority
    pub fn from_sources(cli: &CliOverrides, env: &EnvSnapshot, toml_config: &TomlConfig) -> Self {
        let defaults = CompiledDefaults::default();

        let bind_address = cli
            .bind_address
            .clone()
            .or_else(|| env.bind_address.clone())
            .or_else(|| toml_config.bind_address.clone())
            .unwrap_or(defaults.bind_address);

        let port = cli
            .port
            .or(env.port)
            .or(toml_config.port)
            .unwrap_or(defaults.port);

        let request_timeout_secs = env
            .request_timeout_secs
            .or(toml_config.request_timeout_secs)
            .unwrap_or(defaults.request_timeout_secs)
            .max(1);

        let lookup_concurrency = env
            .lookup_concurrency
            .or(toml_config.lookup_concurrency)
            .unwrap_or(defaults.lookup_concurrency)
            .max(1);

        let lookup_rate_per_second = env
            .lookup_rate_per_second
            .or(toml_config.lookup_rate_per_second)
            .unwrap_or(defaults.lookup_rate_per_second)
            .max(1);

        Self {
            bind_address,
            port,
            sapling_api_key: resolve_secret(
                "Sapling API key",
                env.sapling_api_key.as_deref(),
                toml_config.sapling_api_key.as_deref(),
            ),
            spotify_client_id: resolve_secret(
                "Spotify client id",
                env.spotify_client_id.as_deref(),
                toml_config.spotify_client_id.as_deref(),
            ),
            spotify_client_secret: resolve_secret(
                "Spotify client secret",
                env.spotify_client_secret.as_deref(),
                toml_config.spotify_client_secret.as_deref(),
            ),
            youtube_api_key: resolve_secret(
                "YouTube API key",
                env.youtube_api_key.as_deref(),
                toml_config.youtube_api_key.as_deref(),
            ),
            audio_stream_url_template: env
                .audio_stream_url_template
                .clone()
                .or_else(|| toml_config.audio_stream_url_template.clone())
                .filter(|t| is_valid_key(t)),
            request_timeout_secs,
            lookup_concurrency,
            lookup_rate_per_second,
            languages: LanguageProfiles::with_overrides(&toml_config.languages),
        }
    }

    /// `host:port` string for the TCP listener
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Environment variables relevant to configuration, captured once
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    pub config_path: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub sapling_api_key: Option<String>,
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
    pub youtube_api_key: Option<String>,
    pub audio_stream_url_template: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub lookup_concurrency: Option<usize>,
    pub lookup_rate_per_second: Option<u32>,
}

impl EnvSnapshot {
    pub fn from_process() -> Self {
        let var = |name: &str| std::env::var(name).ok();

        Self {
            config_path: var(CONFIG_PATH_ENV).map(PathBuf::from),
            bind_address: var("MPATCH_BIND_ADDRESS"),
            port: parse_env_var("MPATCH_PORT"),
            request_timeout_secs: parse_env_var("MPATCH_REQUEST_TIMEOUT_SECS"),
            lookup_concurrency: parse_env_var("MPATCH_LOOKUP_CONCURRENCY"),
            lookup_rate_per_second: parse_env_var("MPATCH_LOOKUP_RATE_PER_SECOND"),
            sapling_api_key: var("MPATCH_SAPLING_API_KEY"),
            spotify_client_id: var("MPATCH_SPOTIFY_CLIENT_ID"),
            spotify_client_secret: var("MPATCH_SPOTIFY_CLIENT_SECRET"),
            youtube_api_key: var("MPATCH_YOUTUBE_API_KEY"),
            audio_stream_url_template: var("MPATCH_AUDIO_STREAM_URL_TEMPLATE"),
        }
    }
}

/// Numeric environment variable; unparsable values are ignored with a warning
fn parse_env_var<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring invalid {} value: {}", name, raw);
            None
        }
    }
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Resolve a secret from environment then TOML, warning on duplicates
fn resolve_secret(label: &str, env_value: Option<&str>, toml_value: Option<&str>) -> Option<String> {
    let env_value = env_value.filter(|k| is_valid_key(k));
    let toml_value = toml_value.filter(|k| is_valid_key(k));

    match (env_value, toml_value) {
        (Some(key), Some(_)) => {
            warn!(
                "{} found in multiple sources: environment, TOML. Using environment (highest priority).",
                label
            );
            Some(key.trim().to_string())
        }
        (Some(key), None) => {
            info!("{} loaded from environment variable", label);
            Some(key.trim().to_string())
        }
        (None, Some(key)) => {
            info!("{} loaded from TOML config", label);
            Some(key.trim().to_string())
        }
        (None, None) => None,
    }
}

/// Locate the TOML config file
///
/// Explicit CLI path, then `MPATCH_CONFIG`, then the per-user default
/// `<config_dir>/mpatch/mpatch-rec.toml` if it exists.
pub fn config_file_path(cli_path: Option<&Path>, env_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_path.or(env_path) {
        return Some(path.to_path_buf());
    }

    dirs::config_dir()
        .map(|d| d.join("mpatch").join("mpatch-rec.toml"))
        .filter(|p| p.exists())
}

/// Load the TOML config file
///
/// A missing file yields defaults with a warning; a file that exists but does
/// not parse is a configuration error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!("Config file {} not found, using defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)?;
    info!("Loaded config file {}", path.display());
    Ok(config)
}
