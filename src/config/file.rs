//! TOML configuration file loading
//!
//! Supports `~/.config/senior-assistant/config.toml` as a persistent config
//! source. Every field is optional; the file is a partial overlay on top of
//! defaults and is itself overridden by environment variables.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct AssistantConfigFile {
    #[serde(default)]
    pub gemini: GeminiFileConfig,

    #[serde(default)]
    pub weather: WeatherFileConfig,

    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Keys for the speech services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,

    #[serde(default)]
    pub storage: StorageFileConfig,

    /// Access to the local contacts and calendars
    #[serde(default)]
    pub permissions: PermissionsFileConfig,
}

/// Generative backend configuration
#[derive(Debug, Default, Deserialize)]
pub struct GeminiFileConfig {
    pub api_key: Option<String>,

    /// Model identifier (e.g. "gemini-2.5-flash")
    pub model: Option<String>,

    pub base_url: Option<String>,

    /// Action round-trips allowed per command
    pub max_round_trips: Option<usize>,
}

/// `OpenWeatherMap` configuration
#[derive(Debug, Default, Deserialize)]
pub struct WeatherFileConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

/// Spoken output configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// "openai", "elevenlabs", or "console"
    pub tts_provider: Option<String>,

    /// Voice name or `ElevenLabs` voice ID
    pub tts_voice: Option<String>,

    /// Speech speed multiplier (`OpenAI` only)
    pub tts_speed: Option<f32>,

    pub tts_model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
    pub elevenlabs: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StorageFileConfig {
    /// Directory holding the contacts and calendar database
    pub data_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PermissionsFileConfig {
    pub contacts: Option<bool>,
    pub calendar: Option<bool>,
}

/// Load the TOML config file from the standard path
///
/// Returns `AssistantConfigFile::default()` if the file doesn't exist or
/// can't be parsed.
pub fn load_config_file() -> AssistantConfigFile {
    config_file_path().map_or_else(AssistantConfigFile::default, |path| {
        load_config_file_from(&path)
    })
}

/// Load a TOML config file from an explicit path, with the same fallbacks
pub fn load_config_file_from(path: &Path) -> AssistantConfigFile {
    if !path.exists() {
        return AssistantConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                AssistantConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            AssistantConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/senior-assistant/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("senior-assistant").join("config.toml"))
}
