//! Configuration management for the assistant

pub mod file;

use std::path::PathBuf;
use std::str::FromStr;

use secrecy::SecretString;

use crate::actions::PermissionStatus;
use crate::agent::DEFAULT_MAX_ROUND_TRIPS;
use crate::backend::DEFAULT_GEMINI_MODEL;
use crate::voice::TtsProvider;
use crate::{Error, Result};

use file::AssistantConfigFile;

/// Assistant configuration
#[derive(Debug)]
pub struct Config {
    /// Generative backend
    pub gemini: GeminiConfig,

    /// Weather service
    pub weather: WeatherConfig,

    /// Spoken output
    pub voice: VoiceConfig,

    /// Action round-trips allowed per command
    pub max_round_trips: usize,

    /// Directory for the contacts and calendar database
    pub data_dir: PathBuf,

    /// Whether the assistant may read local contacts
    pub contacts_access: PermissionStatus,

    /// Whether the assistant may write local calendars
    pub calendar_access: PermissionStatus,
}

/// Gemini backend configuration
#[derive(Debug)]
pub struct GeminiConfig {
    /// API key (`GEMINI_API_KEY`)
    pub api_key: Option<SecretString>,

    /// Model identifier
    pub model: String,

    /// Override for the API host
    pub base_url: Option<String>,
}

/// `OpenWeatherMap` configuration
#[derive(Debug)]
pub struct WeatherConfig {
    /// API key (`OPENWEATHER_API_KEY`); weather requests fail without it
    pub api_key: Option<SecretString>,

    pub base_url: Option<String>,
}

/// Text-to-speech configuration
#[derive(Debug)]
pub struct VoiceConfig {
    pub tts_provider: TtsProvider,

    /// Voice name (`OpenAI`) or voice ID (`ElevenLabs`)
    pub tts_voice: String,

    /// Speed multiplier (0.25 to 4.0)
    pub tts_speed: f32,

    pub tts_model: Option<String>,

    /// `OpenAI` API key
    pub openai_api_key: Option<SecretString>,

    /// `ElevenLabs` API key
    pub elevenlabs_api_key: Option<SecretString>,
}

/// Default data directory (`~/.local/share/senior-assistant` on Linux)
#[must_use]
pub fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".local/share/senior-assistant"),
        |d| d.data_dir().join("senior-assistant"),
    )
}

impl Config {
    /// Load configuration (env > toml > default)
    ///
    /// # Errors
    ///
    /// Returns error if a setting has an unusable value
    pub fn load() -> Result<Self> {
        Self::from_sources(file::load_config_file(), |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed file and an environment lookup
    ///
    /// Empty environment values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns error if a setting has an unusable value
    pub fn from_sources<F>(fc: AssistantConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        let secret = |value: Option<String>| value.map(SecretString::from);

        let gemini = GeminiConfig {
            api_key: secret(var("GEMINI_API_KEY").or(fc.gemini.api_key)),
            model: var("GEMINI_MODEL")
                .or(fc.gemini.model)
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            base_url: var("GEMINI_BASE_URL").or(fc.gemini.base_url),
        };

        let weather = WeatherConfig {
            api_key: secret(var("OPENWEATHER_API_KEY").or(fc.weather.api_key)),
            base_url: var("OPENWEATHER_BASE_URL").or(fc.weather.base_url),
        };

        let max_round_trips = match var("ASSISTANT_MAX_ROUND_TRIPS") {
            Some(raw) => parse_value("ASSISTANT_MAX_ROUND_TRIPS", &raw)?,
            None => fc.gemini.max_round_trips.unwrap_or(DEFAULT_MAX_ROUND_TRIPS),
        };

        let tts_provider = match var("ASSISTANT_TTS_PROVIDER").or(fc.voice.tts_provider) {
            Some(raw) => raw.parse()?,
            None => TtsProvider::default(),
        };

        let tts_speed = match var("ASSISTANT_TTS_SPEED") {
            Some(raw) => parse_value("ASSISTANT_TTS_SPEED", &raw)?,
            None => fc.voice.tts_speed.unwrap_or(1.0),
        };

        let voice = VoiceConfig {
            tts_provider,
            tts_voice: var("ASSISTANT_TTS_VOICE")
                .or(fc.voice.tts_voice)
                .unwrap_or_else(|| tts_provider.default_voice().to_string()),
            tts_speed,
            tts_model: fc.voice.tts_model,
            openai_api_key: secret(var("OPENAI_API_KEY").or(fc.api_keys.openai)),
            elevenlabs_api_key: secret(var("ELEVENLABS_API_KEY").or(fc.api_keys.elevenlabs)),
        };

        let data_dir = var("ASSISTANT_DATA_DIR")
            .or(fc.storage.data_dir)
            .map_or_else(default_data_dir, PathBuf::from);

        let contacts_access = match var("ASSISTANT_CONTACTS_ACCESS") {
            Some(raw) => parse_access("ASSISTANT_CONTACTS_ACCESS", &raw)?,
            None => PermissionStatus::from_allowed(fc.permissions.contacts.unwrap_or(true)),
        };

        let calendar_access = match var("ASSISTANT_CALENDAR_ACCESS") {
            Some(raw) => parse_access("ASSISTANT_CALENDAR_ACCESS", &raw)?,
            None => PermissionStatus::from_allowed(fc.permissions.calendar.unwrap_or(true)),
        };

        Ok(Self {
            gemini,
            weather,
            voice,
            max_round_trips,
            data_dir,
            contacts_access,
            calendar_access,
        })
    }

    /// Path of the local database
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("assistant.db")
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::Config(format!("{key} has an invalid value: {raw}")))
}

fn parse_access(key: &str, raw: &str) -> Result<PermissionStatus> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "granted" | "allow" => Ok(PermissionStatus::Granted),
        "0" | "false" | "no" | "denied" | "deny" => Ok(PermissionStatus::Denied),
        _ => Err(Error::Config(format!("{key} must be granted or denied, got {raw}"))),
    }
}
