//! Wiring from configuration to a ready command loop

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use crate::actions::{
    Actions, LocalCalendar, LocalContacts, OpenWeatherClient, SystemDialer, UnconfiguredWeather,
    WeatherService,
};
use crate::agent::{CommandLoop, LoopEvent};
use crate::backend::GeminiClient;
use crate::config::Config;
use crate::db::{self, CalendarRepo, ContactRepo, DbPool};
use crate::dispatch::DispatchTable;
use crate::voice::{CloudSpeaker, ConsoleSpeaker, Speaker, TextToSpeech, TtsProvider};
use crate::{Error, Result};

/// Open (and migrate) the local database under the data directory
///
/// # Errors
///
/// Returns error if the directory or database cannot be created
pub fn open_database(config: &Config) -> Result<DbPool> {
    std::fs::create_dir_all(&config.data_dir)?;
    db::init(config.database_path())
}

fn copy_secret(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_string())
}

/// Build the device collaborators
#[must_use]
pub fn build_actions(config: &Config, pool: &DbPool) -> Actions {
    let weather: Arc<dyn WeatherService> = match &config.weather.api_key {
        Some(key) => {
            let client = OpenWeatherClient::new(copy_secret(key));
            Arc::new(match &config.weather.base_url {
                Some(url) => client.with_base_url(url.as_str()),
                None => client,
            })
        }
        None => {
            tracing::warn!("OPENWEATHER_API_KEY not set; weather requests will fail");
            Arc::new(UnconfiguredWeather)
        }
    };

    Actions::new(
        weather,
        Arc::new(LocalContacts::new(
            ContactRepo::new(pool.clone()),
            config.contacts_access,
        )),
        Arc::new(LocalCalendar::new(
            CalendarRepo::new(pool.clone()),
            config.calendar_access,
        )),
        Arc::new(SystemDialer::detect()),
    )
}

/// Build the Gemini backend
///
/// # Errors
///
/// Returns error if no Gemini API key is configured
pub fn build_backend(config: &Config) -> Result<GeminiClient> {
    let key = config
        .gemini
        .api_key
        .as_ref()
        .ok_or_else(|| Error::Config("GEMINI_API_KEY is required".to_string()))?;

    let client = GeminiClient::new(copy_secret(key))?.with_model(config.gemini.model.as_str());
    Ok(match &config.gemini.base_url {
        Some(url) => client.with_base_url(url.as_str()),
        None => client,
    })
}

/// Build a command loop over the local stores
///
/// # Errors
///
/// Returns error if the backend is not configured
pub fn build_command_loop(
    config: &Config,
    pool: &DbPool,
    notify: Option<tokio::sync::mpsc::Sender<LoopEvent>>,
) -> Result<CommandLoop> {
    let backend = Arc::new(build_backend(config)?);
    let dispatch = DispatchTable::new(build_actions(config, pool));

    let command_loop =
        CommandLoop::new(backend, dispatch).with_max_round_trips(config.max_round_trips);
    Ok(match notify {
        Some(tx) => command_loop.with_notify(tx),
        None => command_loop,
    })
}

/// Build the configured TTS engine, if any
///
/// # Errors
///
/// Returns error if the provider's API key is missing
pub fn build_tts(config: &Config) -> Result<Option<TextToSpeech>> {
    let voice = &config.voice;
    let missing = |name: &str| Error::Config(format!("{name} is required for speech output"));

    let tts = match voice.tts_provider {
        TtsProvider::Console => return Ok(None),
        TtsProvider::OpenAI => {
            let key = voice
                .openai_api_key
                .as_ref()
                .ok_or_else(|| missing("OPENAI_API_KEY"))?;
            TextToSpeech::openai(copy_secret(key), voice.tts_voice.as_str(), voice.tts_speed)?
        }
        TtsProvider::ElevenLabs => {
            let key = voice
                .elevenlabs_api_key
                .as_ref()
                .ok_or_else(|| missing("ELEVENLABS_API_KEY"))?;
            TextToSpeech::elevenlabs(copy_secret(key), voice.tts_voice.as_str())?
        }
    };

    Ok(Some(match &voice.tts_model {
        Some(model) => tts.with_model(model.as_str()),
        None => tts,
    }))
}

/// Build the reply speaker, falling back to the console when speech
/// output is not configured
#[must_use]
pub fn build_speaker(config: &Config) -> Box<dyn Speaker> {
    match build_tts(config) {
        Ok(Some(tts)) => Box::new(CloudSpeaker::new(tts)),
        Ok(None) => Box::new(ConsoleSpeaker),
        Err(e) => {
            tracing::warn!(error = %e, "speech output unavailable, printing replies instead");
            Box::new(ConsoleSpeaker)
        }
    }
}
