//! Current-weather lookup via `OpenWeatherMap`

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{ActionError, ActionOutcome};

const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org";

/// Message used when the service fails without explaining why
const FALLBACK_MESSAGE: &str = "Failed to fetch weather";

/// Where to look up the weather
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    /// City name, e.g. "London"
    City(String),
    /// Geographic coordinates
    Coordinates { lat: f64, lon: f64 },
}

impl Location {
    /// Pick a location from optional arguments
    ///
    /// A non-empty city wins over coordinates.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if neither a city nor both coordinates are given
    pub fn resolve(city: Option<&str>, lat: Option<f64>, lon: Option<f64>) -> ActionOutcome<Self> {
        if let Some(city) = city.map(str::trim).filter(|c| !c.is_empty()) {
            return Ok(Self::City(city.to_string()));
        }
        match (lat, lon) {
            (Some(lat), Some(lon)) => Ok(Self::Coordinates { lat, lon }),
            _ => Err(ActionError::invalid_argument(
                "No location information provided",
            )),
        }
    }
}

/// Summary of current conditions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    /// Temperature in degrees Celsius
    pub temperature: f64,
    pub description: String,
    pub city: String,
    /// Relative humidity, percent
    pub humidity: f64,
    /// Wind speed in metres per second
    pub wind_speed: f64,
}

/// A source of current weather data
#[async_trait]
pub trait WeatherService: Send + Sync {
    /// Fetch current conditions for a location
    async fn current(&self, location: &Location) -> ActionOutcome<WeatherReport>;
}

/// Look up the current weather by city or coordinates
///
/// # Errors
///
/// `InvalidArgument` when no location is given, `UpstreamError` when the
/// service fails
pub async fn get_weather(
    service: &dyn WeatherService,
    city: Option<&str>,
    lat: Option<f64>,
    lon: Option<f64>,
) -> ActionOutcome<WeatherReport> {
    let location = Location::resolve(city, lat, lon)?;
    tracing::debug!(?location, "fetching weather");

    let report = service.current(&location).await.inspect_err(|e| {
        tracing::warn!(error = %e, "weather lookup failed");
    })?;

    tracing::debug!(city = %report.city, temperature = report.temperature, "weather fetched");
    Ok(report)
}

/// `OpenWeatherMap` current-weather response
///
/// Error responses share the shape but only carry `cod` and `message`.
#[derive(Debug, Deserialize)]
struct OwmResponse {
    cod: Option<serde_json::Value>,
    message: Option<serde_json::Value>,
    name: Option<String>,
    main: Option<OwmMain>,
    #[serde(default)]
    weather: Vec<OwmCondition>,
    wind: Option<OwmWind>,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    speed: f64,
}

impl OwmResponse {
    /// `cod` is a number on success but a string on most errors
    fn is_ok(&self) -> bool {
        match &self.cod {
            Some(serde_json::Value::Number(n)) => n.as_u64() == Some(200),
            Some(serde_json::Value::String(s)) => s == "200",
            _ => false,
        }
    }

    fn into_report(self) -> ActionOutcome<WeatherReport> {
        if !self.is_ok() {
            let message = self
                .message
                .as_ref()
                .and_then(serde_json::Value::as_str)
                .filter(|m| !m.is_empty())
                .unwrap_or(FALLBACK_MESSAGE);
            return Err(ActionError::upstream(message));
        }

        let (Some(main), Some(condition)) = (self.main, self.weather.into_iter().next()) else {
            return Err(ActionError::upstream("malformed weather response"));
        };

        Ok(WeatherReport {
            temperature: main.temp,
            description: condition.description,
            city: self.name.unwrap_or_default(),
            humidity: main.humidity,
            wind_speed: self.wind.map_or(0.0, |w| w.speed),
        })
    }
}

/// `OpenWeatherMap` client
pub struct OpenWeatherClient {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl OpenWeatherClient {
    /// Create a client against the public API
    #[must_use]
    pub fn new(api_key: SecretString) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: OPENWEATHER_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different host (proxies, tests)
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl WeatherService for OpenWeatherClient {
    async fn current(&self, location: &Location) -> ActionOutcome<WeatherReport> {
        let url = format!("{}/data/2.5/weather", self.base_url);
        let api_key = self.api_key.expose_secret();

        let mut query: Vec<(&str, String)> = match location {
            Location::City(city) => vec![("q", city.clone())],
            Location::Coordinates { lat, lon } => {
                vec![("lat", lat.to_string()), ("lon", lon.to_string())]
            }
        };
        query.push(("appid", api_key.to_string()));
        query.push(("units", "metric".to_string()));

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| ActionError::upstream(format!("weather request failed: {e}")))?;

        let status = response.status();
        let body: OwmResponse = response.json().await.map_err(|e| {
            tracing::error!(status = %status, error = %e, "unreadable weather response");
            ActionError::upstream(FALLBACK_MESSAGE)
        })?;

        body.into_report()
    }
}

/// Stand-in used when no weather API key is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredWeather;

#[async_trait]
impl WeatherService for UnconfiguredWeather {
    async fn current(&self, _location: &Location) -> ActionOutcome<WeatherReport> {
        Err(ActionError::upstream("weather service is not configured"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionErrorKind;

    #[test]
    fn city_takes_precedence_over_coordinates() {
        let location = Location::resolve(Some("Paris"), Some(1.0), Some(2.0)).unwrap();
        assert_eq!(location, Location::City("Paris".to_string()));
    }

    #[test]
    fn blank_city_falls_back_to_coordinates() {
        let location = Location::resolve(Some("  "), Some(48.85), Some(2.35)).unwrap();
        assert_eq!(location, Location::Coordinates { lat: 48.85, lon: 2.35 });
    }

    #[test]
    fn single_coordinate_is_not_enough() {
        let err = Location::resolve(None, Some(48.85), None).unwrap_err();
        assert_eq!(err.kind, ActionErrorKind::InvalidArgument);
        assert_eq!(err.message, "No location information provided");
    }

    #[test]
    fn parses_success_body() {
        let body: OwmResponse = serde_json::from_str(
            r#"{
                "cod": 200,
                "name": "Paris",
                "main": {"temp": 18.5, "humidity": 62},
                "weather": [{"description": "light rain"}],
                "wind": {"speed": 4.1}
            }"#,
        )
        .unwrap();

        let report = body.into_report().unwrap();
        assert_eq!(report.city, "Paris");
        assert!((report.temperature - 18.5).abs() < f64::EPSILON);
        assert_eq!(report.description, "light rain");
    }

    #[test]
    fn error_body_uses_service_message() {
        let body: OwmResponse =
            serde_json::from_str(r#"{"cod": "404", "message": "city not found"}"#).unwrap();
        let err = body.into_report().unwrap_err();
        assert_eq!(err.kind, ActionErrorKind::UpstreamError);
        assert_eq!(err.message, "city not found");
    }

    #[test]
    fn error_body_without_message_uses_fallback() {
        let body: OwmResponse = serde_json::from_str(r#"{"cod": 500}"#).unwrap();
        let err = body.into_report().unwrap_err();
        assert_eq!(err.message, FALLBACK_MESSAGE);
    }

    #[test]
    fn report_serializes_camel_case() {
        let report = WeatherReport {
            temperature: 20.0,
            description: "clear sky".to_string(),
            city: "Paris".to_string(),
            humidity: 40.0,
            wind_speed: 3.0,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("windSpeed").is_some());
    }

    #[tokio::test]
    async fn unconfigured_service_reports_upstream_error() {
        let err = get_weather(&UnconfiguredWeather, Some("Paris"), None, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ActionErrorKind::UpstreamError);
    }
}
