//! Device actions the assistant can perform
//!
//! Each provider takes typed arguments, talks to exactly one device
//! collaborator (weather service, contacts directory, dialer, calendar
//! store) and returns either a plain value or an [`ActionError`].
//! Providers never see the backend; the dispatch table wraps their
//! outcomes into [`crate::dispatch::ActionResult`] values.

pub mod calendar;
pub mod contacts;
pub mod telephony;
pub mod weather;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use calendar::{CalendarInfo, CalendarStore, LocalCalendar, NewEvent, set_reminder};
pub use contacts::{Contact, ContactMatch, ContactsDirectory, LocalContacts, search_contacts};
pub use telephony::{Dialer, SystemDialer, call_someone, tel_url};
pub use weather::{
    Location, OpenWeatherClient, UnconfiguredWeather, WeatherReport, WeatherService, get_weather,
};

/// Outcome of a single provider call
pub type ActionOutcome<T> = std::result::Result<T, ActionError>;

/// Classification of an action failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionErrorKind {
    /// Arguments were missing or malformed
    InvalidArgument,
    /// The user has not granted access to the collaborator
    PermissionDenied,
    /// A required resource does not exist
    NotFound,
    /// The device cannot perform the action
    UnsupportedOperation,
    /// A third-party service reported a failure
    UpstreamError,
    /// The backend asked for an action that does not exist
    UnknownAction,
}

impl ActionErrorKind {
    /// Wire name of the kind
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid_argument",
            Self::PermissionDenied => "permission_denied",
            Self::NotFound => "not_found",
            Self::UnsupportedOperation => "unsupported_operation",
            Self::UpstreamError => "upstream_error",
            Self::UnknownAction => "unknown_action",
        }
    }
}

impl fmt::Display for ActionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed action: kind plus a human-readable message
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ActionError {
    /// Failure classification
    pub kind: ActionErrorKind,
    /// Message suitable for the backend to relay to the user
    pub message: String,
}

impl ActionError {
    /// Create an error of the given kind
    pub fn new(kind: ActionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ActionErrorKind::InvalidArgument, message)
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ActionErrorKind::PermissionDenied, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ActionErrorKind::NotFound, message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(ActionErrorKind::UnsupportedOperation, message)
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(ActionErrorKind::UpstreamError, message)
    }

    pub fn unknown_action(name: &str) -> Self {
        Self::new(
            ActionErrorKind::UnknownAction,
            format!("unknown action: {name}"),
        )
    }
}

/// Answer to a permission request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    /// Access granted
    Granted,
    /// Access refused
    Denied,
}

impl PermissionStatus {
    #[must_use]
    pub const fn from_allowed(allowed: bool) -> Self {
        if allowed { Self::Granted } else { Self::Denied }
    }

    #[must_use]
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// The device collaborators the action providers run against
#[derive(Clone)]
pub struct Actions {
    weather: Arc<dyn WeatherService>,
    contacts: Arc<dyn ContactsDirectory>,
    calendar: Arc<dyn CalendarStore>,
    dialer: Arc<dyn Dialer>,
}

impl Actions {
    /// Bundle the collaborators
    #[must_use]
    pub fn new(
        weather: Arc<dyn WeatherService>,
        contacts: Arc<dyn ContactsDirectory>,
        calendar: Arc<dyn CalendarStore>,
        dialer: Arc<dyn Dialer>,
    ) -> Self {
        Self {
            weather,
            contacts,
            calendar,
            dialer,
        }
    }

    /// Look up the current weather
    ///
    /// # Errors
    ///
    /// See [`weather::get_weather`]
    pub async fn get_weather(
        &self,
        city: Option<&str>,
        lat: Option<f64>,
        lon: Option<f64>,
    ) -> ActionOutcome<WeatherReport> {
        get_weather(self.weather.as_ref(), city, lat, lon).await
    }

    /// Search the contacts directory by name
    ///
    /// # Errors
    ///
    /// See [`contacts::search_contacts`]
    pub async fn search_contacts(&self, name: &str) -> ActionOutcome<Vec<ContactMatch>> {
        search_contacts(self.contacts.as_ref(), name).await
    }

    /// Dial a phone number
    ///
    /// # Errors
    ///
    /// See [`telephony::call_someone`]
    pub async fn call_someone(&self, phone_number: &str) -> ActionOutcome<String> {
        call_someone(self.dialer.as_ref(), phone_number).await
    }

    /// Create a one-hour calendar event
    ///
    /// # Errors
    ///
    /// See [`calendar::set_reminder`]
    pub async fn set_reminder(&self, title: &str, date_iso: &str) -> ActionOutcome<String> {
        set_reminder(self.calendar.as_ref(), title, date_iso).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&ActionErrorKind::PermissionDenied).unwrap();
        assert_eq!(json, "\"permission_denied\"");
        assert_eq!(ActionErrorKind::UnknownAction.to_string(), "unknown_action");
    }

    #[test]
    fn error_display_includes_kind_and_message() {
        let err = ActionError::not_found("No writable calendar found on this device");
        assert_eq!(
            err.to_string(),
            "not_found: No writable calendar found on this device"
        );
    }

    #[test]
    fn unknown_action_names_the_action() {
        let err = ActionError::unknown_action("order_pizza");
        assert_eq!(err.kind, ActionErrorKind::UnknownAction);
        assert!(err.message.contains("order_pizza"));
    }
}
