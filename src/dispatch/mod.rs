//! Dispatch table: from backend action requests to provider calls
//!
//! Arguments arrive as loosely typed JSON maps. They are coerced into an
//! [`ActionCall`] with one strongly typed variant per action before any
//! provider runs, and every outcome (unknown action, bad arguments,
//! provider failure, success) comes back as an [`ActionResult`]. Nothing
//! past this boundary ever sees a provider error.

mod schema;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::actions::{ActionError, ActionErrorKind, ActionOutcome, Actions};

pub use schema::{ACTION_SCHEMAS, ActionName, ActionSchema, ParamKind, ParamSpec};

/// The backend's request to run an action
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest {
    pub name: String,
    pub arguments: Map<String, Value>,
}

impl ActionRequest {
    /// Build a request; non-object arguments become an empty map
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Outcome of an action, fed back into the conversation
#[derive(Debug, Clone, PartialEq)]
pub enum ActionResult {
    Success {
        name: String,
        payload: Value,
    },
    Failure {
        name: String,
        kind: ActionErrorKind,
        message: String,
    },
}

impl ActionResult {
    pub fn success(name: impl Into<String>, payload: Value) -> Self {
        Self::Success {
            name: name.into(),
            payload,
        }
    }

    pub fn failure(name: impl Into<String>, error: ActionError) -> Self {
        Self::Failure {
            name: name.into(),
            kind: error.kind,
            message: error.message,
        }
    }

    /// Action the result belongs to
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Success { name, .. } | Self::Failure { name, .. } => name,
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Failure kind, if any
    #[must_use]
    pub const fn error_kind(&self) -> Option<ActionErrorKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }

    /// Wrap a provider outcome, serializing the success value
    fn from_outcome<T: Serialize>(name: ActionName, outcome: ActionOutcome<T>) -> Self {
        match outcome.and_then(|value| {
            serde_json::to_value(value)
                .map_err(|e| ActionError::upstream(format!("unserializable result: {e}")))
        }) {
            Ok(payload) => Self::success(name.as_str(), payload),
            Err(error) => Self::failure(name.as_str(), error),
        }
    }
}

/// A validated action call
#[derive(Debug, Clone, PartialEq)]
pub enum ActionCall {
    GetWeather {
        city: Option<String>,
        lat: Option<f64>,
        lon: Option<f64>,
    },
    SearchContacts {
        name: String,
    },
    CallSomeone {
        phone_number: String,
    },
    SetReminder {
        title: String,
        date_iso: String,
    },
}

impl ActionCall {
    /// Validate a request against the action table
    ///
    /// # Errors
    ///
    /// `UnknownAction` for names outside the table, `InvalidArgument` for
    /// missing required or mistyped arguments
    pub fn parse(request: &ActionRequest) -> ActionOutcome<Self> {
        let name = ActionName::from_name(&request.name)
            .ok_or_else(|| ActionError::unknown_action(&request.name))?;
        let args = &request.arguments;

        for param in name.schema().required() {
            if is_absent(args.get(param)) {
                return Err(ActionError::invalid_argument(format!(
                    "missing required argument `{param}` for `{name}`"
                )));
            }
        }

        let call = match name {
            ActionName::GetWeather => Self::GetWeather {
                city: string_arg(args, "city")?,
                lat: number_arg(args, "lat")?,
                lon: number_arg(args, "lon")?,
            },
            ActionName::SearchContacts => Self::SearchContacts {
                name: required_string(args, name, "name")?,
            },
            ActionName::CallSomeone => Self::CallSomeone {
                phone_number: required_string(args, name, "phoneNumber")?,
            },
            ActionName::SetReminder => Self::SetReminder {
                title: required_string(args, name, "title")?,
                date_iso: required_string(args, name, "dateIso")?,
            },
        };

        Ok(call)
    }

    #[must_use]
    pub const fn name(&self) -> ActionName {
        match self {
            Self::GetWeather { .. } => ActionName::GetWeather,
            Self::SearchContacts { .. } => ActionName::SearchContacts,
            Self::CallSomeone { .. } => ActionName::CallSomeone,
            Self::SetReminder { .. } => ActionName::SetReminder,
        }
    }
}

fn is_absent(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

/// Optional string; numbers are accepted and stringified
fn string_arg(args: &Map<String, Value>, key: &str) -> ActionOutcome<Option<String>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(ActionError::invalid_argument(format!(
            "argument `{key}` must be a string"
        ))),
    }
}

fn required_string(
    args: &Map<String, Value>,
    action: ActionName,
    key: &str,
) -> ActionOutcome<String> {
    string_arg(args, key)?
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| {
            ActionError::invalid_argument(format!(
                "missing required argument `{key}` for `{action}`"
            ))
        })
}

/// Optional number; numeric strings are accepted
fn number_arg(args: &Map<String, Value>, key: &str) -> ActionOutcome<Option<f64>> {
    let invalid = || ActionError::invalid_argument(format!("argument `{key}` must be a number"));
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_f64().map(Some).ok_or_else(invalid),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s.trim().parse::<f64>().map(Some).map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

/// Routes action requests to the providers
#[derive(Clone)]
pub struct DispatchTable {
    actions: Actions,
}

impl DispatchTable {
    #[must_use]
    pub const fn new(actions: Actions) -> Self {
        Self { actions }
    }

    /// Declarations to advertise to the backend
    #[must_use]
    pub fn schemas(&self) -> &'static [ActionSchema] {
        &ACTION_SCHEMAS
    }

    /// Execute a request and capture its outcome
    pub async fn dispatch(&self, request: &ActionRequest) -> ActionResult {
        let call = match ActionCall::parse(request) {
            Ok(call) => call,
            Err(error) => {
                tracing::warn!(action = %request.name, error = %error, "rejected action request");
                return ActionResult::failure(request.name.clone(), error);
            }
        };

        tracing::info!(action = %call.name(), "dispatching action");
        let name = call.name();

        let result = match call {
            ActionCall::GetWeather { city, lat, lon } => ActionResult::from_outcome(
                name,
                self.actions.get_weather(city.as_deref(), lat, lon).await,
            ),
            ActionCall::SearchContacts { name: query } => {
                ActionResult::from_outcome(name, self.actions.search_contacts(&query).await)
            }
            ActionCall::CallSomeone { phone_number } => {
                ActionResult::from_outcome(name, self.actions.call_someone(&phone_number).await)
            }
            ActionCall::SetReminder { title, date_iso } => ActionResult::from_outcome(
                name,
                self.actions.set_reminder(&title, &date_iso).await,
            ),
        };

        match &result {
            ActionResult::Success { .. } => tracing::debug!(action = %name, "action succeeded"),
            ActionResult::Failure { kind, message, .. } => {
                tracing::warn!(action = %name, %kind, message, "action failed");
            }
        }

        result
    }
}
