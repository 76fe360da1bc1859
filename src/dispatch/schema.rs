//! Declarations of the actions exposed to the backend

use std::fmt;

/// The fixed set of actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionName {
    GetWeather,
    SearchContacts,
    CallSomeone,
    SetReminder,
}

impl ActionName {
    /// Every action, in declaration order
    pub const ALL: [Self; 4] = [
        Self::GetWeather,
        Self::SearchContacts,
        Self::CallSomeone,
        Self::SetReminder,
    ];

    /// Name the backend uses
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GetWeather => "get_weather",
            Self::SearchContacts => "search_contacts",
            Self::CallSomeone => "call_someone",
            Self::SetReminder => "set_reminder",
        }
    }

    /// Look up an action by its backend name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == name)
    }

    /// Schema for this action
    #[must_use]
    pub fn schema(self) -> &'static ActionSchema {
        match self {
            Self::GetWeather => &ACTION_SCHEMAS[0],
            Self::SearchContacts => &ACTION_SCHEMAS[1],
            Self::CallSomeone => &ACTION_SCHEMAS[2],
            Self::SetReminder => &ACTION_SCHEMAS[3],
        }
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON type of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Number,
}

/// One declared parameter
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub description: &'static str,
    pub required: bool,
}

/// Declaration of one action
#[derive(Debug, Clone, Copy)]
pub struct ActionSchema {
    pub name: ActionName,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
}

impl ActionSchema {
    /// Names of required parameters
    pub fn required(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.params.iter().filter(|p| p.required).map(|p| p.name)
    }

    /// JSON-schema-style `parameters` object
    #[must_use]
    pub fn parameters_json(&self) -> serde_json::Value {
        let properties: serde_json::Map<String, serde_json::Value> = self
            .params
            .iter()
            .map(|p| {
                let kind = match p.kind {
                    ParamKind::String => "STRING",
                    ParamKind::Number => "NUMBER",
                };
                (
                    p.name.to_string(),
                    serde_json::json!({ "type": kind, "description": p.description }),
                )
            })
            .collect();

        let mut parameters = serde_json::json!({
            "type": "OBJECT",
            "properties": properties,
        });

        let required: Vec<&str> = self.required().collect();
        if !required.is_empty() {
            parameters["required"] = serde_json::json!(required);
        }

        parameters
    }
}

/// The action table, in [`ActionName::ALL`] order
pub static ACTION_SCHEMAS: [ActionSchema; 4] = [
    ActionSchema {
        name: ActionName::GetWeather,
        description: "Get the current weather for a specific city or current location.",
        params: &[
            ParamSpec {
                name: "city",
                kind: ParamKind::String,
                description: "The city name, e.g., 'London'.",
                required: false,
            },
            ParamSpec {
                name: "lat",
                kind: ParamKind::Number,
                description: "Latitude of the location.",
                required: false,
            },
            ParamSpec {
                name: "lon",
                kind: ParamKind::Number,
                description: "Longitude of the location.",
                required: false,
            },
        ],
    },
    ActionSchema {
        name: ActionName::SearchContacts,
        description: "Find a contact's phone number by their name.",
        params: &[ParamSpec {
            name: "name",
            kind: ParamKind::String,
            description: "The name of the person to search for.",
            required: true,
        }],
    },
    ActionSchema {
        name: ActionName::CallSomeone,
        description: "Make a phone call to a given phone number.",
        params: &[ParamSpec {
            name: "phoneNumber",
            kind: ParamKind::String,
            description: "The phone number to call.",
            required: true,
        }],
    },
    ActionSchema {
        name: ActionName::SetReminder,
        description: "Set a reminder for a specific task and time.",
        params: &[
            ParamSpec {
                name: "title",
                kind: ParamKind::String,
                description: "The title of the reminder.",
                required: true,
            },
            ParamSpec {
                name: "dateIso",
                kind: ParamKind::String,
                description: "The date and time in ISO 8601 format.",
                required: true,
            },
        ],
    },
];
