//! Shared test utilities

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use senior_assistant::actions::{
    CalendarInfo, CalendarStore, Contact, ContactsDirectory, Dialer, Location, NewEvent,
    WeatherReport, WeatherService,
};
use senior_assistant::backend::{Backend, BackendRequest, BackendResponse};
use senior_assistant::conversation::Turn;
use senior_assistant::voice::{Recorder, Speaker};
use senior_assistant::{
    ActionError, ActionRequest, Actions, CommandLoop, DbPool, DispatchTable, Error,
    PermissionStatus, Result, Utterance, db,
};

/// Set up an in-memory test database
#[must_use]
pub fn setup_test_db() -> DbPool {
    db::init_memory().expect("failed to init test db")
}

/// What the backend saw on one call
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub system_instruction: String,
    pub turns: Vec<Turn>,
    pub action_names: Vec<&'static str>,
}

/// Backend that replays a fixed script and records every request
#[derive(Default)]
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Result<BackendResponse>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedBackend {
    pub fn new(script: Vec<Result<BackendResponse>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn generate(&self, request: BackendRequest<'_>) -> Result<BackendResponse> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(RecordedRequest {
                system_instruction: request.system_instruction.to_string(),
                turns: request.turns.to_vec(),
                action_names: request.actions.iter().map(|a| a.name.as_str()).collect(),
            });

        self.script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| Err(Error::Backend("script exhausted".to_string())))
    }
}

/// Backend that requests the same action forever
pub struct RepeatingBackend {
    action: ActionRequest,
    calls: Mutex<usize>,
}

impl RepeatingBackend {
    pub fn new(action: ActionRequest) -> Arc<Self> {
        Arc::new(Self {
            action,
            calls: Mutex::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().expect("calls lock")
    }
}

#[async_trait]
impl Backend for RepeatingBackend {
    async fn generate(&self, _request: BackendRequest<'_>) -> Result<BackendResponse> {
        *self.calls.lock().expect("calls lock") += 1;
        Ok(BackendResponse::action(self.action.clone()))
    }
}

/// Shorthand for an action request
pub fn action(name: &str, args: Value) -> ActionRequest {
    ActionRequest::new(name, args)
}

/// Weather service returning a fixed report for every location
pub struct StubWeather {
    pub report: WeatherReport,
    pub seen: Mutex<Vec<Location>>,
}

impl StubWeather {
    pub fn paris() -> Arc<Self> {
        Arc::new(Self {
            report: WeatherReport {
                temperature: 18.5,
                description: "clear sky".to_string(),
                city: "Paris".to_string(),
                humidity: 60.0,
                wind_speed: 3.1,
            },
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl WeatherService for StubWeather {
    async fn current(&self, location: &Location) -> std::result::Result<WeatherReport, ActionError> {
        self.seen.lock().expect("seen lock").push(location.clone());
        Ok(self.report.clone())
    }
}

/// Contacts directory over a fixed list
pub struct StubContacts {
    pub permission: PermissionStatus,
    pub contacts: Vec<Contact>,
}

impl StubContacts {
    pub fn with(contacts: &[(&str, &[&str])]) -> Arc<Self> {
        Arc::new(Self {
            permission: PermissionStatus::Granted,
            contacts: contacts
                .iter()
                .map(|(name, numbers)| Contact {
                    name: (*name).to_string(),
                    phone_numbers: numbers.iter().map(|n| (*n).to_string()).collect(),
                })
                .collect(),
        })
    }

    pub fn denied() -> Arc<Self> {
        Arc::new(Self {
            permission: PermissionStatus::Denied,
            contacts: Vec::new(),
        })
    }
}

#[async_trait]
impl ContactsDirectory for StubContacts {
    async fn request_permission(&self) -> PermissionStatus {
        self.permission
    }

    async fn find_by_name(&self, name: &str) -> std::result::Result<Vec<Contact>, ActionError> {
        let needle = name.to_lowercase();
        Ok(self
            .contacts
            .iter()
            .filter(|c| c.name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }
}

/// Calendar store recording created events
pub struct StubCalendar {
    pub permission: PermissionStatus,
    pub calendars: Vec<CalendarInfo>,
    pub created: Mutex<Vec<(String, NewEvent)>>,
}

impl StubCalendar {
    pub fn with(calendars: &[(&str, &str, bool, bool)]) -> Arc<Self> {
        Arc::new(Self {
            permission: PermissionStatus::Granted,
            calendars: calendars
                .iter()
                .map(|(id, title, primary, writable)| CalendarInfo {
                    id: (*id).to_string(),
                    title: (*title).to_string(),
                    is_primary: *primary,
                    allows_modifications: *writable,
                })
                .collect(),
            created: Mutex::new(Vec::new()),
        })
    }

    pub fn created(&self) -> Vec<(String, NewEvent)> {
        self.created.lock().expect("created lock").clone()
    }
}

#[async_trait]
impl CalendarStore for StubCalendar {
    async fn request_permission(&self) -> PermissionStatus {
        self.permission
    }

    async fn calendars(&self) -> std::result::Result<Vec<CalendarInfo>, ActionError> {
        Ok(self.calendars.clone())
    }

    async fn create_event(
        &self,
        calendar_id: &str,
        event: &NewEvent,
    ) -> std::result::Result<String, ActionError> {
        let mut created = self.created.lock().expect("created lock");
        created.push((calendar_id.to_string(), event.clone()));
        Ok(format!("event-{}", created.len()))
    }
}

/// Dialer recording opened URLs
pub struct StubDialer {
    pub supported: bool,
    pub opened: Mutex<Vec<String>>,
}

impl StubDialer {
    pub fn new(supported: bool) -> Arc<Self> {
        Arc::new(Self {
            supported,
            opened: Mutex::new(Vec::new()),
        })
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().expect("opened lock").clone()
    }
}

#[async_trait]
impl Dialer for StubDialer {
    async fn can_open(&self, _url: &str) -> bool {
        self.supported
    }

    async fn open(&self, url: &str) -> std::result::Result<(), ActionError> {
        self.opened.lock().expect("opened lock").push(url.to_string());
        Ok(())
    }
}

/// All four stub collaborators, kept for later inspection
pub struct Stubs {
    pub weather: Arc<StubWeather>,
    pub contacts: Arc<StubContacts>,
    pub calendar: Arc<StubCalendar>,
    pub dialer: Arc<StubDialer>,
}

impl Stubs {
    pub fn new() -> Self {
        Self {
            weather: StubWeather::paris(),
            contacts: StubContacts::with(&[("John Smith", &["555-0100"])]),
            calendar: StubCalendar::with(&[("cal-1", "Personal", true, true)]),
            dialer: StubDialer::new(true),
        }
    }

    pub fn actions(&self) -> Actions {
        Actions::new(
            self.weather.clone(),
            self.contacts.clone(),
            self.calendar.clone(),
            self.dialer.clone(),
        )
    }

    pub fn command_loop(&self, backend: Arc<dyn Backend>) -> CommandLoop {
        CommandLoop::new(backend, DispatchTable::new(self.actions()))
    }
}

/// Recorder handing out a fixed utterance, or failing on demand
#[derive(Default)]
pub struct StubRecorder {
    pub fail_start: bool,
    pub fail_stop: bool,
    pub starts: usize,
}

impl Recorder for StubRecorder {
    fn start(&mut self) -> Result<()> {
        if self.fail_start {
            return Err(Error::Audio("microphone unavailable".to_string()));
        }
        self.starts += 1;
        Ok(())
    }

    fn stop(&mut self) -> Result<Utterance> {
        if self.fail_stop {
            return Err(Error::Audio("no audio captured".to_string()));
        }
        Ok(Utterance::wav(b"RIFF....WAVE".to_vec()))
    }
}

/// Speaker recording what it was asked to say
#[derive(Default, Clone)]
pub struct StubSpeaker {
    pub fail: bool,
    pub spoken: Arc<Mutex<Vec<String>>>,
}

#[async_trait(?Send)]
impl Speaker for StubSpeaker {
    async fn speak(&mut self, text: &str) -> Result<()> {
        self.spoken.lock().expect("spoken lock").push(text.to_string());
        if self.fail {
            return Err(Error::Tts("speaker unplugged".to_string()));
        }
        Ok(())
    }
}
