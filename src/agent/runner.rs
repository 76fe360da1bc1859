//! Bounded backend/action round-trip loop for one utterance

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::backend::{Backend, BackendRequest};
use crate::conversation::{Conversation, Utterance};
use crate::dispatch::{ActionRequest, ActionResult, DispatchTable};
use crate::{Error, Result};

/// Round-trips allowed before a command is abandoned
pub const DEFAULT_MAX_ROUND_TRIPS: usize = 8;

/// Where a loop run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    AwaitingBackend,
    ExecutingAction,
    Done,
    Failed,
}

/// Progress notifications emitted while a command runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopEvent {
    /// An action is about to be dispatched
    ActionStarted {
        round: usize,
        name: String,
        /// Short display summary extracted from arguments
        invocation: String,
    },
    /// An action finished
    ActionFinished {
        round: usize,
        name: String,
        invocation: String,
        is_error: bool,
    },
}

/// Extract a short display label from action arguments
/// Tries the declared argument names; falls back to truncated raw args
fn summarize_invocation(name: &str, args: &Map<String, Value>) -> String {
    for field in ["name", "phoneNumber", "city", "title"] {
        if let Some(s) = args.get(field).and_then(Value::as_str) {
            let truncated: String = s.chars().take(60).collect();
            return format!("{name}: {truncated}");
        }
    }
    let raw = Value::Object(args.clone()).to_string();
    format!("{name}: {}", raw.chars().take(60).collect::<String>())
}

fn enter(state: &mut LoopState, next: LoopState) {
    tracing::trace!(from = ?*state, to = ?next, "command loop transition");
    *state = next;
}

/// Drives one utterance to a spoken answer
///
/// Each run owns its [`Conversation`]; nothing is shared between runs.
pub struct CommandLoop {
    backend: Arc<dyn Backend>,
    dispatch: DispatchTable,
    max_round_trips: usize,
    notify: Option<mpsc::Sender<LoopEvent>>,
}

impl CommandLoop {
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, dispatch: DispatchTable) -> Self {
        Self {
            backend,
            dispatch,
            max_round_trips: DEFAULT_MAX_ROUND_TRIPS,
            notify: None,
        }
    }

    /// Override the round-trip bound
    #[must_use]
    pub const fn with_max_round_trips(mut self, bound: usize) -> Self {
        self.max_round_trips = bound;
        self
    }

    /// Emit [`LoopEvent`]s to a channel
    #[must_use]
    pub fn with_notify(mut self, notify: mpsc::Sender<LoopEvent>) -> Self {
        self.notify = Some(notify);
        self
    }

    #[must_use]
    pub const fn max_round_trips(&self) -> usize {
        self.max_round_trips
    }

    /// Process a recorded utterance and return the text to speak
    ///
    /// # Errors
    ///
    /// Returns [`Error::Backend`] if the backend fails or gives an empty
    /// answer, and [`Error::LoopExceeded`] if the backend keeps requesting
    /// actions past the bound
    pub async fn run(&self, utterance: Utterance) -> Result<String> {
        let instruction = crate::prompt::system_instruction(&chrono::Local::now());
        self.run_conversation(Conversation::new(instruction, utterance))
            .await
    }

    /// Drive an already-seeded conversation to its final text
    ///
    /// # Errors
    ///
    /// Same as [`Self::run`]
    pub async fn run_conversation(&self, mut conversation: Conversation) -> Result<String> {
        let mut state = LoopState::AwaitingBackend;

        loop {
            let request = BackendRequest {
                system_instruction: conversation.system_instruction(),
                turns: conversation.turns(),
                actions: self.dispatch.schemas(),
            };

            let response = match self.backend.generate(request).await {
                Ok(response) => response,
                Err(e) => {
                    enter(&mut state, LoopState::Failed);
                    tracing::error!(error = %e, "backend call failed");
                    return Err(match e {
                        Error::Backend(_) => e,
                        other => Error::Backend(other.to_string()),
                    });
                }
            };

            // Only the first requested action runs; the backend sees its
            // result and may ask again
            let Some(action) = response.action_requests.into_iter().next() else {
                return match response.final_text.filter(|t| !t.trim().is_empty()) {
                    Some(text) => {
                        enter(&mut state, LoopState::Done);
                        tracing::info!(
                            rounds = conversation.action_rounds(),
                            "command completed"
                        );
                        Ok(text.trim().to_string())
                    }
                    None => {
                        enter(&mut state, LoopState::Failed);
                        Err(Error::Backend("backend returned an empty response".to_string()))
                    }
                };
            };

            let rounds = conversation.action_rounds();
            if rounds >= self.max_round_trips {
                enter(&mut state, LoopState::Failed);
                tracing::warn!(
                    bound = self.max_round_trips,
                    action = %action.name,
                    "round-trip bound reached"
                );
                return Err(Error::LoopExceeded {
                    bound: self.max_round_trips,
                });
            }

            enter(&mut state, LoopState::ExecutingAction);
            let result = self.execute(rounds + 1, &action).await;
            conversation.push_action_round(action, result);
            enter(&mut state, LoopState::AwaitingBackend);
        }
    }

    async fn execute(&self, round: usize, action: &ActionRequest) -> ActionResult {
        let invocation = summarize_invocation(&action.name, &action.arguments);

        if let Some(n) = &self.notify {
            let _ = n
                .send(LoopEvent::ActionStarted {
                    round,
                    name: action.name.clone(),
                    invocation: invocation.clone(),
                })
                .await;
        }

        let result = self.dispatch.dispatch(action).await;

        if let Some(n) = &self.notify {
            let _ = n
                .send(LoopEvent::ActionFinished {
                    round,
                    name: action.name.clone(),
                    invocation,
                    is_error: !result.is_success(),
                })
                .await;
        }

        result
    }
}
