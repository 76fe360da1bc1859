//! Per-utterance conversation state

use base64::Engine;

use crate::dispatch::{ActionRequest, ActionResult};

/// One recorded user voice input
#[derive(Clone, PartialEq, Eq)]
pub struct Utterance {
    /// Encoded audio
    pub data: Vec<u8>,
    /// Media type of `data`, e.g. `audio/wav`
    pub mime_type: String,
}

impl Utterance {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }

    /// WAV-encoded utterance
    #[must_use]
    pub fn wav(data: Vec<u8>) -> Self {
        Self::new(data, "audio/wav")
    }

    /// Audio as standard base64, the way it goes on the wire
    #[must_use]
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl std::fmt::Debug for Utterance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Utterance")
            .field("bytes", &self.data.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

/// A piece of a turn
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    Audio(Utterance),
    ActionRequest(ActionRequest),
    ActionResult(ActionResult),
}

/// One message in the conversation
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Turn {
    /// The opening user turn: a short instruction plus the recording
    #[must_use]
    pub fn user_utterance(utterance: Utterance) -> Self {
        Self {
            role: Role::User,
            parts: vec![
                Part::Text("Here is my voice command.".to_string()),
                Part::Audio(utterance),
            ],
        }
    }

    #[must_use]
    pub fn action_request(request: ActionRequest) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::ActionRequest(request)],
        }
    }

    #[must_use]
    pub fn action_result(result: ActionResult) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::ActionResult(result)],
        }
    }
}

/// Turn history for a single utterance
///
/// Owned by one command loop run and dropped when it ends.
#[derive(Debug, Clone)]
pub struct Conversation {
    system_instruction: String,
    turns: Vec<Turn>,
}

impl Conversation {
    /// Start a conversation with the system instruction and the utterance
    #[must_use]
    pub fn new(system_instruction: String, utterance: Utterance) -> Self {
        Self {
            system_instruction,
            turns: vec![Turn::user_utterance(utterance)],
        }
    }

    #[must_use]
    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Record an executed action: the model's request, then its result
    pub fn push_action_round(&mut self, request: ActionRequest, result: ActionResult) {
        self.turns.push(Turn::action_request(request));
        self.turns.push(Turn::action_result(result));
    }

    /// Number of executed actions
    #[must_use]
    pub fn action_rounds(&self) -> usize {
        self.turns
            .iter()
            .filter(|t| t.parts.iter().any(|p| matches!(p, Part::ActionResult(_))))
            .count()
    }
}
