//! Generative-language backend abstraction

mod gemini;

use async_trait::async_trait;

use crate::Result;
use crate::conversation::Turn;
use crate::dispatch::{ActionRequest, ActionSchema};

pub use gemini::{DEFAULT_GEMINI_MODEL, GeminiClient};

/// Everything the backend needs for one generation step
#[derive(Debug, Clone, Copy)]
pub struct BackendRequest<'a> {
    pub system_instruction: &'a str,
    pub turns: &'a [Turn],
    pub actions: &'a [ActionSchema],
}

/// One generation step's outcome
///
/// `final_text` is authoritative only when `action_requests` is empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackendResponse {
    pub final_text: Option<String>,
    /// Requested actions, in the order the backend emitted them
    pub action_requests: Vec<ActionRequest>,
}

impl BackendResponse {
    /// A plain text answer
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            final_text: Some(text.into()),
            action_requests: Vec::new(),
        }
    }

    /// A single action request
    #[must_use]
    pub fn action(request: ActionRequest) -> Self {
        Self {
            final_text: None,
            action_requests: vec![request],
        }
    }
}

/// A generative-language model that can request actions
#[async_trait]
pub trait Backend: Send + Sync {
    /// Run one generation step over the conversation so far
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Backend`] if the backend cannot be reached or
    /// answers with something unusable
    async fn generate(&self, request: BackendRequest<'_>) -> Result<BackendResponse>;
}
