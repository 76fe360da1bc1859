//! Gemini `generateContent` client

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Backend, BackendRequest, BackendResponse};
use crate::conversation::{Part, Role, Turn};
use crate::dispatch::{ActionRequest, ActionResult, ActionSchema};
use crate::{Error, Result};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Model used when none is configured
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    tools: Vec<ToolDeclarations>,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum RequestPart {
    Text(String),
    InlineData(InlineData),
    FunctionCall(FunctionCall),
    FunctionResponse(FunctionResponse),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize)]
struct FunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolDeclarations {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct FunctionDeclaration {
    name: &'static str,
    description: &'static str,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    function_call: Option<FunctionCall>,
    /// Thought summaries are not part of the answer
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Client for the Gemini API
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a client for the default model
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty
    pub fn new(api_key: SecretString) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config("Gemini API key required".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    /// Use a specific model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the client at a different host (proxies, tests)
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl Backend for GeminiClient {
    async fn generate(&self, request: BackendRequest<'_>) -> Result<BackendResponse> {
        let body = build_request(request);
        tracing::debug!(
            model = %self.model,
            turns = body.contents.len(),
            "sending generateContent request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Gemini request failed");
                Error::Backend(format!("request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map_or(body, |b| b.error.message);
            tracing::error!(status = %status, message = %message, "Gemini API error");
            return Err(Error::Backend(format!("Gemini API error {status}: {message}")));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Backend(format!("unreadable Gemini response: {e}")))?;

        parse_response(parsed)
    }
}

fn build_request(request: BackendRequest<'_>) -> GenerateRequest {
    GenerateRequest {
        system_instruction: Content {
            role: None,
            parts: vec![RequestPart::Text(request.system_instruction.to_string())],
        },
        contents: request.turns.iter().map(to_content).collect(),
        tools: vec![ToolDeclarations {
            function_declarations: request.actions.iter().map(to_declaration).collect(),
        }],
    }
}

fn to_declaration(schema: &ActionSchema) -> FunctionDeclaration {
    FunctionDeclaration {
        name: schema.name.as_str(),
        description: schema.description,
        parameters: schema.parameters_json(),
    }
}

fn to_content(turn: &Turn) -> Content {
    let role = match turn.role {
        Role::User => "user",
        Role::Model => "model",
    };

    let parts = turn
        .parts
        .iter()
        .map(|part| match part {
            Part::Text(text) => RequestPart::Text(text.clone()),
            Part::Audio(utterance) => RequestPart::InlineData(InlineData {
                mime_type: utterance.mime_type.clone(),
                data: utterance.to_base64(),
            }),
            Part::ActionRequest(request) => RequestPart::FunctionCall(FunctionCall {
                name: request.name.clone(),
                args: Value::Object(request.arguments.clone()),
            }),
            Part::ActionResult(result) => RequestPart::FunctionResponse(to_function_response(result)),
        })
        .collect();

    Content {
        role: Some(role),
        parts,
    }
}

fn to_function_response(result: &ActionResult) -> FunctionResponse {
    let response = match result {
        ActionResult::Success { payload, .. } => serde_json::json!({ "result": payload }),
        ActionResult::Failure { kind, message, .. } => {
            serde_json::json!({ "error": message, "kind": kind })
        }
    };

    FunctionResponse {
        name: result.name().to_string(),
        response,
    }
}

fn parse_response(response: GenerateResponse) -> Result<BackendResponse> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(Error::Backend(format!("Gemini returned no answer: {reason}")));
    };

    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();

    let mut text = String::new();
    let mut action_requests = Vec::new();
    for part in parts {
        if let Some(call) = part.function_call {
            action_requests.push(ActionRequest::new(call.name, call.args));
        } else if let Some(fragment) = part.text.filter(|_| !part.thought) {
            text.push_str(&fragment);
        }
    }

    tracing::debug!(
        finish_reason = candidate.finish_reason.as_deref().unwrap_or("unknown"),
        actions = action_requests.len(),
        text_len = text.len(),
        "Gemini responded"
    );

    Ok(BackendResponse {
        final_text: (!text.trim().is_empty()).then_some(text),
        action_requests,
    })
}
