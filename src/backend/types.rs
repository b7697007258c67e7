use serde::{Deserialize, Serialize};
use std::fmt;

/// Sampling parameters sent with every generation request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f64,
    /// Context window in backend units; prompts longer than four characters
    /// per unit are truncated before submission.
    pub context_budget: u32,
}

/// A prompt plus the parameters it is generated with.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub params: GenerationParams,
}

/// Why a single attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    /// Backend unreachable, not ready, or the request timed out
    Connectivity,
    /// Non-success status or a body that does not decode
    Protocol,
    /// Success status but no generated text
    EmptyResponse,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::Connectivity => "connectivity",
            FailureKind::Protocol => "protocol",
            FailureKind::EmptyResponse => "empty response",
        };
        f.write_str(label)
    }
}

/// A failed attempt, as reported by a [`GenerationBackend`](super::GenerationBackend).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    pub kind: FailureKind,
    pub detail: String,
}

impl AttemptFailure {
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.detail, self.kind)
    }
}

/// Outcome of a submission after retries.
#[derive(Debug, Clone, PartialEq)]
pub enum Generation {
    Success(String),
    Failure {
        kind: FailureKind,
        detail: String,
        attempts: u32,
    },
}

impl Generation {
    pub fn is_success(&self) -> bool {
        matches!(self, Generation::Success(_))
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Generation::Success(text) => Some(text),
            Generation::Failure { .. } => None,
        }
    }

    /// The generated text, or the failure rendered as a readable
    /// placeholder for embedding in documents.
    pub fn into_text(self) -> String {
        match self {
            Generation::Success(text) => text,
            failure => failure.to_string(),
        }
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Generation::Success(text) => f.write_str(text),
            Generation::Failure {
                kind,
                detail,
                attempts,
            } => write!(
                f,
                "Error: generation failed after {attempts} attempts ({kind}): {detail}"
            ),
        }
    }
}

// Wire types for the Ollama-compatible HTTP API.

#[derive(Debug, Deserialize)]
pub(crate) struct TagsResponse {
    #[serde(default)]
    pub models: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModelEntry {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerateBody<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub system: &'a str,
    pub stream: bool,
    pub options: ModelOptions,
}

#[derive(Debug, Serialize)]
pub(crate) struct ModelOptions {
    pub temperature: f64,
    pub num_ctx: u32,
}

/// Asks the backend to evict the model from memory.
#[derive(Debug, Serialize)]
pub(crate) struct UnloadBody<'a> {
    pub model: &'a str,
    pub keep_alive: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateResponse {
    #[serde(default)]
    pub response: String,
}
