use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use std::time::Duration;
use url::Url;

use super::types::{
    AttemptFailure, FailureKind, GenerateBody, GenerateResponse, GenerationRequest, ModelOptions,
    TagsResponse, UnloadBody,
};
use crate::error::{RepodocError, Result};
use crate::output::Reporter;

const SYSTEM_PROMPT: &str = "You are a senior technical writer documenting a software project. \
Write accurate, concise Markdown for developers. Do not invent APIs or behavior that the \
provided material does not show.";

/// A request/response text-generation service.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Liveness probe; must return quickly.
    async fn is_ready(&self) -> bool;

    /// One generation call without retries.
    async fn generate(&self, request: &GenerationRequest) -> std::result::Result<String, AttemptFailure>;

    /// Frees whatever the backend holds for this run.
    async fn release(&self) -> Result<()>;
}

/// Client for an Ollama-compatible HTTP API.
pub struct OllamaClient {
    client: Client,
    tags_url: Url,
    generate_url: Url,
    model: String,
    timeout: Duration,
    probe_timeout: Duration,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str, timeout: Duration, probe_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("repodoc/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RepodocError::Config(format!("Failed to create HTTP client: {e}")))?;

        // A trailing slash keeps a path prefix such as `/ollama` when joining.
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base =
            Url::parse(&base).map_err(|e| RepodocError::Config(format!("Invalid base URL: {e}")))?;

        let tags_url = base
            .join("api/tags")
            .map_err(|e| RepodocError::Config(format!("Invalid tags URL: {e}")))?;
        let generate_url = base
            .join("api/generate")
            .map_err(|e| RepodocError::Config(format!("Invalid generate URL: {e}")))?;

        Ok(Self {
            client,
            tags_url,
            generate_url,
            model: model.to_string(),
            timeout,
            probe_timeout,
        })
    }

    /// Names of the models the backend has available.
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(self.tags_url.clone())
            .timeout(self.probe_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RepodocError::Backend(format!(
                "model listing returned HTTP {status}"
            )));
        }

        let tags: TagsResponse = response.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Checks that the backend answers and serves the configured model.
    ///
    /// Problems are reported as warnings; generation calls will fail and
    /// be recorded individually if the backend really is unusable.
    pub async fn initialize(&self, reporter: &dyn Reporter) {
        match self.list_models().await {
            Ok(models) => {
                let available = models
                    .iter()
                    .any(|m| m == &self.model || m.split(':').next() == Some(self.model.as_str()));
                if available {
                    info!("Backend ready with model {}", self.model);
                } else {
                    reporter.warn(&format!(
                        "Model {} is not available on the backend (found: {})",
                        self.model,
                        if models.is_empty() { "none".to_string() } else { models.join(", ") }
                    ));
                }
            }
            Err(e) => reporter.warn(&format!(
                "Generation backend at {} is not reachable: {e}",
                self.tags_url
            )),
        }
    }
}

#[async_trait]
impl GenerationBackend for OllamaClient {
    async fn is_ready(&self) -> bool {
        match self
            .client
            .get(self.tags_url.clone())
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Readiness probe failed: {e}");
                false
            }
        }
    }

    async fn generate(&self, request: &GenerationRequest) -> std::result::Result<String, AttemptFailure> {
        let body = GenerateBody {
            model: &self.model,
            prompt: &request.prompt,
            system: SYSTEM_PROMPT,
            stream: false,
            options: ModelOptions {
                temperature: request.params.temperature,
                num_ctx: request.params.context_budget,
            },
        };

        let response = self
            .client
            .post(self.generate_url.clone())
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AttemptFailure::new(
                        FailureKind::Connectivity,
                        format!("request timed out after {}s", self.timeout.as_secs()),
                    )
                } else {
                    AttemptFailure::new(FailureKind::Connectivity, e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(AttemptFailure::new(
                FailureKind::Protocol,
                format!("HTTP {status}: {}", error_text.trim()),
            ));
        }

        let generated: GenerateResponse = response.json().await.map_err(|e| {
            AttemptFailure::new(FailureKind::Protocol, format!("malformed response body: {e}"))
        })?;

        if generated.response.trim().is_empty() {
            return Err(AttemptFailure::new(
                FailureKind::EmptyResponse,
                "backend returned no text",
            ));
        }

        Ok(generated.response)
    }

    async fn release(&self) -> Result<()> {
        let response = self
            .client
            .post(self.generate_url.clone())
            .timeout(self.probe_timeout)
            .json(&UnloadBody {
                model: &self.model,
                keep_alive: 0,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RepodocError::Backend(format!(
                "model unload returned HTTP {}",
                response.status()
            )));
        }

        debug!("Released model {}", self.model);
        Ok(())
    }
}
