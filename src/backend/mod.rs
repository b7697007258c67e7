mod client;
mod orchestrator;
mod types;

pub use client::{GenerationBackend, OllamaClient};
pub use orchestrator::{BatchPlan, RequestOrchestrator, RetryPolicy};
pub use types::{Generation, GenerationParams};

#[cfg(test)]
pub(crate) use orchestrator::fake;
#[cfg(test)]
pub(crate) use types::{AttemptFailure, FailureKind};
