use log::{debug, warn};
use std::borrow::Cow;
use std::time::Duration;

use super::client::GenerationBackend;
use super::types::{AttemptFailure, FailureKind, Generation, GenerationParams, GenerationRequest};
use crate::output::Reporter;

/// Characters per context unit assumed when sizing prompts.
pub const CHARS_PER_UNIT: usize = 4;

/// Room left for the notice when a prompt is cut.
const TRUNCATION_MARGIN: usize = 100;

pub const TRUNCATION_NOTICE: &str = "\n\n[Content truncated to fit the model context window]";

/// Bounded retry with a fixed pause between attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_secs(5),
        }
    }
}

/// How a work list is split and paced.
#[derive(Debug, Clone, Copy)]
pub struct BatchPlan {
    pub size: usize,
    /// Pause after every batch except the last
    pub delay: Duration,
}

/// Splits `items` into order-preserving batches of at most `size` items.
pub fn partition<T>(items: &[T], size: usize) -> Vec<&[T]> {
    items.chunks(size.max(1)).collect()
}

/// Cuts prompts that exceed `context_budget * 4` characters down to
/// `context_budget * 4 - 100` characters plus [`TRUNCATION_NOTICE`].
pub fn truncate_prompt(prompt: &str, context_budget: u32) -> Cow<'_, str> {
    let limit = context_budget as usize * CHARS_PER_UNIT;
    if prompt.chars().count() <= limit {
        return Cow::Borrowed(prompt);
    }

    let keep = limit.saturating_sub(TRUNCATION_MARGIN);
    let cut = prompt
        .char_indices()
        .nth(keep)
        .map_or(prompt.len(), |(i, _)| i);

    let mut truncated = String::with_capacity(cut + TRUNCATION_NOTICE.len());
    truncated.push_str(&prompt[..cut]);
    truncated.push_str(TRUNCATION_NOTICE);
    Cow::Owned(truncated)
}

/// Drives a [`GenerationBackend`] one request at a time.
///
/// Every attempt is preceded by a readiness probe. Failures are retried
/// with a fixed delay and, once the attempts are exhausted, returned as
/// [`Generation::Failure`] instead of an error so callers keep going.
pub struct RequestOrchestrator<B: GenerationBackend> {
    backend: B,
    params: GenerationParams,
    retry: RetryPolicy,
}

impl<B: GenerationBackend> RequestOrchestrator<B> {
    pub fn new(backend: B, params: GenerationParams, retry: RetryPolicy) -> Self {
        Self {
            backend,
            params,
            retry,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Submits `prompt` with the default parameters.
    pub async fn submit(&self, prompt: &str) -> Generation {
        self.submit_with(prompt, self.params).await
    }

    pub async fn submit_with(&self, prompt: &str, params: GenerationParams) -> Generation {
        let request = GenerationRequest {
            prompt: truncate_prompt(prompt, params.context_budget).into_owned(),
            params,
        };
        if request.prompt.len() < prompt.len() {
            debug!(
                "Prompt truncated from {} to {} bytes",
                prompt.len(),
                request.prompt.len()
            );
        }

        let max_retries = self.retry.max_retries.max(1);
        let mut last_failure = AttemptFailure::new(FailureKind::Connectivity, "no attempt made");

        for attempt in 1..=max_retries {
            match self.attempt(&request).await {
                Ok(text) => return Generation::Success(text),
                Err(failure) => {
                    warn!("Generation attempt {attempt}/{max_retries} failed: {failure}");
                    last_failure = failure;
                    if attempt < max_retries {
                        tokio::time::sleep(self.retry.delay).await;
                    }
                }
            }
        }

        Generation::Failure {
            kind: last_failure.kind,
            detail: last_failure.detail,
            attempts: max_retries,
        }
    }

    async fn attempt(&self, request: &GenerationRequest) -> Result<String, AttemptFailure> {
        if !self.backend.is_ready().await {
            return Err(AttemptFailure::new(
                FailureKind::Connectivity,
                "backend is not ready",
            ));
        }
        self.backend.generate(request).await
    }

    /// Generates one result per item, in input order.
    ///
    /// Items are processed in batches of `plan.size`, sleeping `plan.delay`
    /// between batches. `reporter.progress` is called after every item.
    pub async fn submit_batch<T, K, P>(
        &self,
        items: &[T],
        key: K,
        prompt: P,
        plan: BatchPlan,
        reporter: &dyn Reporter,
    ) -> Vec<(String, Generation)>
    where
        K: Fn(&T) -> String,
        P: Fn(&T) -> String,
    {
        let total = items.len();
        let batches = partition(items, plan.size);
        let batch_count = batches.len();
        let mut results = Vec::with_capacity(total);

        for (index, batch) in batches.into_iter().enumerate() {
            debug!(
                "Processing batch {}/{batch_count} ({} items)",
                index + 1,
                batch.len()
            );

            for item in batch {
                let item_key = key(item);
                let generation = self.submit(&prompt(item)).await;
                if let Generation::Failure { detail, .. } = &generation {
                    reporter.warn(&format!("Generation failed for {item_key}: {detail}"));
                }
                reporter.progress(results.len() + 1, total, &item_key);
                results.push((item_key, generation));
            }

            if index + 1 < batch_count && !plan.delay.is_zero() {
                debug!("Pausing {}s before next batch", plan.delay.as_secs_f32());
                tokio::time::sleep(plan.delay).await;
            }
        }

        results
    }

    /// Releases backend resources; failures are only logged.
    pub async fn release(&self) {
        if let Err(e) = self.backend.release().await {
            warn!("Failed to release generation backend: {e}");
        }
    }
}
