//! Answer synthesis
//!
//! Builds the final prompt from a template, the assembled context, and the
//! question, then dispatches to the generation service. Retryable failures
//! (rate limits, timeouts, transient errors) get bounded exponential
//! backoff with jitter; auth and malformed-response failures surface
//! immediately. A failure is never papered over with a fabricated answer.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::Serialize;

use crate::errors::{RagError, Result};
use crate::models::{GenerationClient, ModelConfig};
use crate::rag::context::{AssembledContext, Citation};

/// Default prompt template; `{context}` and `{question}` are mandatory
pub const DEFAULT_PROMPT_TEMPLATE: &str = "Answer the question based on the context below.\n\n\
Context:\n{context}\n\nQuestion: {question}\n\nAnswer:";

/// Bounded exponential backoff settings
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

/// A grounded answer with provenance
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    /// Citations in context order
    pub sources: Vec<Citation>,
    pub model: String,
}

/// Dispatches prompts to the generation service under a retry policy
pub struct AnswerSynthesizer {
    client: Arc<dyn GenerationClient>,
    retry: RetryPolicy,
}

impl AnswerSynthesizer {
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self {
            client,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(client: Arc<dyn GenerationClient>, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// Substitute the template and generate, returning the answer with the
    /// context's citations attached.
    pub async fn synthesize(
        &self,
        question: &str,
        context: &AssembledContext,
        template: &str,
        config: &ModelConfig,
    ) -> Result<Answer> {
        if !template.contains("{context}") || !template.contains("{question}") {
            return Err(RagError::Config(
                "prompt template must contain {context} and {question} placeholders".to_string(),
            ));
        }

        let prompt = template
            .replace("{context}", &context.text)
            .replace("{question}", question);

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.client.generate(&prompt, config).await {
                Ok(text) => {
                    return Ok(Answer {
                        text,
                        sources: context.citations.clone(),
                        model: config.model.clone(),
                    })
                }
                Err(kind) if kind.is_retryable() && attempts <= self.retry.max_retries => {
                    tokio::time::sleep(backoff_delay(&self.retry, attempts)).await;
                }
                Err(kind) => {
                    let retries_exhausted = kind.is_retryable();
                    return Err(RagError::Synthesis {
                        kind,
                        attempts,
                        retries_exhausted,
                    });
                }
            }
        }
    }
}

/// Delay before retry `attempt` (1-based): base * 2^(attempt-1), capped,
/// plus up to 250ms of jitter so callers don't stampede in lockstep
fn backoff_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    let exponential = policy
        .base_delay
        .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
    let capped = exponential.min(policy.max_delay);
    let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..=250));
    capped + jitter
}
