//! Text completion: send one prompt to the model, get one answer back.
//!
//! The pipeline talks to the model only through [`CompletionClient`]. The
//! production implementation, [`LlmCompletionClient`], wraps an
//! `edgequake-llm` provider; tests substitute a scripted client so the
//! orchestration can be exercised without network access.
//!
//! A request is sent once. Transport errors and timeouts come back as
//! [`PipelineError::CollaboratorFailure`] / [`PipelineError::CollaboratorTimeout`]
//! and the caller decides what to do with them.

use crate::error::PipelineError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Anything that can turn a prompt into raw model text.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Complete `prompt` at the given sampling temperature.
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, PipelineError>;
}

/// [`CompletionClient`] backed by an `edgequake-llm` provider.
pub struct LlmCompletionClient {
    provider: Arc<dyn LLMProvider>,
    max_tokens: usize,
    timeout: Duration,
}

impl LlmCompletionClient {
    pub fn new(provider: Arc<dyn LLMProvider>, max_tokens: usize, timeout: Duration) -> Self {
        Self {
            provider,
            max_tokens,
            timeout,
        }
    }
}

#[async_trait]
impl CompletionClient for LlmCompletionClient {
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, PipelineError> {
        let start = Instant::now();
        let messages = vec![ChatMessage::user(prompt)];
        let options = build_options(temperature, self.max_tokens);

        let response = tokio::time::timeout(self.timeout, self.provider.chat(&messages, Some(&options)))
            .await
            .map_err(|_| {
                warn!("Completion timed out after {:?}", self.timeout);
                PipelineError::CollaboratorTimeout {
                    secs: self.timeout.as_secs(),
                }
            })?
            .map_err(|e| {
                warn!("Completion failed: {}", e);
                PipelineError::CollaboratorFailure {
                    message: e.to_string(),
                }
            })?;

        debug!(
            "Completion: {} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );
        Ok(response.content)
    }
}

fn build_options(temperature: f32, max_tokens: usize) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(temperature),
        max_tokens: Some(max_tokens),
        ..Default::default()
    }
}
