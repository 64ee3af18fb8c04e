//! Chat-completion seam and the retrying client that never raises.

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::retry::{with_retry, RetryPolicy};
use crate::Result;

/// System instruction sent with every completion attempt.
pub const SYSTEM_PROMPT: &str = "You are a helpful research assistant. \
     Provide clear, accurate answers based on the research papers provided.";

/// One attempt against an external chat-completion endpoint.
#[async_trait]
pub trait ChatService: Send + Sync {
    async fn chat(&self, system: &str, user: &str) -> Result<String>;
}

/// Retrying completion client with a degrade-to-value failure policy:
/// callers always receive text, never an error.
pub struct CompletionClient<C> {
    service: C,
    policy: RetryPolicy,
}

impl<C: ChatService> CompletionClient<C> {
    pub fn new(service: C, policy: RetryPolicy) -> Self {
        Self { service, policy }
    }

    /// Generate text for `prompt`, retrying faults under the shared policy.
    ///
    /// The first fault-free attempt's text is returned unvalidated. When
    /// every attempt faults, the terminal fault is folded into a readable
    /// message so the interaction still renders something.
    #[instrument(skip(self, prompt))]
    pub async fn complete(&self, prompt: &str) -> String {
        let service = &self.service;
        match with_retry(&self.policy, "completion", || {
            service.chat(SYSTEM_PROMPT, prompt)
        })
        .await
        {
            Ok(text) => {
                debug!(chars = text.len(), "Completion succeeded");
                text
            }
            Err(e) => format!(
                "Error generating response after {} attempts: {}",
                self.policy.max_attempts, e
            ),
        }
    }
}
