//! Mock provider implementation for testing.

use super::{Completion, CompletionProvider, CompletionRequest, ProviderError, TokenUsage};
use async_trait::async_trait;
use std::sync::Mutex;

/// Mock completion provider with a canned outcome.
///
/// Every request is recorded so tests can inspect the prompt and sampling
/// parameters the relay produced.
pub struct MockCompletionProvider {
    outcome: Result<String, ProviderError>,
    usage: Option<TokenUsage>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockCompletionProvider {
    /// Provider that answers every request with `reply`.
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            outcome: Ok(reply.into()),
            usage: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Provider that fails every request with `error`.
    pub fn failing(error: ProviderError) -> Self {
        Self {
            outcome: Err(error),
            usage: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Report `usage` with every successful completion.
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CompletionProvider for MockCompletionProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ProviderError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let content = self.outcome.clone()?;
        Ok(Completion {
            content,
            model: request.model.clone(),
            finish_reason: Some("stop".to_string()),
            usage: self.usage,
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
