//! Chat relay core shared by every hosting adapter.
//!
//! A request moves through validate -> build prompt -> one provider call ->
//! map outcome. Adapters only parse the body and hand it over; everything
//! that decides the response lives here.

use crate::config::Adapter;
use crate::models::{ChatRequest, ChatResponse};
use crate::services::metrics;
use crate::services::prompt::{build_system_prompt, PERSONA_PROMPT};
use crate::services::providers::{
    ChatMessage, CompletionProvider, CompletionRequest, ProviderError,
};
use service_core::error::AppError;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use validator::Validate;

/// Client-facing text for upstream failures when details stay private.
pub const UPSTREAM_ERROR_MESSAGE: &str = "Chat sunucu hatası";

/// Where the system prompt comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptSource {
    /// Fixed persona; request context is ignored.
    Persona,
    /// Persona plus the twelve-figure nutrition summary.
    Nutrition,
}

impl FromStr for PromptSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "persona" => Ok(PromptSource::Persona),
            "nutrition" => Ok(PromptSource::Nutrition),
            other => Err(format!("unknown prompt source '{}'", other)),
        }
    }
}

impl fmt::Display for PromptSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptSource::Persona => f.write_str("persona"),
            PromptSource::Nutrition => f.write_str("nutrition"),
        }
    }
}

/// Per-deployment relay behaviour.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayProfile {
    pub prompt_source: PromptSource,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Return upstream error text to clients instead of the generic message.
    pub expose_upstream_errors: bool,
}

pub struct ChatRelay {
    provider: Arc<dyn CompletionProvider>,
    model: String,
    profile: RelayProfile,
    adapter: Adapter,
}

impl ChatRelay {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        model: impl Into<String>,
        profile: RelayProfile,
        adapter: Adapter,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            profile,
            adapter,
        }
    }

    pub fn profile(&self) -> &RelayProfile {
        &self.profile
    }

    pub fn system_prompt(&self, request: &ChatRequest) -> String {
        match self.profile.prompt_source {
            PromptSource::Persona => PERSONA_PROMPT.to_string(),
            PromptSource::Nutrition => build_system_prompt(request.context.as_ref()),
        }
    }

    pub fn completion_request(&self, request: &ChatRequest) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(self.system_prompt(request)),
                ChatMessage::user(request.message.clone()),
            ],
            max_tokens: self.profile.max_tokens,
            temperature: self.profile.temperature,
        }
    }

    /// Handle one chat request end to end.
    ///
    /// Upstream failures are logged exactly once, here, and never retried.
    pub async fn respond(&self, request: &ChatRequest) -> Result<ChatResponse, AppError> {
        let adapter = self.adapter.as_str();

        if let Err(e) = request.validate() {
            metrics::record_chat_request(adapter, "invalid");
            return Err(e.into());
        }

        let completion_request = self.completion_request(request);
        let started = Instant::now();
        let result = self.provider.complete(&completion_request).await;
        metrics::record_upstream_latency(
            adapter,
            self.provider.name(),
            started.elapsed().as_secs_f64(),
        );

        match result {
            Ok(completion) => {
                let usage = completion.usage.unwrap_or_default();
                tracing::info!(
                    adapter,
                    provider = self.provider.name(),
                    model = %completion.model,
                    finish_reason = completion.finish_reason.as_deref().unwrap_or("unknown"),
                    prompt_tokens = usage.prompt_tokens,
                    completion_tokens = usage.completion_tokens,
                    "Chat completion succeeded"
                );
                metrics::record_chat_request(adapter, "ok");
                if completion.usage.is_some() {
                    metrics::record_tokens(
                        self.provider.name(),
                        &completion.model,
                        usage.prompt_tokens,
                        usage.completion_tokens,
                    );
                }
                Ok(ChatResponse {
                    reply: completion.content,
                })
            }
            Err(e) => {
                tracing::error!(
                    adapter,
                    provider = self.provider.name(),
                    kind = e.kind(),
                    error = %e,
                    "Chat completion failed"
                );
                metrics::record_chat_request(adapter, "upstream_error");
                metrics::record_upstream_error(self.provider.name(), e.kind());
                Err(self.public_error(&e))
            }
        }
    }

    fn public_error(&self, error: &ProviderError) -> AppError {
        if self.profile.expose_upstream_errors {
            AppError::UpstreamError(error.to_string())
        } else {
            AppError::UpstreamError(UPSTREAM_ERROR_MESSAGE.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MacroSet, NutritionContext, MESSAGE_REQUIRED};
    use crate::services::providers::mock::MockCompletionProvider;
    use crate::services::providers::{Role, TokenUsage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::Subscriber;
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    fn relay(provider: Arc<MockCompletionProvider>, adapter: Adapter) -> ChatRelay {
        ChatRelay::new(provider, "gpt-4o-mini", adapter.default_profile(), adapter)
    }

    fn request(message: &str, context: Option<NutritionContext>) -> ChatRequest {
        ChatRequest {
            message: message.to_string(),
            context,
        }
    }

    fn context() -> NutritionContext {
        NutritionContext {
            targets: Some(MacroSet {
                kcal: Some(1999.6),
                ..MacroSet::default()
            }),
            ..NutritionContext::default()
        }
    }

    #[tokio::test]
    async fn server_profile_sends_nutrition_prompt() {
        let provider = Arc::new(MockCompletionProvider::replying("Bol su iç."));
        let relay = relay(provider.clone(), Adapter::Server);

        let response = relay
            .respond(&request("Bugün ne yemeliyim?", Some(context())))
            .await
            .unwrap();
        assert_eq!(response.reply, "Bol su iç.");

        let sent = provider.requests();
        assert_eq!(sent.len(), 1);
        let sent = &sent[0];
        assert_eq!(sent.model, "gpt-4o-mini");
        assert_eq!(sent.max_tokens, None);
        assert_eq!(sent.temperature, Some(0.6));
        assert_eq!(sent.messages.len(), 2);
        assert_eq!(sent.messages[0].role, Role::System);
        assert!(sent.messages[0].content.contains("Hedef Kalori: 2000 kcal"));
        assert_eq!(sent.messages[1], ChatMessage::user("Bugün ne yemeliyim?"));
    }

    #[tokio::test]
    async fn function_profile_sends_persona_and_ignores_context() {
        let provider = Arc::new(MockCompletionProvider::replying("Merhaba!"));
        let relay = relay(provider.clone(), Adapter::Function);

        relay
            .respond(&request("Selam", Some(context())))
            .await
            .unwrap();

        let sent = &provider.requests()[0];
        assert_eq!(sent.messages[0], ChatMessage::system(PERSONA_PROMPT));
        assert_eq!(sent.max_tokens, Some(300));
        assert_eq!(sent.temperature, None);
    }

    #[tokio::test]
    async fn missing_message_never_reaches_provider() {
        let provider = Arc::new(MockCompletionProvider::replying("unused"));
        let relay = relay(provider.clone(), Adapter::Server);

        let err = relay.respond(&request("", None)).await.unwrap_err();

        match err {
            AppError::ValidationError(errors) => assert_eq!(
                service_core::error::validation_message(&errors),
                MESSAGE_REQUIRED
            ),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn upstream_failure_hides_details_by_default() {
        let provider = Arc::new(MockCompletionProvider::failing(ProviderError::ApiError {
            status: 401,
            message: "Incorrect API key provided: sk-***".to_string(),
        }));
        let relay = relay(provider, Adapter::Server);

        let err = relay.respond(&request("hi", None)).await.unwrap_err();
        match err {
            AppError::UpstreamError(message) => assert_eq!(message, UPSTREAM_ERROR_MESSAGE),
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn upstream_failure_exposes_details_when_enabled() {
        let provider = Arc::new(MockCompletionProvider::failing(ProviderError::RateLimited(
            "quota exceeded".to_string(),
        )));
        let profile = RelayProfile {
            expose_upstream_errors: true,
            ..Adapter::Function.default_profile()
        };
        let relay = ChatRelay::new(provider, "gpt-4o-mini", profile, Adapter::Function);

        let err = relay.respond(&request("hi", None)).await.unwrap_err();
        match err {
            AppError::UpstreamError(message) => {
                assert_eq!(message, "Rate limited: quota exceeded")
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    struct CountingLayer(Arc<AtomicUsize>);

    impl<S: Subscriber> Layer<S> for CountingLayer {
        fn on_event(&self, _event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn upstream_failure_logs_exactly_once() {
        let events = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(CountingLayer(events.clone()));
        let _guard = tracing::subscriber::set_default(subscriber);

        let provider = Arc::new(MockCompletionProvider::failing(ProviderError::NetworkError(
            "connection reset".to_string(),
        )));
        let relay = relay(provider, Adapter::Server);

        assert!(relay.respond(&request("hi", None)).await.is_err());
        assert_eq!(events.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reported_token_usage_is_counted() {
        metrics::init_metrics();
        let provider = Arc::new(MockCompletionProvider::replying("ok").with_usage(TokenUsage {
            prompt_tokens: 180,
            completion_tokens: 24,
        }));
        let relay = relay(provider, Adapter::Server);

        relay.respond(&request("hi", None)).await.unwrap();

        let text = metrics::get_metrics();
        assert!(text.contains("chat_tokens_total"));
        assert!(text.contains("provider=\"mock\""));
        assert!(text.contains("type=\"completion\""));
    }

    #[test]
    fn prompt_source_parses_case_insensitively() {
        assert_eq!("Persona".parse::<PromptSource>(), Ok(PromptSource::Persona));
        assert_eq!("NUTRITION".parse::<PromptSource>(), Ok(PromptSource::Nutrition));
        assert!("other".parse::<PromptSource>().is_err());
    }
}
