//! Application startup and lifecycle management.
//!
//! Both hosting adapters share the same state and layer stack; they differ
//! only in which routes they mount.

use crate::config::{Adapter, ChatConfig};
use crate::handlers;
use crate::services::metrics;
use crate::services::providers::openai::{OpenAiConfig, OpenAiProvider};
use crate::services::providers::CompletionProvider;
use crate::services::ChatRelay;
use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    cors::cors_middleware,
    tracing::{request_id_middleware, request_span},
};
use service_core::observability::init_tracing;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<ChatRelay>,
    pub adapter: Adapter,
}

impl AppState {
    pub fn new(config: &ChatConfig, provider: Arc<dyn CompletionProvider>) -> Self {
        let relay = ChatRelay::new(
            provider,
            config.openai.model.clone(),
            config.relay.clone(),
            config.adapter,
        );

        Self {
            relay: Arc::new(relay),
            adapter: config.adapter,
        }
    }
}

/// Build the production provider. Called once per process.
pub fn build_provider(config: &ChatConfig) -> Result<Arc<dyn CompletionProvider>, AppError> {
    let provider = OpenAiProvider::new(OpenAiConfig {
        api_key: config.openai.api_key.clone(),
        base_url: config.openai.base_url.clone(),
        timeout: Duration::from_secs(config.openai.timeout_secs),
    })
    .map_err(|e| AppError::ConfigError(anyhow::anyhow!(e)))?;

    Ok(Arc::new(provider))
}

/// Standalone server routes.
pub fn server_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/", get(handlers::health::root))
        .route("/chat", post(handlers::chat::chat))
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .with_state(state);

    with_common_layers(router)
}

/// Function adapter routes: the relay lives at the root path.
pub fn function_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/", post(handlers::chat::chat))
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .with_state(state);

    with_common_layers(router)
}

pub fn build_router(state: AppState) -> Router {
    match state.adapter {
        Adapter::Server => server_router(state),
        Adapter::Function => function_router(state),
    }
}

fn with_common_layers(router: Router) -> Router {
    router
        // CORS innermost so preflight answers still get a request id
        .layer(from_fn(cors_middleware))
        // The relay logs upstream failures itself
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(request_span)
                .on_failure(()),
        )
        .layer(from_fn(request_id_middleware))
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the OpenAI provider.
    pub async fn build(config: ChatConfig) -> Result<Self, AppError> {
        let provider = build_provider(&config)?;
        Self::build_with_provider(config, provider).await
    }

    /// Build the application around an already constructed provider.
    pub async fn build_with_provider(
        config: ChatConfig,
        provider: Arc<dyn CompletionProvider>,
    ) -> Result<Self, AppError> {
        tracing::info!(
            adapter = config.adapter.as_str(),
            provider = provider.name(),
            model = %config.openai.model,
            prompt_source = %config.relay.prompt_source,
            max_tokens = ?config.relay.max_tokens,
            temperature = ?config.relay.temperature,
            "Initialized chat relay"
        );

        let router = build_router(AppState::new(&config, provider));

        // Port 0 picks a random port for testing
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until SIGINT/SIGTERM, letting in-flight requests finish.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

/// Process entry point shared by both binaries.
pub async fn run(adapter: Adapter) -> Result<(), AppError> {
    // Load configuration - fail fast if invalid
    let config = ChatConfig::load(adapter)?;

    init_tracing(
        &format!("chat-{}", adapter.as_str()),
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );
    metrics::init_metrics();

    let app = Application::build(config).await?;
    tracing::info!(
        adapter = adapter.as_str(),
        port = app.port(),
        "HealthPilot chat relay listening"
    );

    app.run_until_stopped().await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
