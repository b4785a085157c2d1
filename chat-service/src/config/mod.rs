use crate::services::providers::openai::OPENAI_API_BASE;
use crate::services::relay::{PromptSource, RelayProfile};
use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;

const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Matches the official client's default request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Hosting transport the process serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adapter {
    /// Long-running server: `GET /`, `POST /chat`.
    Server,
    /// Function-style entry point serving the relay at the root path.
    Function,
}

impl Adapter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Adapter::Server => "server",
            Adapter::Function => "function",
        }
    }

    /// Relay behaviour before environment overrides.
    pub fn default_profile(&self) -> RelayProfile {
        match self {
            Adapter::Server => RelayProfile {
                prompt_source: PromptSource::Nutrition,
                max_tokens: None,
                temperature: Some(0.6),
                expose_upstream_errors: false,
            },
            Adapter::Function => RelayProfile {
                prompt_source: PromptSource::Persona,
                max_tokens: Some(300),
                temperature: None,
                expose_upstream_errors: false,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub common: core_config::Config,
    pub adapter: Adapter,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub openai: OpenAiSettings,
    pub relay: RelayProfile,
}

#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub api_key: Secret<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl ChatConfig {
    pub fn load(adapter: Adapter) -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        let timeout = get_env(
            "OPENAI_TIMEOUT_SECS",
            Some(&DEFAULT_TIMEOUT_SECS.to_string()),
            is_prod,
        )?;

        Ok(ChatConfig {
            common: common_config,
            adapter,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            openai: OpenAiSettings {
                api_key: Secret::new(get_env("OPENAI_API_KEY", None, is_prod)?),
                base_url: get_env("OPENAI_BASE_URL", Some(OPENAI_API_BASE), is_prod)?,
                model: get_env("OPENAI_MODEL", Some(DEFAULT_MODEL), is_prod)?,
                timeout_secs: parse_value("OPENAI_TIMEOUT_SECS", &timeout)?,
            },
            relay: relay_profile(adapter, |key| env::var(key).ok())?,
        })
    }
}

/// Adapter defaults with `CHAT_*` overrides applied.
///
/// `CHAT_MAX_TOKENS` and `CHAT_TEMPERATURE` accept `none` to clear the
/// default and defer to the provider.
fn relay_profile(
    adapter: Adapter,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<RelayProfile, AppError> {
    let mut profile = adapter.default_profile();

    if let Some(source) = lookup("CHAT_PROMPT_SOURCE") {
        profile.prompt_source = parse_value("CHAT_PROMPT_SOURCE", &source)?;
    }
    if let Some(max_tokens) = lookup("CHAT_MAX_TOKENS") {
        profile.max_tokens = parse_optional("CHAT_MAX_TOKENS", &max_tokens)?;
    }
    if let Some(temperature) = lookup("CHAT_TEMPERATURE") {
        profile.temperature = parse_optional("CHAT_TEMPERATURE", &temperature)?;
    }
    if let Some(expose) = lookup("CHAT_EXPOSE_UPSTREAM_ERRORS") {
        profile.expose_upstream_errors = parse_value("CHAT_EXPOSE_UPSTREAM_ERRORS", &expose)?;
    }

    Ok(profile)
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!("{} has invalid value '{}': {}", key, raw, e))
    })
}

fn parse_optional<T>(key: &str, raw: &str) -> Result<Option<T>, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if raw.trim().eq_ignore_ascii_case("none") {
        Ok(None)
    } else {
        parse_value(key, raw).map(Some)
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}
