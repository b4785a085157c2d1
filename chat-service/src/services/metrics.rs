//! Prometheus metrics for chat-service.

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::{Once, OnceLock};

// Global registry
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub static CHAT_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static CHAT_UPSTREAM_LATENCY_SECONDS: OnceLock<HistogramVec> = OnceLock::new();
pub static CHAT_UPSTREAM_ERRORS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static CHAT_TOKENS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize all metrics. Later calls are no-ops.
pub fn init_metrics() {
    static INIT: Once = Once::new();
    INIT.call_once(register_metrics);
}

fn register_metrics() {
    let registry = Registry::new();

    let requests_total = match IntCounterVec::new(
        Opts::new("chat_requests_total", "Total chat requests by outcome"),
        &["adapter", "outcome"], // outcome: ok, invalid, upstream_error
    ) {
        Ok(metric) => metric,
        Err(e) => {
            tracing::error!(error = %e, "Failed to create chat_requests_total metric");
            return;
        }
    };

    let upstream_latency = match HistogramVec::new(
        HistogramOpts::new(
            "chat_upstream_latency_seconds",
            "Completion provider latency in seconds",
        )
        .buckets(vec![0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["adapter", "provider"],
    ) {
        Ok(metric) => metric,
        Err(e) => {
            tracing::error!(error = %e, "Failed to create chat_upstream_latency_seconds metric");
            return;
        }
    };

    let upstream_errors = match IntCounterVec::new(
        Opts::new("chat_upstream_errors_total", "Completion provider failures"),
        &["provider", "kind"],
    ) {
        Ok(metric) => metric,
        Err(e) => {
            tracing::error!(error = %e, "Failed to create chat_upstream_errors_total metric");
            return;
        }
    };

    let tokens_total = match IntCounterVec::new(
        Opts::new("chat_tokens_total", "Tokens reported by the completion provider"),
        &["provider", "model", "type"], // type: prompt, completion
    ) {
        Ok(metric) => metric,
        Err(e) => {
            tracing::error!(error = %e, "Failed to create chat_tokens_total metric");
            return;
        }
    };

    for collector in [
        Box::new(requests_total.clone()) as Box<dyn prometheus::core::Collector>,
        Box::new(upstream_latency.clone()),
        Box::new(upstream_errors.clone()),
        Box::new(tokens_total.clone()),
    ] {
        if let Err(e) = registry.register(collector) {
            tracing::error!(error = %e, "Failed to register chat metric");
            return;
        }
    }

    let _ = REGISTRY.set(registry);
    let _ = CHAT_REQUESTS_TOTAL.set(requests_total);
    let _ = CHAT_UPSTREAM_LATENCY_SECONDS.set(upstream_latency);
    let _ = CHAT_UPSTREAM_ERRORS_TOTAL.set(upstream_errors);
    let _ = CHAT_TOKENS_TOTAL.set(tokens_total);

    tracing::info!("Prometheus metrics initialized");
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();

    let registry = match REGISTRY.get() {
        Some(r) => r,
        None => return "# Metrics registry not initialized\n".to_string(),
    };

    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return format!("# Failed to encode metrics: {}\n", e);
    }

    String::from_utf8(buffer)
        .unwrap_or_else(|e| format!("# Failed to convert metrics to UTF-8: {}\n", e))
}

/// Record a finished chat request.
pub fn record_chat_request(adapter: &str, outcome: &str) {
    if let Some(counter) = CHAT_REQUESTS_TOTAL.get() {
        counter.with_label_values(&[adapter, outcome]).inc();
    }
}

/// Record provider latency.
pub fn record_upstream_latency(adapter: &str, provider: &str, duration_secs: f64) {
    if let Some(histogram) = CHAT_UPSTREAM_LATENCY_SECONDS.get() {
        histogram
            .with_label_values(&[adapter, provider])
            .observe(duration_secs);
    }
}

/// Record a provider error.
pub fn record_upstream_error(provider: &str, kind: &str) {
    if let Some(counter) = CHAT_UPSTREAM_ERRORS_TOTAL.get() {
        counter.with_label_values(&[provider, kind]).inc();
    }
}

/// Record token usage for a completed request.
pub fn record_tokens(provider: &str, model: &str, prompt_tokens: u32, completion_tokens: u32) {
    if let Some(counter) = CHAT_TOKENS_TOTAL.get() {
        counter
            .with_label_values(&[provider, model, "prompt"])
            .inc_by(u64::from(prompt_tokens));
        counter
            .with_label_values(&[provider, model, "completion"])
            .inc_by(u64::from(completion_tokens));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposes_recorded_requests() {
        init_metrics();
        init_metrics();
        record_chat_request("server", "ok");

        let text = get_metrics();
        assert!(text.contains("chat_requests_total"));
        assert!(text.contains("adapter=\"server\""));
    }
}
