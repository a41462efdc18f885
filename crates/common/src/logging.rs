use crate::config::{Environment, LogLevel};
use opentelemetry::global;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global subscriber: pretty output in development, JSON in
/// production. `RUST_LOG` takes precedence over `log_level` when set.
///
/// Spans are bridged to whatever tracer provider is global at this point, so
/// spans go nowhere unless [`crate::TelemetryGuard`] installed one first.
pub fn setup_logging(service_name: &str, log_level: LogLevel, environment: Environment) {
    let otel_layer =
        tracing_opentelemetry::layer().with_tracer(global::tracer(service_name.to_string()));

    let registry = tracing_subscriber::registry()
        .with(build_env_filter(log_level))
        .with(otel_layer);

    match environment {
        Environment::Production => registry.with(fmt::layer().json().with_level(true)).init(),
        Environment::Development => registry.with(fmt::layer().pretty().with_ansi(true)).init(),
    }
}

pub(crate) fn build_env_filter(log_level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level.as_str()))
}
