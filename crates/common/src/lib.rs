pub mod config;
pub mod logging;
#[cfg(feature = "async")]
pub mod shutdown;
pub mod telemetry;

pub use config::{Environment, LogLevel};
pub use logging::setup_logging;
#[cfg(feature = "async")]
pub use shutdown::shutdown_signal;
pub use telemetry::TelemetryGuard;

/// Sets up either OTLP export plus logging, or plain logging, depending on
/// whether a collector endpoint is configured. Keep the returned guard alive
/// for the lifetime of the process.
pub fn init_observability(
    service_name: &str,
    otel_endpoint: Option<&str>,
    log_level: LogLevel,
    environment: Environment,
) -> anyhow::Result<Option<TelemetryGuard>> {
    match otel_endpoint {
        Some(endpoint) => {
            TelemetryGuard::init(service_name, endpoint, log_level, environment).map(Some)
        }
        None => {
            setup_logging(service_name, log_level, environment);
            Ok(None)
        }
    }
}
