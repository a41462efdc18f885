use crate::config::Config;
use common::TelemetryGuard;

pub fn setup_logging(config: &Config) -> anyhow::Result<Option<TelemetryGuard>> {
    common::init_observability(
        "gateway",
        config.otel_endpoint.as_deref(),
        config.log_level,
        config.environment,
    )
}
