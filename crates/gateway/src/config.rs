use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

pub use common::{Environment, LogLevel};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub log_level: LogLevel,
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub ai_backend_url: String,
    pub upload_dir: PathBuf,
    pub results_dir: PathBuf,
    pub static_dir: PathBuf,
    pub health_timeout_secs: u64,
    pub detect_timeout_secs: u64,
    pub model_info_timeout_secs: u64,
    pub max_upload_bytes: usize,
    #[serde(default)]
    pub otel_endpoint: Option<String>,
}

impl Config {
    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            health: Duration::from_secs(self.health_timeout_secs),
            detect: Duration::from_secs(self.detect_timeout_secs),
            model_info: Duration::from_secs(self.model_info_timeout_secs),
        }
    }
}

/// Per-call timeouts for requests to the detection service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub health: Duration,
    pub detect: Duration,
    pub model_info: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            health: Duration::from_secs(5),
            detect: Duration::from_secs(30),
            model_info: Duration::from_secs(10),
        }
    }
}

pub fn get_configuration() -> Result<Config, config::ConfigError> {
    let config = config::Config::builder()
        .set_default("log_level", "info")?
        .set_default("environment", "development")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", 5000)?
        .set_default("ai_backend_url", "http://localhost:5001")?
        .set_default("upload_dir", "uploads")?
        .set_default("results_dir", "results")?
        .set_default("static_dir", "static")?
        .set_default("health_timeout_secs", 5)?
        .set_default("detect_timeout_secs", 30)?
        .set_default("model_info_timeout_secs", 10)?
        .set_default("max_upload_bytes", 32 * 1024 * 1024)?
        .add_source(
            config::Environment::with_prefix("GATEWAY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let config: Config = config.try_deserialize::<Config>()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    #[serial]
    fn test_defaults() {
        let config = get_configuration().unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.ai_backend_url, "http://localhost:5001");
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.results_dir, PathBuf::from("results"));
        assert_eq!(config.timeouts(), Timeouts::default());
        assert!(config.otel_endpoint.is_none());
    }

    #[test]
    #[serial]
    fn test_environment_overrides() {
        unsafe {
            env::set_var("GATEWAY_AI_BACKEND_URL", "http://ai-backend:5001/");
            env::set_var("GATEWAY_PORT", "8080");
            env::set_var("GATEWAY_LOG_LEVEL", "debug");
            env::set_var("GATEWAY_ENVIRONMENT", "production");
        }

        let config = get_configuration();

        unsafe {
            env::remove_var("GATEWAY_AI_BACKEND_URL");
            env::remove_var("GATEWAY_PORT");
            env::remove_var("GATEWAY_LOG_LEVEL");
            env::remove_var("GATEWAY_ENVIRONMENT");
        }

        let config = config.unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.ai_backend_url, "http://ai-backend:5001/");
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.environment, Environment::Production);
    }

    #[test]
    #[serial]
    fn test_unknown_environment_is_rejected() {
        unsafe { env::set_var("GATEWAY_ENVIRONMENT", "staging") };
        let config = get_configuration();
        unsafe { env::remove_var("GATEWAY_ENVIRONMENT") };

        assert!(config.is_err());
    }
}
