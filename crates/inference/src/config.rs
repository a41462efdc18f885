use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub use common::{Environment, LogLevel};

pub const DEFAULT_INPUT_SIZE: (u32, u32) = (640, 640);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionProvider {
    Cpu,
    Cuda,
}

impl FromStr for ExecutionProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda),
            other => anyhow::bail!(
                "{} is not a supported execution provider. Use either `cpu` or `cuda`.",
                other
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub environment: Environment,
    pub log_level: LogLevel,
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    pub input_size: (u32, u32),
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
    pub execution_provider: ExecutionProvider,
    pub intra_threads: usize,
    pub class_names_path: Option<PathBuf>,
    pub font_path: Option<PathBuf>,
    pub temp_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub otel_endpoint: Option<String>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            log_level: LogLevel::Info,
            host: "0.0.0.0".to_string(),
            port: 5001,
            model_path: PathBuf::from("models/yolov8n.onnx"),
            input_size: DEFAULT_INPUT_SIZE,
            confidence_threshold: 0.25,
            iou_threshold: 0.7,
            max_detections: 300,
            execution_provider: ExecutionProvider::Cpu,
            intra_threads: 4,
            class_names_path: None,
            font_path: None,
            temp_dir: env::temp_dir(),
            max_upload_bytes: 32 * 1024 * 1024,
            otel_endpoint: None,
        }
    }
}

impl InferenceConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let execution_provider = match env::var("EXECUTION_PROVIDER") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.execution_provider,
        };

        let input_width = parse_or("INPUT_WIDTH", defaults.input_size.0);
        let input_height = parse_or("INPUT_HEIGHT", defaults.input_size.1);

        if input_width == 0 || input_height == 0 {
            anyhow::bail!(
                "INPUT_WIDTH and INPUT_HEIGHT must be greater than 0 (got {}x{})",
                input_width,
                input_height
            );
        }

        let confidence_threshold: f32 =
            parse_or("CONFIDENCE_THRESHOLD", defaults.confidence_threshold);
        let iou_threshold: f32 = parse_or("IOU_THRESHOLD", defaults.iou_threshold);

        if !(0.0..=1.0).contains(&confidence_threshold) || !(0.0..=1.0).contains(&iou_threshold) {
            anyhow::bail!(
                "CONFIDENCE_THRESHOLD and IOU_THRESHOLD must be within [0, 1] (got {} and {})",
                confidence_threshold,
                iou_threshold
            );
        }

        Ok(Self {
            environment: Environment::from_env(),
            log_level: LogLevel::from_env(),
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parse_or("PORT", defaults.port),
            model_path: env::var("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            input_size: (input_width, input_height),
            confidence_threshold,
            iou_threshold,
            max_detections: parse_or("MAX_DETECTIONS", defaults.max_detections),
            execution_provider,
            intra_threads: parse_or("INTRA_THREADS", defaults.intra_threads),
            class_names_path: env::var("CLASS_NAMES_PATH").ok().map(PathBuf::from),
            font_path: env::var("FONT_PATH").ok().map(PathBuf::from),
            temp_dir: env::var("TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.temp_dir),
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
            otel_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok(),
        })
    }

    /// Model name reported by `/model_info`, taken from the weights file stem.
    pub fn model_name(&self) -> String {
        self.model_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
