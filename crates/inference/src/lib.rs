pub mod annotate;
pub mod backend;
pub mod classes;
pub mod config;
pub mod http;
pub mod logging;
pub mod processing;
pub mod service;

// Re-export commonly used types for convenience
pub use backend::{InferenceBackend, InferenceOutput};
pub use config::InferenceConfig;
pub use service::{DetectionResult, Detector};
