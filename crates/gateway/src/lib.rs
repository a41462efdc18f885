pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod routes;
pub mod service;
pub mod state;
pub mod storage;

pub use client::{ClientError, DetectorClient};
pub use error::GatewayError;
pub use service::UploadService;
pub use state::AppState;
pub use storage::ResultStore;
