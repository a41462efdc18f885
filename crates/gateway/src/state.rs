use crate::service::UploadService;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<UploadService>,
    pub static_dir: PathBuf,
    pub max_upload_bytes: usize,
}
