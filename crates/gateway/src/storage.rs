use crate::error::{GatewayError, GatewayResult};
use base64::{Engine, engine::general_purpose::STANDARD};
use schema::{ResultFile, ResultRecord};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Flat-file storage for original uploads and detection results.
///
/// Files are only ever added, never rewritten or removed.
pub struct ResultStore {
    upload_dir: PathBuf,
    results_dir: PathBuf,
}

/// A result file read back for download.
pub struct StoredFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl ResultStore {
    /// Creates both directories if they do not exist yet.
    pub fn create(upload_dir: impl Into<PathBuf>, results_dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let upload_dir = upload_dir.into();
        let results_dir = results_dir.into();
        std::fs::create_dir_all(&upload_dir)?;
        std::fs::create_dir_all(&results_dir)?;
        Ok(Self {
            upload_dir,
            results_dir,
        })
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Writes `uploads/original_<timestamp>_<filename>` and returns its name.
    pub async fn save_upload(&self, timestamp: &str, filename: &str, bytes: &[u8]) -> std::io::Result<String> {
        let name = format!("original_{}_{}", timestamp, filename);
        tokio::fs::write(self.upload_dir.join(&name), bytes).await?;
        tracing::debug!(file = %name, bytes = bytes.len(), "Saved original upload");
        Ok(name)
    }

    /// Writes `results/detections_<timestamp>.json` as pretty-printed JSON.
    pub async fn save_record(&self, record: &ResultRecord) -> GatewayResult<String> {
        let name = format!("detections_{}.json", record.timestamp);
        let json = serde_json::to_vec_pretty(record).map_err(|e| GatewayError::Save(e.to_string()))?;
        tokio::fs::write(self.results_dir.join(&name), json)
            .await
            .map_err(|e| GatewayError::Save(e.to_string()))?;
        Ok(name)
    }

    /// Decodes the base64 PNG and writes `results/annotated_<timestamp>.png`.
    pub async fn save_annotated(&self, timestamp: &str, image_base64: &str) -> GatewayResult<String> {
        let name = format!("annotated_{}.png", timestamp);
        let png = STANDARD
            .decode(image_base64)
            .map_err(|e| GatewayError::Save(e.to_string()))?;
        tokio::fs::write(self.results_dir.join(&name), png)
            .await
            .map_err(|e| GatewayError::Save(e.to_string()))?;
        Ok(name)
    }

    /// Reads a file from the results directory. Anything that is not a plain
    /// file name inside that directory is reported as not found.
    pub async fn open_result(&self, filename: &str) -> GatewayResult<StoredFile> {
        if !is_plain_file_name(filename) {
            return Err(GatewayError::NotFound);
        }

        let path = self.results_dir.join(filename);
        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => {}
            Ok(_) => return Err(GatewayError::NotFound),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(GatewayError::NotFound),
            Err(e) => return Err(e.into()),
        }

        let bytes = tokio::fs::read(&path).await?;
        Ok(StoredFile {
            filename: filename.to_string(),
            bytes,
        })
    }

    /// Lists the results directory, newest first.
    pub async fn list(&self) -> GatewayResult<Vec<ResultFile>> {
        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.results_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let modified = metadata
                .modified()
                .ok()
                .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
                .map(|elapsed| elapsed.as_secs_f64())
                .unwrap_or_default();

            files.push(ResultFile {
                filename: entry.file_name().to_string_lossy().into_owned(),
                size: metadata.len(),
                modified,
            });
        }

        files.sort_by(|a, b| {
            b.modified
                .total_cmp(&a.modified)
                .then_with(|| a.filename.cmp(&b.filename))
        });
        Ok(files)
    }
}

fn is_plain_file_name(filename: &str) -> bool {
    !filename.is_empty()
        && filename != "."
        && filename != ".."
        && !filename.contains(['/', '\\'])
        && sanitize_filename::sanitize(filename) == filename
}
