use crate::Detection;
use serde::{Deserialize, Serialize};

/// Sidecar written to `results/detections_<timestamp>.json`.
///
/// Carries no image payload; the annotated raster is stored as its own PNG.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub timestamp: String,
    pub original_filename: String,
    pub success: bool,
    pub total_detections: usize,
    pub detections: Vec<Detection>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_has_no_image_field() {
        let record = ResultRecord {
            timestamp: "20240101_120000".to_string(),
            original_filename: "original_20240101_120000_cat.png".to_string(),
            success: true,
            total_detections: 0,
            detections: Vec::new(),
        };

        let json = serde_json::to_value(&record).unwrap();
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 5);
        assert!(json.get("annotated_image_base64").is_none());
    }
}
