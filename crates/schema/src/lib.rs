//! JSON types exchanged between the detection service, the upload gateway,
//! and the browser, plus the record persisted next to each annotated image.

mod detection;
mod record;
mod responses;

pub use detection::{BoundingBox, Detection};
pub use record::ResultRecord;
pub use responses::{
    DetectResponse, ErrorResponse, HealthResponse, ModelInfo, ResultFile, ResultListing,
    UploadResponse,
};
