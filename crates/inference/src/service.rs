use crate::{
    annotate::Annotator,
    backend::{InferenceBackend, InferenceOutput},
    classes::ClassNames,
    config::InferenceConfig,
    processing::{
        post::{BoxPrediction, PostProcessor, TransformParams},
        pre::PreProcessor,
    },
};
use image::{ImageReader, RgbImage};
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use schema::{BoundingBox, Detection, ModelInfo};
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

/// Outcome of one detection call. Never an error: failures carry a message instead.
#[derive(Debug, Clone)]
pub struct DetectionResult {
    pub success: bool,
    pub detections: Vec<Detection>,
    pub annotated_image: Option<RgbImage>,
    pub error: Option<String>,
}

impl DetectionResult {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            detections: Vec::new(),
            annotated_image: None,
            error: Some(error.into()),
        }
    }

    pub fn total_detections(&self) -> usize {
        self.detections.len()
    }
}

struct Metrics {
    duration: Histogram<f64>,
    requests: Counter<u64>,
    failures: Counter<u64>,
    detections: Counter<u64>,
}

fn init_metrics(meter_name: &'static str) -> Metrics {
    let meter = global::meter(meter_name);
    let latency_buckets = [
        0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.15, 0.2, 0.3, 0.5, 0.75, 1.0, 2.0, 5.0,
    ];
    Metrics {
        duration: meter
            .f64_histogram("detection_duration_seconds")
            .with_description("Time to process one image (decode + preprocess + infer + postprocess + annotate)")
            .with_unit("s")
            .with_boundaries(latency_buckets.to_vec())
            .build(),
        requests: meter
            .u64_counter("detection_requests_total")
            .with_description("Total images submitted for detection")
            .build(),
        failures: meter
            .u64_counter("detection_failures_total")
            .with_description("Total images that failed to process")
            .build(),
        detections: meter
            .u64_counter("detection_objects_total")
            .with_description("Total detections produced")
            .build(),
    }
}

/// Model state that needs exclusive access per call.
struct Engine<B> {
    backend: B,
    preprocessor: PreProcessor,
}

/// The loaded detector, shared by every request for the life of the process.
pub struct Detector<B: InferenceBackend> {
    engine: Mutex<Engine<B>>,
    postprocessor: PostProcessor,
    annotator: Annotator,
    classes: ClassNames,
    model_name: String,
    metrics: Metrics,
}

impl<B: InferenceBackend> Detector<B> {
    pub fn new(backend: B, config: &InferenceConfig) -> anyhow::Result<Self> {
        let classes = ClassNames::load(config.class_names_path.as_deref())?;
        let annotator = Annotator::load(config.font_path.as_deref())?;
        Ok(Self::with_parts(backend, config, classes, annotator))
    }

    pub fn with_parts(
        backend: B,
        config: &InferenceConfig,
        classes: ClassNames,
        annotator: Annotator,
    ) -> Self {
        Self {
            engine: Mutex::new(Engine {
                backend,
                preprocessor: PreProcessor::new(config.input_size),
            }),
            postprocessor: PostProcessor::new(
                config.confidence_threshold,
                config.iou_threshold,
                config.max_detections,
            ),
            annotator,
            classes,
            model_name: config.model_name(),
            metrics: init_metrics("inference"),
        }
    }

    pub fn model_info(&self) -> ModelInfo {
        ModelInfo {
            model_name: self.model_name.clone(),
            classes: self.classes.all().to_vec(),
            total_classes: self.classes.count(),
        }
    }

    /// Runs detection on the image at `path`. Blocking; call from a blocking context.
    pub fn detect_path(&self, path: &Path) -> DetectionResult {
        let _span = tracing::info_span!("detect_path", path = %path.display()).entered();
        let start = Instant::now();
        self.metrics.requests.add(1, &[]);

        let result = match self.run(path) {
            Ok((detections, annotated)) => {
                self.metrics
                    .detections
                    .add(detections.len() as u64, &[]);
                DetectionResult {
                    success: true,
                    detections,
                    annotated_image: Some(annotated),
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Detection failed");
                self.metrics.failures.add(1, &[]);
                DetectionResult::failure(e.to_string())
            }
        };

        let elapsed = start.elapsed().as_secs_f64();
        self.metrics.duration.record(
            elapsed,
            &[KeyValue::new("success", result.success)],
        );
        tracing::debug!(
            elapsed_ms = elapsed * 1000.0,
            total_detections = result.total_detections(),
            success = result.success,
            "Image processed"
        );

        result
    }

    fn run(&self, path: &Path) -> anyhow::Result<(Vec<Detection>, RgbImage)> {
        let image = decode_image(path)?;
        let boxes = self.infer(&image)?;
        let detections = self.name_detections(boxes);
        let annotated = {
            let _annotate_span = tracing::info_span!("annotate").entered();
            self.annotator.draw(&image, &detections)
        };
        Ok((detections, annotated))
    }

    fn infer(&self, image: &RgbImage) -> anyhow::Result<Vec<BoxPrediction>> {
        let mut engine = self
            .engine
            .lock()
            .map_err(|_| anyhow::anyhow!("Model lock poisoned by an earlier panic"))?;

        let (input, scale, offset_x, offset_y) = engine.preprocessor.preprocess_image(image)?;

        let InferenceOutput { predictions } = {
            let _infer_span = tracing::info_span!("model_inference").entered();
            engine.backend.infer(&input)?
        };
        drop(engine);

        let transform = TransformParams {
            orig_width: image.width(),
            orig_height: image.height(),
            scale,
            offset_x,
            offset_y,
        };

        self.postprocessor
            .parse_detections(&predictions.view(), &transform)
    }

    fn name_detections(&self, boxes: Vec<BoxPrediction>) -> Vec<Detection> {
        boxes
            .into_iter()
            .map(|b| Detection {
                class_name: self.classes.name(b.class_id),
                class_id: b.class_id as u32,
                confidence: b.confidence,
                bounding_box: BoundingBox::from_corners(b.x1, b.y1, b.x2, b.y2),
            })
            .collect()
    }
}

/// Decode by content rather than extension, so mislabelled uploads still load.
fn decode_image(path: &Path) -> anyhow::Result<RgbImage> {
    let _s = tracing::info_span!("decode_image").entered();
    let image = ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| anyhow::anyhow!("Could not decode image: {}", e))?;
    Ok(image.to_rgb8())
}
