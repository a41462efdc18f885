use axum::{
    Json, Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
    routing::post,
};
use gateway::{AppState, DetectorClient, ResultStore, UploadService, config::Timeouts, routes::router};
use http_body_util::BodyExt;
use image::{ImageFormat, Rgb, RgbImage};
use inference::{
    Detector, InferenceBackend, InferenceConfig, InferenceOutput, annotate::Annotator,
    classes::ClassNames,
};
use ndarray::{Array, IxDyn};
use schema::ModelInfo;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub const BOUNDARY: &str = "----relay-test-boundary";

/// A detector that always sees one dog in the middle of the frame.
pub struct SingleObjectBackend;

impl InferenceBackend for SingleObjectBackend {
    fn load_model(_config: &InferenceConfig) -> anyhow::Result<Self> {
        Ok(Self)
    }

    fn infer(&mut self, _images: &Array<f32, IxDyn>) -> anyhow::Result<InferenceOutput> {
        let mut predictions = Array::zeros(IxDyn(&[1, 84, 1]));
        predictions[[0, 0, 0]] = 320.0;
        predictions[[0, 1, 0]] = 320.0;
        predictions[[0, 2, 0]] = 120.0;
        predictions[[0, 3, 0]] = 90.0;
        predictions[[0, 4 + 16, 0]] = 0.87;
        Ok(InferenceOutput { predictions })
    }
}

/// Starts the detection service on an ephemeral port and returns its base URL.
pub async fn spawn_detector() -> (String, ModelInfo) {
    let config = InferenceConfig::default();
    let detector = Detector::with_parts(
        SingleObjectBackend,
        &config,
        ClassNames::coco(),
        Annotator::new(None),
    );
    let model_info = detector.model_info();

    let state = inference::http::AppState::new(Arc::new(detector), std::env::temp_dir());
    let app = inference::http::router(state, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), model_info)
}

/// Starts a stand-in detection service whose `/detect` always answers with
/// `status` and `body`; `/health` is always healthy.
pub async fn spawn_canned_detector(status: StatusCode, body: serde_json::Value) -> String {
    let app = Router::new()
        .route("/health", axum::routing::get(|| async { Json(serde_json::json!({"status": "healthy"})) }))
        .route(
            "/detect",
            post(move || {
                let body = body.clone();
                async move { (status, Json(body)) }
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

pub struct TestGateway {
    pub router: Router,
    pub dir: TempDir,
}

impl TestGateway {
    pub fn upload_dir(&self) -> PathBuf {
        self.dir.path().join("uploads")
    }

    pub fn results_dir(&self) -> PathBuf {
        self.dir.path().join("results")
    }

    pub fn file_names(&self, dir: PathBuf) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

/// Builds the relay router with scratch directories, pointed at `ai_backend_url`.
pub fn build_gateway(ai_backend_url: &str) -> TestGateway {
    let dir = tempfile::tempdir().unwrap();
    let static_dir = dir.path().join("static");
    std::fs::create_dir_all(&static_dir).unwrap();
    std::fs::write(static_dir.join("index.html"), "<h1>Object Detection</h1>").unwrap();

    let store = ResultStore::create(dir.path().join("uploads"), dir.path().join("results")).unwrap();
    let client = DetectorClient::new(ai_backend_url, Timeouts::default());

    let state = AppState {
        service: Arc::new(UploadService::new(client, store)),
        static_dir,
        max_upload_bytes: 32 * 1024 * 1024,
    };

    TestGateway {
        router: router(state),
        dir,
    }
}

/// A backend URL nothing listens on.
pub fn unreachable_backend() -> &'static str {
    "http://127.0.0.1:1"
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb([200, 180, 160]));
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

pub fn upload_request(filename: &str, content: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\n",
            filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
