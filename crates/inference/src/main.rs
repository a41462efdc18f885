use inference::{
    Detector, InferenceConfig,
    backend::InferenceBackend,
    http::{AppState, router},
    logging::setup_logging,
};
use std::sync::Arc;

#[cfg(feature = "ort-backend")]
use inference::backend::ort::OrtBackend as Backend;

#[cfg(not(feature = "ort-backend"))]
compile_error!("The 'ort-backend' feature must be enabled to build the inference binary");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = InferenceConfig::from_env()?;

    let _telemetry = setup_logging(&config)?;

    tracing::info!(
        config = ?config,
        "Loaded configuration"
    );

    tracing::info!("Loading inference model");
    let backend = Backend::load_model(&config)?;
    let detector = Detector::new(backend, &config)?;
    tracing::info!(
        model = %config.model_name(),
        classes = detector.model_info().total_classes,
        "Model loaded successfully"
    );

    std::fs::create_dir_all(&config.temp_dir)?;

    let state = AppState::new(Arc::new(detector), config.temp_dir.clone());
    let app = router(state, config.max_upload_bytes);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Detection service listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(common::shutdown_signal())
        .await?;

    tracing::info!("Detection service stopped");
    Ok(())
}
