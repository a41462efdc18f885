use gateway::{
    AppState, DetectorClient, ResultStore, UploadService, config::get_configuration,
    logging::setup_logging, routes::router,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_configuration()?;

    let _telemetry = setup_logging(&config)?;

    tracing::info!(config = ?config, "Loaded configuration");

    let store = ResultStore::create(&config.upload_dir, &config.results_dir)?;
    let client = DetectorClient::new(config.ai_backend_url.as_str(), config.timeouts());

    if !client.is_healthy().await {
        tracing::warn!(
            url = %client.base_url(),
            "Detection service is not reachable yet, uploads will return 503 until it is"
        );
    }

    let state = AppState {
        service: Arc::new(UploadService::new(client, store)),
        static_dir: config.static_dir.clone(),
        max_upload_bytes: config.max_upload_bytes,
    };
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Upload service listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(common::shutdown_signal())
        .await?;

    tracing::info!("Upload service stopped");
    Ok(())
}
