mod domain;
mod application;
mod adapters;
mod config;

use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing::{error, info, warn};

use crate::application::{
    ports::{InferencePort, ModelCatalogPort},
    services::{CameraService, DetectionService},
    store::ResultStore,
};
use crate::adapters::{
    v4l2::{camera_repo::V4l2CameraCatalog, capture::{CaptureConfig, V4l2CameraCapture}},
    onnx::{model_catalog::OnnxModelCatalog, pipeline::OnnxInferenceAdapter},
    upload::ImageUploadDecoder,
    http::{state::HttpState, router},
};
use crate::config::AppConfig;
use crate::domain::errors::{DomainError, DomainResult};

/// Resuelve y carga el modelo una sola vez. Cualquier fallo deja la
/// detección desactivada durante toda la sesión.
async fn load_engine(cfg: &AppConfig) -> DomainResult<Arc<dyn InferencePort>> {
    let resolved = OnnxModelCatalog::new().resolve(&cfg.model()).await?;
    let params = cfg.yolo_params();
    let adapter = tokio::task::spawn_blocking(move || OnnxInferenceAdapter::load(&resolved, params))
        .await
        .map_err(|e| DomainError::OperationFailed(e.to_string()))?
        .ok_or_else(|| DomainError::Unavailable("model failed to load".into()))?;
    Ok(Arc::new(adapter))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Inicializar logs (RUST_LOG=info por defecto)
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    // 2. Leer configuración desde DETECT_*
    let cfg = Arc::new(AppConfig::from_env());
    info!("🔧 Configuración: {:?}", cfg);

    // 3. Cargar el modelo (si falla, seguimos sin detección)

    let engine = match load_engine(&cfg).await {
        Ok(engine) => Some(engine),
        Err(e) => {
            error!("❌ Detección desactivada para esta sesión: {}", e);
            None
        }
    };

    // 4. Instanciar adaptadores y servicios
    let camera_service = Arc::new(CameraService::new(Arc::new(V4l2CameraCatalog::new())));
    let detection_service = Arc::new(DetectionService::new(
        Arc::new(ImageUploadDecoder::new()),
        Arc::new(V4l2CameraCapture::new(CaptureConfig::default())),
        engine,
        Arc::new(ResultStore::new()),
        cfg.conf_threshold,
    ));

    // 5. Estado de la API, router y archivos estáticos
    let state = HttpState {
        camera: camera_service,
        detection: detection_service,
        config: cfg.clone(),
    };

    if !cfg.static_dir.is_dir() {
        warn!("Directorio estático {} no encontrado, la página dará 404", cfg.static_dir.display());
    }
    let app = router(state).fallback_service(ServeDir::new(&cfg.static_dir));

    // 6. Lanzar el servidor
    info!("🚀 Detector escuchando en http://{}", cfg.bind);
    let listener = tokio::net::TcpListener::bind(&cfg.bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
