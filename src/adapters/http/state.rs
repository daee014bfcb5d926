use std::sync::Arc;
use crate::application::services::{CameraService, DetectionService};
use crate::config::AppConfig;

/// Shared state for the Axum handlers. Holds the use-case services, not adapters.
#[derive(Clone)]
pub struct HttpState {
    pub camera: Arc<CameraService>,
    /// Image submission, inference and the observable result store.
    pub detection: Arc<DetectionService>,
    pub config: Arc<AppConfig>,
}

#[cfg(test)]
impl HttpState {
    /// State over in-memory ports with the default config.
    pub fn in_memory(engine: Option<Arc<dyn crate::application::ports::InferencePort>>) -> Self {
        use crate::application::testing::{camera_service, detection_service};
        Self {
            camera: Arc::new(camera_service()),
            detection: Arc::new(detection_service(engine)),
            config: Arc::new(AppConfig::default()),
        }
    }
}
