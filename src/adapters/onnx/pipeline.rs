use async_trait::async_trait;
use image::RgbImage;
use std::sync::{Arc, Mutex};
use tracing::error;

use crate::adapters::onnx::yolo_engine::OnnxYoloEngine;
use crate::application::ports::InferencePort;
use crate::domain::{
    detection::Detection,
    errors::{DomainError, DomainResult},
    model::{ResolvedModel, YoloParams},
};

/// Runs the YOLO session on tokio's blocking pool so a slow model never
/// stalls the request path. Calls are serialized on the session.
pub struct OnnxInferenceAdapter {
    engine: Arc<Mutex<OnnxYoloEngine>>,
    params: YoloParams,
}

impl OnnxInferenceAdapter {
    pub fn new(engine: OnnxYoloEngine, params: YoloParams) -> Self {
        Self { engine: Arc::new(Mutex::new(engine)), params }
    }

    /// Loads the resolved model once. Failure is logged and leaves the
    /// caller without an engine for the rest of the session.
    pub fn load(model: &ResolvedModel, params: YoloParams) -> Option<Self> {
        OnnxYoloEngine::load(model)
            .map(|engine| Self::new(engine, params))
            .map_err(|e| error!("Error loading YOLO model {}: {:?}", model.path.display(), e))
            .ok()
    }
}

#[async_trait]
impl InferencePort for OnnxInferenceAdapter {
    async fn detect(&self, image: Arc<RgbImage>) -> DomainResult<Vec<Detection>> {
        let engine = self.engine.clone();
        let params = self.params.clone();

        tokio::task::spawn_blocking(move || {
            let mut engine = engine
                .lock()
                .map_err(|_| DomainError::OperationFailed("inference session poisoned".into()))?;
            engine
                .infer(&image, &params)
                .map_err(|e| DomainError::OperationFailed(format!("inference: {e:#}")))
        })
        .await
        .map_err(|e| DomainError::OperationFailed(format!("inference task: {e}")))?
    }
}
