use async_trait::async_trait;
use image::RgbImage;
use std::sync::Arc;

use crate::domain::{
    camera::{CameraId, CameraInfo},
    detection::Detection,
    errors::DomainResult,
    model::{ModelId, ResolvedModel},
};

#[async_trait]
pub trait CameraCatalogPort: Send + Sync {
    async fn list_cameras(&self) -> DomainResult<Vec<CameraInfo>>;
}

/// Grabs a single decoded frame from a camera.
#[async_trait]
pub trait CameraCapturePort: Send + Sync {
    async fn capture(&self, camera: &CameraId) -> DomainResult<RgbImage>;
}

/// Turns uploaded bytes (JPEG, PNG, ...) into a raster.
#[async_trait]
pub trait ImageDecodePort: Send + Sync {
    async fn decode(&self, bytes: Vec<u8>) -> DomainResult<RgbImage>;
}

#[async_trait]
pub trait ModelCatalogPort: Send + Sync {
    async fn resolve(&self, model: &ModelId) -> DomainResult<ResolvedModel>;
}

/// Request/response boundary to the inference engine. Boxes come back
/// normalized with a bottom-left origin, in engine order.
#[async_trait]
pub trait InferencePort: Send + Sync {
    async fn detect(&self, image: Arc<RgbImage>) -> DomainResult<Vec<Detection>>;
}
