use image::RgbImage;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::{
    application::{
        ports::{CameraCapturePort, CameraCatalogPort, ImageDecodePort, InferencePort},
        store::ResultStore,
    },
    domain::{
        camera::{CameraId, CameraInfo},
        detection::filter_by_confidence,
        errors::DomainResult,
        snapshot::{summarize_detections, DetectionStatus, ImageInfo, ImageSource},
    },
};

/// Lists the capture devices the page can offer.
#[derive(Clone)]
pub struct CameraService {
    catalog: Arc<dyn CameraCatalogPort>,
}

impl CameraService {
    pub fn new(catalog: Arc<dyn CameraCatalogPort>) -> Self {
        Self { catalog }
    }

    pub async fn list_cameras(&self) -> DomainResult<Vec<CameraInfo>> {
        self.catalog.list_cameras().await
    }
}

/// Orchestrates image submission and inference.
///
/// Each submission installs the image in the [`ResultStore`] right away and
/// runs the engine on a background task. The result is written back only if
/// no newer image was submitted in the meantime. A missing engine means the
/// model failed to load: images are still shown, never with boxes.
#[derive(Clone)]
pub struct DetectionService {
    decoder: Arc<dyn ImageDecodePort>,
    camera: Arc<dyn CameraCapturePort>,
    engine: Option<Arc<dyn InferencePort>>,
    store: Arc<ResultStore>,
    threshold: f32,
}

impl DetectionService {
    pub fn new(
        decoder: Arc<dyn ImageDecodePort>,
        camera: Arc<dyn CameraCapturePort>,
        engine: Option<Arc<dyn InferencePort>>,
        store: Arc<ResultStore>,
        threshold: f32,
    ) -> Self {
        Self { decoder, camera, engine, store, threshold }
    }

    pub fn store(&self) -> &Arc<ResultStore> {
        &self.store
    }

    pub fn is_available(&self) -> bool {
        self.engine.is_some()
    }

    /// Decodes an uploaded image and submits it. On failure nothing changes.
    pub async fn submit_upload(&self, bytes: Vec<u8>) -> DomainResult<u64> {
        let image = self.decoder.decode(bytes).await.map_err(|e| {
            warn!("Upload rejected: {}", e);
            e
        })?;
        Ok(self.submit(image, ImageSource::Upload))
    }

    /// Captures one frame from `camera` and submits it. On failure nothing changes.
    pub async fn capture_from(&self, camera: CameraId) -> DomainResult<u64> {
        let image = self.camera.capture(&camera).await.map_err(|e| {
            warn!("Capture from {} failed: {}", camera.path, e);
            e
        })?;
        Ok(self.submit(image, ImageSource::Camera { path: camera.path }))
    }

    /// Installs `image` as current and starts inference in the background.
    /// Returns the generation assigned to this submission.
    pub fn submit(&self, image: RgbImage, source: ImageSource) -> u64 {
        let info = ImageInfo { width: image.width(), height: image.height(), source };
        let image = Arc::new(image);

        let Some(engine) = self.engine.clone() else {
            let generation = self.store.begin(image, info, DetectionStatus::Unavailable);
            debug!("Image #{} shown without detection (no model)", generation);
            return generation;
        };

        let generation = self.store.begin(image.clone(), info, DetectionStatus::Detecting);
        let store = self.store.clone();
        let threshold = self.threshold;

        tokio::spawn(async move {
            let started = Instant::now();
            let outcome = engine
                .detect(image)
                .await
                .map(|batch| filter_by_confidence(batch, threshold));
            let infer_ms = started.elapsed().as_secs_f32() * 1000.0;

            match &outcome {
                Ok(batch) => info!(
                    "Image #{}: {} detections in {:.1} ms [{}]",
                    generation,
                    batch.len(),
                    infer_ms,
                    summarize_detections(batch)
                ),
                Err(e) => warn!("Image #{}: inference failed: {}", generation, e),
            }

            if !store.complete(generation, outcome) {
                debug!("Image #{} superseded, result dropped", generation);
            }
        });

        generation
    }
}
