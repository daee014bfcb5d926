//! In-memory ports shared by the service and HTTP tests.

use async_trait::async_trait;
use image::RgbImage;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

use crate::application::ports::{CameraCapturePort, CameraCatalogPort, ImageDecodePort, InferencePort};
use crate::application::services::{CameraService, DetectionService};
use crate::application::store::ResultStore;
use crate::domain::{
    camera::{CameraId, CameraInfo},
    detection::Detection,
    errors::{DomainError, DomainResult},
    geometry::NormalizedRect,
};

/// Empty body is rejected, anything else decodes to a 20x10 image.
pub struct FakeDecoder;

#[async_trait]
impl ImageDecodePort for FakeDecoder {
    async fn decode(&self, bytes: Vec<u8>) -> DomainResult<RgbImage> {
        if bytes.is_empty() {
            return Err(DomainError::InvalidInput("empty body".into()));
        }
        Ok(RgbImage::new(20, 10))
    }
}

/// Only `/dev/video0` exists; it yields a 64x48 frame.
pub struct FakeCamera;

#[async_trait]
impl CameraCapturePort for FakeCamera {
    async fn capture(&self, camera: &CameraId) -> DomainResult<RgbImage> {
        if camera.path.ends_with('0') {
            Ok(RgbImage::new(64, 48))
        } else {
            Err(DomainError::NotFound(camera.path.clone()))
        }
    }
}

#[async_trait]
impl CameraCatalogPort for FakeCamera {
    async fn list_cameras(&self) -> DomainResult<Vec<CameraInfo>> {
        Ok(vec![CameraInfo {
            id: CameraId::from_index(0),
            name: "video0".into(),
            card: "Fake Camera".into(),
            driver: "fake".into(),
            bus: "virtual".into(),
        }])
    }
}

/// One scripted `detect` call.
pub struct Call {
    /// When set, the call waits for it before answering.
    pub gate: Option<oneshot::Receiver<()>>,
    /// Fired right before the call returns its result.
    pub finished: Option<oneshot::Sender<()>>,
    pub result: DomainResult<Vec<Detection>>,
}

impl Call {
    pub fn ok(batch: Vec<Detection>) -> Self {
        Self { gate: None, finished: None, result: Ok(batch) }
    }

    pub fn err(e: DomainError) -> Self {
        Self { gate: None, finished: None, result: Err(e) }
    }

    pub fn gated(mut self, gate: oneshot::Receiver<()>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn notify(mut self, finished: oneshot::Sender<()>) -> Self {
        self.finished = Some(finished);
        self
    }
}

/// Engine scripted per image width.
pub struct FakeEngine {
    script: Mutex<HashMap<u32, Call>>,
}

impl FakeEngine {
    pub fn new(script: Vec<(u32, Call)>) -> Arc<dyn InferencePort> {
        Arc::new(Self { script: Mutex::new(script.into_iter().collect()) })
    }
}

#[async_trait]
impl InferencePort for FakeEngine {
    async fn detect(&self, image: Arc<RgbImage>) -> DomainResult<Vec<Detection>> {
        let call = self
            .script
            .lock()
            .unwrap()
            .remove(&image.width())
            .expect("unexpected detect call");
        if let Some(gate) = call.gate {
            let _ = gate.await;
        }
        if let Some(finished) = call.finished {
            let _ = finished.send(());
        }
        call.result
    }
}

pub fn det(label: &str, confidence: f32) -> Detection {
    Detection {
        label: label.into(),
        class_id: 0,
        confidence,
        bounding_box: NormalizedRect::new(0.1, 0.2, 0.3, 0.4),
    }
}

pub fn detection_service(engine: Option<Arc<dyn InferencePort>>) -> DetectionService {
    DetectionService::new(
        Arc::new(FakeDecoder),
        Arc::new(FakeCamera),
        engine,
        Arc::new(ResultStore::new()),
        0.3,
    )
}

pub fn camera_service() -> CameraService {
    CameraService::new(Arc::new(FakeCamera))
}
