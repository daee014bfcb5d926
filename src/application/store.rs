use image::RgbImage;
use std::sync::Arc;
use tokio::sync::watch;

use crate::domain::{
    detection::Detection,
    errors::DomainResult,
    snapshot::{DetectionStatus, ImageInfo, ResultSnapshot},
};

/// Value held by the store: the snapshot plus the raster it describes.
#[derive(Clone)]
pub struct StoreState {
    pub snapshot: ResultSnapshot,
    pub image: Option<Arc<RgbImage>>,
}

/// Shared observable result store. Every mutation notifies subscribers.
pub struct ResultStore {
    tx: watch::Sender<StoreState>,
}

impl ResultStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(StoreState {
            snapshot: ResultSnapshot::empty(),
            image: None,
        });
        Self { tx }
    }

    /// Installs a new image and drops the previous batch. Returns the
    /// generation the pending result must carry to be accepted.
    pub fn begin(&self, image: Arc<RgbImage>, info: ImageInfo, status: DetectionStatus) -> u64 {
        let mut generation = 0;
        self.tx.send_modify(|state| {
            generation = state.snapshot.generation + 1;
            state.snapshot = ResultSnapshot {
                generation,
                image: Some(info),
                status,
                detections: Vec::new(),
            };
            state.image = Some(image);
        });
        generation
    }

    /// Applies an inference outcome if `generation` is still current.
    /// Returns false when a newer submission already replaced it.
    pub fn complete(&self, generation: u64, outcome: DomainResult<Vec<Detection>>) -> bool {
        self.tx.send_if_modified(|state| {
            if state.snapshot.generation != generation {
                return false;
            }
            match outcome {
                Ok(batch) => {
                    state.snapshot.status = DetectionStatus::Ready;
                    state.snapshot.detections = batch;
                }
                Err(_) => {
                    state.snapshot.status = DetectionStatus::Failed;
                    state.snapshot.detections.clear();
                }
            }
            true
        })
    }

    pub fn snapshot(&self) -> ResultSnapshot {
        self.tx.borrow().snapshot.clone()
    }

    pub fn current(&self) -> StoreState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<StoreState> {
        self.tx.subscribe()
    }
}

impl Default for ResultStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{errors::DomainError, geometry::NormalizedRect, snapshot::ImageSource};

    fn info() -> ImageInfo {
        ImageInfo { width: 4, height: 2, source: ImageSource::Upload }
    }

    fn det(label: &str) -> Detection {
        Detection {
            label: label.into(),
            class_id: 1,
            confidence: 0.5,
            bounding_box: NormalizedRect::new(0.0, 0.0, 0.5, 0.5),
        }
    }

    #[test]
    fn starts_empty() {
        let store = ResultStore::new();
        let snap = store.snapshot();
        assert_eq!(snap.status, DetectionStatus::Empty);
        assert!(snap.image.is_none());
        assert!(store.current().image.is_none());
    }

    #[test]
    fn new_submission_discards_previous_batch() {
        let store = ResultStore::new();
        let g1 = store.begin(Arc::new(RgbImage::new(4, 2)), info(), DetectionStatus::Detecting);
        assert!(store.complete(g1, Ok(vec![det("a"), det("b")])));
        assert_eq!(store.snapshot().detections.len(), 2);

        let g2 = store.begin(Arc::new(RgbImage::new(8, 8)), info(), DetectionStatus::Detecting);
        assert_eq!(g2, g1 + 1);
        let snap = store.snapshot();
        assert!(snap.detections.is_empty());
        assert_eq!(snap.status, DetectionStatus::Detecting);

        assert!(store.complete(g2, Ok(vec![det("c")])));
        let labels: Vec<_> = store.snapshot().detections.into_iter().map(|d| d.label).collect();
        assert_eq!(labels, vec!["c"]);
    }

    #[test]
    fn stale_completion_is_ignored() {
        let store = ResultStore::new();
        let g1 = store.begin(Arc::new(RgbImage::new(4, 2)), info(), DetectionStatus::Detecting);
        let g2 = store.begin(Arc::new(RgbImage::new(4, 2)), info(), DetectionStatus::Detecting);

        assert!(!store.complete(g1, Ok(vec![det("old")])));
        assert!(store.snapshot().detections.is_empty());
        assert!(store.complete(g2, Ok(vec![])));
        assert_eq!(store.snapshot().status, DetectionStatus::Ready);
    }

    #[test]
    fn failure_leaves_image_without_boxes() {
        let store = ResultStore::new();
        let g = store.begin(Arc::new(RgbImage::new(4, 2)), info(), DetectionStatus::Detecting);
        assert!(store.complete(g, Err(DomainError::OperationFailed("boom".into()))));
        let state = store.current();
        assert_eq!(state.snapshot.status, DetectionStatus::Failed);
        assert!(state.snapshot.detections.is_empty());
        assert!(state.image.is_some());
    }

    #[test]
    fn subscribers_see_changes() {
        let store = ResultStore::new();
        let mut rx = store.subscribe();
        assert!(!rx.has_changed().expect("open"));
        store.begin(Arc::new(RgbImage::new(1, 1)), info(), DetectionStatus::Detecting);
        assert!(rx.has_changed().expect("open"));
        rx.borrow_and_update();

        store.complete(99, Ok(vec![]));
        assert!(!rx.has_changed().expect("open"));
    }
}
