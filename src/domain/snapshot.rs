use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::detection::Detection;
use super::geometry::{DisplayRect, Letterbox, Size};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageSource {
    Upload,
    Camera { path: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub source: ImageSource,
}

impl ImageInfo {
    pub fn size(&self) -> Size {
        Size::from_pixels(self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionStatus {
    /// No image yet; the page shows its placeholder.
    Empty,
    Detecting,
    Ready,
    /// The model never loaded; images are shown without boxes.
    Unavailable,
    /// Inference failed for the current image.
    Failed,
}

/// What the display surface observes: the current image and its batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSnapshot {
    pub generation: u64,
    pub image: Option<ImageInfo>,
    pub status: DetectionStatus,
    pub detections: Vec<Detection>,
}

impl ResultSnapshot {
    pub fn empty() -> Self {
        Self {
            generation: 0,
            image: None,
            status: DetectionStatus::Empty,
            detections: Vec::new(),
        }
    }

    /// Attaches display-space rectangles for a display area of `display`.
    pub fn view(&self, display: Option<Size>) -> SnapshotView {
        let letterbox = match (&self.image, display) {
            (Some(img), Some(display)) => Some(Letterbox::fit(img.size(), display)),
            _ => None,
        };
        SnapshotView {
            generation: self.generation,
            image: self.image.clone(),
            status: self.status,
            summary: summarize_detections(&self.detections),
            letterbox,
            detections: self
                .detections
                .iter()
                .map(|d| DetectionView {
                    display_rect: letterbox.map(|lb| lb.map(&d.bounding_box)),
                    detection: d.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionView {
    #[serde(flatten)]
    pub detection: Detection,
    pub display_rect: Option<DisplayRect>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotView {
    pub generation: u64,
    pub image: Option<ImageInfo>,
    pub status: DetectionStatus,
    pub summary: String,
    pub letterbox: Option<Letterbox>,
    pub detections: Vec<DetectionView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsResultsMessage {
    pub r#type: String,
    pub snapshot: SnapshotView,
}

/// "2 person, 1 dog" style summary, labels in alphabetical order.
pub fn summarize_detections(detections: &[Detection]) -> String {
    let mut counts = BTreeMap::new();
    for det in detections {
        *counts.entry(det.label.as_str()).or_insert(0) += 1;
    }
    counts.iter()
        .map(|(label, count)| format!("{} {}", count, label))
        .collect::<Vec<_>>()
        .join(", ")
}
