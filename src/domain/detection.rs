use serde::{Deserialize, Serialize};

use super::geometry::{map_to_display, DisplayRect, NormalizedRect, Size};

/// A single object found by the inference engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub class_id: usize,
    /// Confidence of the top label, 0..1.
    pub confidence: f32,
    /// Normalized, bottom-left origin.
    pub bounding_box: NormalizedRect,
}

impl Detection {
    pub fn to_display(&self, image: Size, display: Size) -> DisplayRect {
        map_to_display(&self.bounding_box, image, display)
    }
}

/// Keeps the detections whose confidence is strictly above `threshold`,
/// in the order the engine returned them.
pub fn filter_by_confidence(batch: Vec<Detection>, threshold: f32) -> Vec<Detection> {
    batch.into_iter().filter(|d| d.confidence > threshold).collect()
}
