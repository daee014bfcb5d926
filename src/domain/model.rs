use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Logical model name plus the directory the bundled files live in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelId {
    pub name: String,      // e.g. "yolo11n"
    pub dir: PathBuf,
}

/// On-disk representation a model was resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelFormat {
    /// ONNX Runtime's precompiled `.ort` file.
    Compiled,
    /// Plain `.onnx` graph.
    Source,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedModel {
    pub path: PathBuf,
    pub format: ModelFormat,
    pub labels_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoloParams {
    pub input_size: u32,        // 640 typical
    pub iou_threshold: f32,     // NMS inside the engine
    pub candidate_floor: f32,   // engine drops anything below this
}

impl Default for YoloParams {
    fn default() -> Self {
        Self {
            input_size: 640,
            iou_threshold: 0.45,
            candidate_floor: 0.01,
        }
    }
}
