use anyhow::{anyhow, Context, Result};
use image::{imageops::FilterType, RgbImage};
use ndarray::{Array4, ArrayView2, ArrayViewD, Axis, Ix2, IxDyn};
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::Session;
use ort::value::Value;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::domain::detection::Detection;
use crate::domain::geometry::{NormalizedRect, Size};
use crate::domain::model::{ResolvedModel, YoloParams};

/// Class names of the 80-class COCO models, used when no label file ships
/// next to the model.
pub const COCO_LABELS: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich",
    "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote",
    "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator", "book",
    "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// Raw YOLO candidate in normalized, bottom-left-origin space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub rect: NormalizedRect,
    pub score: f32,
    pub class_id: usize,
}

pub struct OnnxYoloEngine {
    session: Session,
    labels: Vec<String>,
}

impl OnnxYoloEngine {
    pub fn load(model: &ResolvedModel) -> Result<Self> {
        let mut builder = Session::builder()?.with_intra_threads(4)?;

        // CUDA es opcional: si está disponible se registra, si no continuamos en CPU.
        let cuda = CUDAExecutionProvider::default().build();
        if let Ok(builder_with_cuda) = builder.clone().with_execution_providers([cuda]) {
            builder = builder_with_cuda;
        }

        // Tanto .ort como .onnx pasan por commit_from_memory.
        let model_bytes = fs::read(&model.path)
            .with_context(|| format!("reading {}", model.path.display()))?;
        let session = builder.commit_from_memory(&model_bytes)?;

        let labels = match &model.labels_path {
            Some(path) => load_labels(path)?,
            None => COCO_LABELS.iter().map(|s| s.to_string()).collect(),
        };

        info!(
            "Modelo cargado: {} ({:?}, {} etiquetas)",
            model.path.display(),
            model.format,
            labels.len()
        );
        Ok(Self { session, labels })
    }

    /// Runs the model on `rgb`. Boxes come back normalized with a
    /// bottom-left origin, highest confidence first, already suppressed.
    pub fn infer(&mut self, rgb: &RgbImage, params: &YoloParams) -> Result<Vec<Detection>> {
        let imgsz = params.input_size as usize;
        let input = preprocess(rgb, params.input_size);

        let input_shape = vec![1, 3, imgsz as i64, imgsz as i64];
        let input_tensor = Value::from_array((input_shape, input.into_raw_vec_and_offset().0))?;

        let outputs = self.session.run(ort::inputs![input_tensor])?;
        let (shape_out, data_out) = outputs[0].try_extract_tensor::<f32>()?;

        let dims: Vec<usize> = shape_out.iter().map(|&x| x as usize).collect();
        if dims.len() != 3 {
            return Err(anyhow!("unexpected YOLO output shape {:?}", dims));
        }
        let array_view = ArrayViewD::from_shape(IxDyn(&dims), data_out)?;
        let view = array_view.index_axis(Axis(0), 0).into_dimensionality::<Ix2>()?;

        let candidates = decode_candidates(
            view,
            params.input_size as f32,
            params.candidate_floor,
            self.labels.len(),
        );
        let kept = non_max_suppression(candidates, params.iou_threshold);
        debug!("YOLO: {} boxes after NMS", kept.len());

        Ok(kept
            .into_iter()
            .map(|c| Detection {
                label: self
                    .labels
                    .get(c.class_id)
                    .cloned()
                    .unwrap_or_else(|| "object".to_string()),
                class_id: c.class_id,
                confidence: c.score,
                bounding_box: c.rect,
            })
            .collect())
    }
}

/// One label per line; blank lines are skipped.
pub fn load_labels(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading labels {}", path.display()))?;
    let labels: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect();
    if labels.is_empty() {
        warn!("Label file {} is empty", path.display());
    }
    Ok(labels)
}

/// Stretches the image to the square model input, CHW, 0..1.
fn preprocess(rgb: &RgbImage, size: u32) -> Array4<f32> {
    let imgsz = size as usize;
    let resized = image::imageops::resize(rgb, size, size, FilterType::Triangle);

    let mut input = Array4::<f32>::zeros((1, 3, imgsz, imgsz));
    for (x, y, pixel) in resized.enumerate_pixels() {
        input[[0, 0, y as usize, x as usize]] = pixel[0] as f32 / 255.0;
        input[[0, 1, y as usize, x as usize]] = pixel[1] as f32 / 255.0;
        input[[0, 2, y as usize, x as usize]] = pixel[2] as f32 / 255.0;
    }
    input
}

/// Decodes a `[4 + classes, candidates]` head (or its transpose). Box
/// coordinates are `cx, cy, w, h` in input pixels.
///
/// The attribute axis is the one of length `4 + num_classes`. When neither
/// axis matches (label file out of step with the model) the shorter axis is
/// taken as the attribute axis.
pub fn decode_candidates(
    view: ArrayView2<'_, f32>,
    input_size: f32,
    floor: f32,
    num_classes: usize,
) -> Vec<Candidate> {
    let attrs = 4 + num_classes;
    let (rows, cols) = (view.shape()[0], view.shape()[1]);
    let view = if rows == attrs {
        view
    } else if cols == attrs {
        view.reversed_axes()
    } else {
        debug!("YOLO head {}x{} does not match {} classes", rows, cols, num_classes);
        if rows > cols { view.reversed_axes() } else { view }
    };
    let rows = view.shape()[0];
    if rows <= 4 {
        return Vec::new();
    }
    let input = Size::new(input_size, input_size);

    let mut out = Vec::new();
    for i in 0..view.shape()[1] {
        let column = view.column(i);
        let Some((class_id, score)) = column
            .iter()
            .skip(4)
            .copied()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
        else {
            continue;
        };
        if score < floor {
            continue;
        }

        let (cx, cy, w, h) = (column[0], column[1], column[2], column[3]);
        out.push(Candidate {
            rect: NormalizedRect::from_top_left_pixels(
                cx - w / 2.0,
                cy - h / 2.0,
                cx + w / 2.0,
                cy + h / 2.0,
                input,
            ),
            score,
            class_id,
        });
    }
    out
}

/// Class-aware greedy NMS. Output is sorted by descending score.
pub fn non_max_suppression(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.sort_unstable_by(|a, b| b.score.total_cmp(&a.score));

    let mut kept: Vec<Candidate> = Vec::new();
    for c in candidates {
        let overlaps = kept
            .iter()
            .any(|k| k.class_id == c.class_id && k.rect.iou(&c.rect) > iou_threshold);
        if !overlaps {
            kept.push(c);
        }
    }
    kept
}
