use serde::Serialize;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

use crate::domain::geometry::MAX_DISPLAY_SIDE;
use crate::domain::model::{ModelId, YoloParams};

/// Process configuration, read once from `DETECT_*` environment variables.
#[derive(Debug, Clone, Serialize)]
pub struct AppConfig {
    pub bind: String,
    pub model_dir: PathBuf,
    pub model_name: String,
    /// Detections at or below this confidence are dropped.
    pub conf_threshold: f32,
    pub input_size: u32,
    pub iou_threshold: f32,
    pub static_dir: PathBuf,
    pub display_width: u32,
    pub display_height: u32,
    pub max_upload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8090".into(),
            model_dir: PathBuf::from("models"),
            model_name: "yolo11n".into(),
            conf_threshold: 0.3,
            input_size: 640,
            iou_threshold: 0.45,
            static_dir: PathBuf::from("static"),
            display_width: 640,
            display_height: 480,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Unparseable values
    /// keep their default and log a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        let cfg = Self {
            bind: lookup("DETECT_BIND").unwrap_or(d.bind),
            model_dir: lookup("DETECT_MODEL_DIR").map(PathBuf::from).unwrap_or(d.model_dir),
            model_name: lookup("DETECT_MODEL").unwrap_or(d.model_name),
            conf_threshold: parse_or(&lookup, "DETECT_CONF_THRESHOLD", d.conf_threshold),
            input_size: parse_or(&lookup, "DETECT_INPUT_SIZE", d.input_size),
            iou_threshold: parse_or(&lookup, "DETECT_IOU_THRESHOLD", d.iou_threshold),
            static_dir: lookup("DETECT_STATIC_DIR").map(PathBuf::from).unwrap_or(d.static_dir),
            display_width: parse_or(&lookup, "DETECT_DISPLAY_WIDTH", d.display_width),
            display_height: parse_or(&lookup, "DETECT_DISPLAY_HEIGHT", d.display_height),
            max_upload_bytes: parse_or(&lookup, "DETECT_MAX_UPLOAD_BYTES", d.max_upload_bytes),
        };
        cfg.sanitized()
    }

    fn sanitized(mut self) -> Self {
        let d = Self::default();
        if !self.conf_threshold.is_finite() {
            warn!("DETECT_CONF_THRESHOLD {} is not a number, using {}", self.conf_threshold, d.conf_threshold);
            self.conf_threshold = d.conf_threshold;
        } else if !(0.0..=1.0).contains(&self.conf_threshold) {
            warn!("DETECT_CONF_THRESHOLD {} out of range, clamping", self.conf_threshold);
            self.conf_threshold = self.conf_threshold.clamp(0.0, 1.0);
        }
        // NaN fails the range check too.
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            warn!("DETECT_IOU_THRESHOLD {} out of range, using {}", self.iou_threshold, d.iou_threshold);
            self.iou_threshold = d.iou_threshold;
        }
        if self.input_size == 0 {
            self.input_size = d.input_size;
        }
        let side = 1..=MAX_DISPLAY_SIDE;
        if !side.contains(&self.display_width) || !side.contains(&self.display_height) {
            warn!(
                "Display {}x{} outside 1..={}, using {}x{}",
                self.display_width, self.display_height, MAX_DISPLAY_SIDE, d.display_width, d.display_height
            );
            self.display_width = d.display_width;
            self.display_height = d.display_height;
        }
        self
    }

    pub fn model(&self) -> ModelId {
        ModelId { name: self.model_name.clone(), dir: self.model_dir.clone() }
    }

    pub fn yolo_params(&self) -> YoloParams {
        YoloParams {
            input_size: self.input_size,
            iou_threshold: self.iou_threshold,
            ..YoloParams::default()
        }
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}={:?}", key, raw);
            default
        }),
        None => default,
    }
}
