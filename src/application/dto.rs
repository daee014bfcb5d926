use serde::{Deserialize, Serialize};

use crate::domain::{
    camera::CameraInfo,
    errors::{DomainError, DomainResult},
    geometry::{Size, MAX_DISPLAY_SIDE},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureRequest {
    #[serde(default)]
    pub camera_index: u32,
}

/// Display area the page draws into, e.g. `?display_width=500&display_height=500`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplayQuery {
    pub display_width: Option<f32>,
    pub display_height: Option<f32>,
}

impl DisplayQuery {
    /// Both dimensions present, positive and no larger than
    /// [`MAX_DISPLAY_SIDE`].
    pub fn size(&self) -> Option<Size> {
        let side = |v: f32| v > 0.0 && v <= MAX_DISPLAY_SIDE as f32;
        match (self.display_width, self.display_height) {
            (Some(w), Some(h)) if side(w) && side(h) => Some(Size::new(w, h)),
            _ => None,
        }
    }

    /// Pixel canvas to render into. Without a usable display size the
    /// `fallback` is used; an oversized or non-finite one is rejected.
    pub fn canvas(&self, fallback: (u32, u32)) -> DomainResult<(u32, u32)> {
        let too_big = |v: Option<f32>| v.is_some_and(|v| !v.is_finite() || v > MAX_DISPLAY_SIDE as f32);
        if too_big(self.display_width) || too_big(self.display_height) {
            return Err(DomainError::InvalidInput(format!(
                "display size {:?}x{:?} exceeds {} px",
                self.display_width, self.display_height, MAX_DISPLAY_SIDE
            )));
        }
        Ok(match self.size() {
            Some(size) => ((size.width.round() as u32).max(1), (size.height.round() as u32).max(1)),
            None => fallback,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraEntry {
    pub index: u32,
    pub card: String,
    pub path: String,
}

impl From<CameraInfo> for CameraEntry {
    fn from(c: CameraInfo) -> Self {
        let index = c.id.path
            .chars()
            .filter(|ch| ch.is_ascii_digit())
            .collect::<String>()
            .parse::<u32>()
            .unwrap_or(0);
        Self { index, card: c.card, path: c.id.path }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub ok: bool,
    pub generation: u64,
}
