use serde::{Deserialize, Serialize};

/// Largest display side, in pixels, that a canvas is rendered at.
pub const MAX_DISPLAY_SIDE: u32 = 8192;

/// Pixel dimensions of an image or of a display area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn from_pixels(width: u32, height: u32) -> Self {
        Self { width: width as f32, height: height as f32 }
    }

    fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Bounding box as returned by the inference engine: fractions of the image
/// size, origin at the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl NormalizedRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn min_x(&self) -> f32 { self.x }
    pub fn min_y(&self) -> f32 { self.y }
    pub fn max_x(&self) -> f32 { self.x + self.width }
    pub fn max_y(&self) -> f32 { self.y + self.height }

    /// Builds a normalized box from pixel corners in top-left image space
    /// (the layout YOLO heads emit), clamped to the unit square.
    pub fn from_top_left_pixels(x1: f32, y1: f32, x2: f32, y2: f32, image: Size) -> Self {
        if image.is_degenerate() {
            return Self::new(0.0, 0.0, 0.0, 0.0);
        }
        let nx1 = (x1.min(x2) / image.width).clamp(0.0, 1.0);
        let nx2 = (x1.max(x2) / image.width).clamp(0.0, 1.0);
        let ny1 = (y1.min(y2) / image.height).clamp(0.0, 1.0);
        let ny2 = (y1.max(y2) / image.height).clamp(0.0, 1.0);

        // Top edge in pixel space becomes max_y once the origin moves down.
        Self {
            x: nx1,
            y: 1.0 - ny2,
            width: nx2 - nx1,
            height: ny2 - ny1,
        }
    }

    /// Intersection over union with another box in the same space.
    pub fn iou(&self, other: &NormalizedRect) -> f32 {
        let ix1 = self.min_x().max(other.min_x());
        let iy1 = self.min_y().max(other.min_y());
        let ix2 = self.max_x().min(other.max_x());
        let iy2 = self.max_y().min(other.max_y());
        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        if inter == 0.0 {
            return 0.0;
        }
        let union = self.width * self.height + other.width * other.height - inter;
        if union <= 0.0 { 0.0 } else { inter / union }
    }
}

/// Rectangle in display pixels, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Placement of an image shown aspect-fit inside a display area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Letterbox {
    pub scale: f32,
    pub scaled_width: f32,
    pub scaled_height: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Letterbox {
    /// Uniform scale that fits `image` into `display`, with the padding split
    /// evenly on the axis that has room left.
    pub fn fit(image: Size, display: Size) -> Self {
        let scale = if image.is_degenerate() {
            0.0
        } else {
            (display.width / image.width).min(display.height / image.height)
        };
        let scaled_width = image.width * scale;
        let scaled_height = image.height * scale;
        Self {
            scale,
            scaled_width,
            scaled_height,
            offset_x: (display.width - scaled_width) / 2.0,
            offset_y: (display.height - scaled_height) / 2.0,
        }
    }

    /// Maps a normalized bottom-left-origin box onto the display.
    pub fn map(&self, rect: &NormalizedRect) -> DisplayRect {
        DisplayRect {
            x: rect.min_x() * self.scaled_width + self.offset_x,
            y: (1.0 - rect.max_y()) * self.scaled_height + self.offset_y,
            width: rect.width * self.scaled_width,
            height: rect.height * self.scaled_height,
        }
    }
}

/// Converts an engine box into display coordinates for an image shown
/// aspect-fit in `display`.
pub fn map_to_display(rect: &NormalizedRect, image: Size, display: Size) -> DisplayRect {
    Letterbox::fit(image, display).map(rect)
}
