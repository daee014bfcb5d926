use anyhow::Result;
use image::{imageops::FilterType, Rgb, RgbImage};

use crate::domain::detection::Detection;
use crate::domain::geometry::{DisplayRect, Letterbox, Size};

const BAR_COLOR: Rgb<u8> = Rgb([24, 24, 24]);
const BOX_THICKNESS: u32 = 3;

const PALETTE: [[u8; 3]; 8] = [
    [255, 56, 56],
    [255, 157, 151],
    [255, 112, 31],
    [255, 178, 29],
    [72, 249, 10],
    [26, 147, 52],
    [0, 194, 255],
    [52, 69, 147],
];

pub fn class_color(class_id: usize) -> Rgb<u8> {
    Rgb(PALETTE[class_id % PALETTE.len()])
}

/// Draws `image` aspect-fit into a `width` x `height` canvas and frames
/// every detection at its mapped display position.
pub fn render_overlay(image: &RgbImage, detections: &[Detection], width: u32, height: u32) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(width, height, BAR_COLOR);
    let image_size = Size::from_pixels(image.width(), image.height());
    let display = Size::from_pixels(width, height);
    let lb = Letterbox::fit(image_size, display);

    let sw = lb.scaled_width.round() as u32;
    let sh = lb.scaled_height.round() as u32;
    if sw > 0 && sh > 0 {
        let scaled = image::imageops::resize(image, sw, sh, FilterType::Triangle);
        image::imageops::overlay(
            &mut canvas,
            &scaled,
            lb.offset_x.round() as i64,
            lb.offset_y.round() as i64,
        );
    }

    for det in detections {
        let rect = det.to_display(image_size, display);
        draw_rect(&mut canvas, &rect, class_color(det.class_id), BOX_THICKNESS);
    }
    canvas
}

/// Hollow rectangle, clipped to the canvas.
pub fn draw_rect(img: &mut RgbImage, rect: &DisplayRect, color: Rgb<u8>, thickness: u32) {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return;
    }
    let clamp = |v: f32, max: u32| -> u32 { v.round().clamp(0.0, (max - 1) as f32) as u32 };
    let x0 = clamp(rect.x, w);
    let y0 = clamp(rect.y, h);
    let x1 = clamp(rect.x + rect.width, w);
    let y1 = clamp(rect.y + rect.height, h);

    for t in 0..thickness {
        let xx0 = x0.saturating_add(t);
        let yy0 = y0.saturating_add(t);
        let xx1 = x1.saturating_sub(t);
        let yy1 = y1.saturating_sub(t);
        if xx0 > xx1 || yy0 > yy1 {
            break;
        }
        for x in xx0..=xx1 {
            img.put_pixel(x, yy0, color);
            img.put_pixel(x, yy1, color);
        }
        for y in yy0..=yy1 {
            img.put_pixel(xx0, y, color);
            img.put_pixel(xx1, y, color);
        }
    }
}

pub fn encode_jpeg(img: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality);
    encoder.encode_image(img)?;
    Ok(buf)
}
