use anyhow::{anyhow, Result};
use async_trait::async_trait;
use image::{ImageFormat, RgbImage};
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::Device;

use crate::application::ports::CameraCapturePort;
use crate::domain::camera::CameraId;
use crate::domain::errors::{DomainError, DomainResult};

/// Formato de captura solicitado. El driver puede ajustarlo al más cercano soportado.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub fourcc: String,
    pub width: u32,
    pub height: u32,
    /// Frames thrown away while auto-exposure settles.
    pub warmup_frames: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            fourcc: "MJPG".into(),
            width: 1280,
            height: 720,
            warmup_frames: 3,
        }
    }
}

/// Abre el dispositivo, toma un frame tras el calentamiento y lo vuelve a cerrar.
pub fn snapshot(camera_path: &str, cfg: &CaptureConfig) -> Result<RgbImage> {
    let dev = Device::with_path(camera_path)?;

    let mut fmt = dev.format()?;
    let b = cfg.fourcc.as_bytes();
    if b.len() != 4 {
        return Err(anyhow!("FourCC must have 4 characters"));
    }
    fmt.fourcc = v4l::FourCC::new(&[b[0], b[1], b[2], b[3]]);
    fmt.width = cfg.width;
    fmt.height = cfg.height;
    let actual = dev.set_format(&fmt)?;

    let fcc = actual.fourcc.str().map_err(|_| anyhow!("invalid FourCC"))?.to_string();
    tracing::info!(
        "Cámara {} abierta: {}x{} [{}]",
        camera_path, actual.width, actual.height, fcc
    );

    let mut stream = Stream::with_buffers(&dev, Type::VideoCapture, 4)?;
    let mut frame = Vec::new();
    for _ in 0..=cfg.warmup_frames {
        let (data, meta) = stream.next()?;
        let used = (meta.bytesused as usize).min(data.len());
        let used = if used == 0 { data.len() } else { used };
        frame.clear();
        frame.extend_from_slice(&data[..used]);
    }

    decode_frame(&frame, &fcc, actual.width, actual.height)
}

/// Converts a raw camera buffer into RGB.
pub fn decode_frame(data: &[u8], fourcc: &str, width: u32, height: u32) -> Result<RgbImage> {
    match fourcc {
        "MJPG" => {
            // MJPG es básicamente una secuencia de JPEGs
            let img = image::load_from_memory_with_format(data, ImageFormat::Jpeg)?;
            Ok(img.to_rgb8())
        }
        "YUYV" => {
            let expected = width as usize * height as usize * 2;
            if data.len() < expected {
                return Err(anyhow!("YUYV frame too short: {} < {}", data.len(), expected));
            }
            Ok(yuyv_to_rgb(data, width, height))
        }
        _ => Err(anyhow!("camera format {} not supported", fourcc)),
    }
}

/// YUYV (YUV 4:2:2) to RGB, BT.601.
fn yuyv_to_rgb(yuyv: &[u8], w: u32, h: u32) -> RgbImage {
    let mut out = RgbImage::new(w, h);

    // Cada bloque de 4 bytes [Y0, U, Y1, V] define 2 píxeles que comparten U y V.
    for (i, chunk) in yuyv.chunks_exact(4).enumerate() {
        let y0 = chunk[0] as f32;
        let u  = chunk[1] as f32 - 128.0;
        let y1 = chunk[2] as f32;
        let v  = chunk[3] as f32 - 128.0;

        let r0 = (y0 + 1.402 * v).clamp(0.0, 255.0) as u8;
        let g0 = (y0 - 0.344136 * u - 0.714136 * v).clamp(0.0, 255.0) as u8;
        let b0 = (y0 + 1.772 * u).clamp(0.0, 255.0) as u8;

        let r1 = (y1 + 1.402 * v).clamp(0.0, 255.0) as u8;
        let g1 = (y1 - 0.344136 * u - 0.714136 * v).clamp(0.0, 255.0) as u8;
        let b1 = (y1 + 1.772 * u).clamp(0.0, 255.0) as u8;

        let pixel_idx = i as u32 * 2;
        let x = pixel_idx % w;
        let y = pixel_idx / w;

        if y < h {
            out.put_pixel(x, y, image::Rgb([r0, g0, b0]));
            if x + 1 < w {
                out.put_pixel(x + 1, y, image::Rgb([r1, g1, b1]));
            }
        }
    }
    out
}

/// Single-shot camera source backed by V4L2.
pub struct V4l2CameraCapture {
    cfg: CaptureConfig,
}

impl V4l2CameraCapture {
    pub fn new(cfg: CaptureConfig) -> Self {
        Self { cfg }
    }
}

#[async_trait]
impl CameraCapturePort for V4l2CameraCapture {
    async fn capture(&self, camera: &CameraId) -> DomainResult<RgbImage> {
        let path = camera.path.clone();
        let cfg = self.cfg.clone();
        tokio::task::spawn_blocking(move || snapshot(&path, &cfg))
            .await
            .map_err(|e| DomainError::OperationFailed(format!("capture task: {e}")))?
            .map_err(|e| DomainError::OperationFailed(format!("{e:#}")))
    }
}
