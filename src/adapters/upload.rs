use anyhow::{anyhow, Result};
use async_trait::async_trait;
use image::{DynamicImage, ImageDecoder, ImageReader, RgbImage};
use std::io::Cursor;

use crate::application::ports::ImageDecodePort;
use crate::domain::errors::{DomainError, DomainResult};

/// Decodes uploaded photos, honoring the EXIF orientation phones write.
pub fn decode_upload(bytes: &[u8]) -> Result<RgbImage> {
    if bytes.is_empty() {
        return Err(anyhow!("empty image body"));
    }
    let mut decoder = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .into_decoder()?;
    let orientation = decoder.orientation()?;
    let mut img = DynamicImage::from_decoder(decoder)?;
    img.apply_orientation(orientation);
    Ok(img.to_rgb8())
}

pub struct ImageUploadDecoder;

impl ImageUploadDecoder {
    pub fn new() -> Self { Self }
}

#[async_trait]
impl ImageDecodePort for ImageUploadDecoder {
    async fn decode(&self, bytes: Vec<u8>) -> DomainResult<RgbImage> {
        tokio::task::spawn_blocking(move || decode_upload(&bytes))
            .await
            .map_err(|e| DomainError::OperationFailed(format!("decode task: {e}")))?
            .map_err(|e| DomainError::InvalidInput(format!("{e:#}")))
    }
}
