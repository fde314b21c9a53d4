use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use std::io::Cursor;

use crate::errors::{AppError, AppResult};

/// Square-ish region confirmed in the crop dialog, in source-image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Turn a selected image into upload-ready JPEG bytes: decode, apply the
/// confirmed crop, scale down proportionally so neither dimension exceeds
/// `max_dimension`, then re-encode at `quality`.
///
/// Lossy, and deterministic only up to the resize filter.
pub fn prepare_avatar(
    bytes: &[u8],
    crop: Option<CropRegion>,
    max_dimension: u32,
    quality: u8,
) -> AppResult<Vec<u8>> {
    if quality == 0 || quality > 100 {
        return Err(AppError::validation(
            "quality",
            "Quality must be between 1 and 100",
        ));
    }

    let mut img = image::load_from_memory(bytes)?;

    if let Some(region) = crop {
        img = apply_crop(&img, region)?;
    }

    if img.width() > max_dimension || img.height() > max_dimension {
        log::debug!(
            "Resizing avatar from {}x{} to fit {}px",
            img.width(),
            img.height(),
            max_dimension
        );
        img = img.resize(max_dimension, max_dimension, FilterType::Lanczos3);
    }

    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut output = Vec::new();
    {
        let mut cursor = Cursor::new(&mut output);
        let encoder = JpegEncoder::new_with_quality(&mut cursor, quality);
        rgb.write_with_encoder(encoder)?;
    }

    log::info!(
        "Compressed avatar to {}x{}, {} bytes (quality: {})",
        rgb.width(),
        rgb.height(),
        output.len(),
        quality
    );

    Ok(output)
}

fn apply_crop(img: &DynamicImage, region: CropRegion) -> AppResult<DynamicImage> {
    if region.width == 0 || region.height == 0 {
        return Err(AppError::validation("crop", "Crop region cannot be empty"));
    }

    if region.x >= img.width() || region.y >= img.height() {
        return Err(AppError::validation(
            "crop",
            "Crop region is outside the image",
        ));
    }

    // Clamp to the image bounds rather than failing on off-by-a-few regions
    // coming from the drag handles.
    let width = region.width.min(img.width() - region.x);
    let height = region.height.min(img.height() - region.y);

    Ok(img.crop_imm(region.x, region.y, width, height))
}

/// Read dimensions from the image header without a full decode.
pub fn image_dimensions(bytes: &[u8]) -> AppResult<(u32, u32)> {
    let reader = image::ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    Ok(reader.into_dimensions()?)
}
