//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF) | `image` crate (pure Rust decoders) |
//! | Resize | `image::imageops::resize` with `Lanczos3` filter |
//! | Crop | `image::DynamicImage::crop_imm` |
//! | Encode | `image` encoder chosen from the output extension |

use super::backend::{BackendError, ImageBackend};
use super::calculations::{clamp_crop, fit_within};
use super::params::ThumbnailParams;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk, sniffing the format from content
/// rather than trusting the extension.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

/// Encode to `path` in the format implied by its extension.
fn save_image(img: &DynamicImage, path: &Path) -> Result<(), BackendError> {
    let format = ImageFormat::from_path(path).map_err(|e| {
        BackendError::ProcessingFailed(format!("Unsupported output format: {}", e))
    })?;

    // JPEG has no alpha channel; the GIF encoder wants RGBA frames
    let img = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8()),
        ImageFormat::Gif => DynamicImage::ImageRgba8(img.to_rgba8()),
        _ => img.clone(),
    };

    let file = std::fs::File::create(path).map_err(BackendError::Io)?;
    let mut writer = BufWriter::new(file);
    img.write_to(&mut writer, format).map_err(|e| {
        BackendError::ProcessingFailed(format!("Failed to encode {}: {}", path.display(), e))
    })?;
    writer.flush().map_err(BackendError::Io)
}

impl ImageBackend for RustBackend {
    fn thumbnail(&self, params: &ThumbnailParams) -> Result<(), BackendError> {
        let img = load_image(&params.source)?;
        let spec = &params.spec;

        let (w, h) = fit_within(
            (img.width(), img.height()),
            (spec.resize_width, spec.resize_height),
        );
        let resized = img.resize_exact(w, h, FilterType::Lanczos3);

        let rect = clamp_crop(
            (w, h),
            (spec.crop_x, spec.crop_y),
            (spec.crop_width, spec.crop_height),
        );
        if rect.width == 0 || rect.height == 0 {
            return Err(BackendError::ProcessingFailed(format!(
                "Crop origin ({}, {}) lies outside the {}x{} resized image",
                spec.crop_x, spec.crop_y, w, h
            )));
        }
        let cropped = resized.crop_imm(rect.x, rect.y, rect.width, rect.height);

        save_image(&cropped, &params.output)
    }
}
