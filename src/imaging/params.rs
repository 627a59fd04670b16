//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the [`thumbnails`](crate::thumbnails) cache (which
//! decides when a thumbnail is needed and where it goes) and the
//! [`backend`](super::backend) (which does the pixel work). Tests swap in a
//! mock backend without touching the cache logic.
//!
//! ## Types
//!
//! - [`ThumbnailSpec`]: fixed resize bound, crop size and crop origin.
//! - [`ThumbnailParams`]: one thumbnail job (source, output and policy).

use std::path::PathBuf;

/// Thumbnail geometry.
///
/// The default is the gallery's fixed policy: fit within 500×500, then take
/// a 256×256 crop from the **top-left** corner. The crop is deliberately not
/// centered; existing caches were generated this way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailSpec {
    pub resize_width: u32,
    pub resize_height: u32,
    pub crop_width: u32,
    pub crop_height: u32,
    pub crop_x: u32,
    pub crop_y: u32,
}

impl Default for ThumbnailSpec {
    fn default() -> Self {
        Self {
            resize_width: 500,
            resize_height: 500,
            crop_width: 256,
            crop_height: 256,
            crop_x: 0,
            crop_y: 0,
        }
    }
}

/// Parameters for a thumbnail operation (fit-resize + offset crop).
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailParams {
    pub source: PathBuf,
    /// Where the encoded thumbnail is written. The format follows this
    /// path's extension.
    pub output: PathBuf,
    pub spec: ThumbnailSpec,
}
