//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the one operation the gallery needs:
//! turning a source image into a thumbnail file.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. The thumbnail cache is generic over the trait so tests can count
//! and stall transforms.

use super::params::ThumbnailParams;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Trait for image processing backends.
///
/// `Send + Sync` because one backend instance is shared by every request
/// thread and by the `warm` command's rayon pool.
pub trait ImageBackend: Send + Sync {
    /// Decode `params.source`, resize and crop it, and encode the result to
    /// `params.output`.
    fn thumbnail(&self, params: &ThumbnailParams) -> Result<(), BackendError>;
}
