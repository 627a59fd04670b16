//! Image processing in pure Rust, with no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` (JPEG, PNG, GIF) |
//! | **Thumbnail** | fit-resize (Lanczos3) + fixed-origin `crop_imm` |
//! | **Encode** | `image` encoder picked from the output extension |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for resize/crop geometry (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
mod calculations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend};
pub use calculations::{CropRect, clamp_crop, fit_within};
pub use params::{ThumbnailParams, ThumbnailSpec};
pub use rust_backend::RustBackend;
