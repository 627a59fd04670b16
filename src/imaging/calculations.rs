//! Pure calculation functions for thumbnail geometry.
//!
//! All functions here are pure and testable without any I/O or images.

/// Scale `source` to fit inside `bound`, preserving aspect ratio.
///
/// Matches ImageMagick's plain `-resize WxH`: the result touches the bound
/// on at least one edge, and small images are enlarged. Neither edge drops
/// below 1px.
///
/// # Examples
/// ```
/// # use photoshelf::imaging::fit_within;
/// assert_eq!(fit_within((1000, 800), (500, 500)), (500, 400));
/// assert_eq!(fit_within((300, 600), (500, 500)), (250, 500));
/// assert_eq!(fit_within((100, 100), (500, 500)), (500, 500));
/// ```
pub fn fit_within(source: (u32, u32), bound: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bound;
    if src_w == 0 || src_h == 0 {
        return (0, 0);
    }

    let scale = (max_w as f64 / src_w as f64).min(max_h as f64 / src_h as f64);
    let w = ((src_w as f64 * scale).round() as u32).clamp(1, max_w.max(1));
    let h = ((src_h as f64 * scale).round() as u32).clamp(1, max_h.max(1));
    (w, h)
}

/// A crop rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Clamp a requested crop to the pixels that actually exist.
///
/// An offset past the edge yields an empty rectangle; a crop that runs off
/// the right or bottom edge is shortened.
pub fn clamp_crop(image: (u32, u32), offset: (u32, u32), size: (u32, u32)) -> CropRect {
    let (img_w, img_h) = image;
    let x = offset.0.min(img_w);
    let y = offset.1.min(img_h);
    CropRect {
        x,
        y,
        width: size.0.min(img_w - x),
        height: size.1.min(img_h - y),
    }
}
