//! Shared test utilities for the photoshelf test suite.
//!
//! Builds throwaway image trees on disk and provides lookup helpers that
//! work with gallery listings (`Listing`, `DirectoryEntry`).
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tree = ImageTree::new()
//!     .picture("vacation/beach.jpg", 800, 600)
//!     .dir("vacation/2019");
//!
//! let gallery = tree.gallery(MockBackend::new());
//! let listing = gallery.list_directory(&gp("/vacation"), Access::Admin).unwrap();
//! assert_eq!(file_names(&listing), ["beach.jpg"]);
//! ```

use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::gallery::{DirectoryEntry, GalleryService, Listing};
use crate::imaging::ImageBackend;
use crate::paths::GalleryPath;
use crate::thumbnails::ThumbnailCache;

pub use crate::imaging::backend::tests::MockBackend;

// =========================================================================
// Synthetic images
// =========================================================================

/// Encode a `width`x`height` gradient to `path`, in the format implied by
/// its extension. Parent directories are created.
pub fn write_test_image(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    });
    let img = image::DynamicImage::ImageRgb8(img);
    let is_gif = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gif"));
    if is_gif {
        image::DynamicImage::ImageRgba8(img.to_rgba8())
            .save(path)
            .unwrap();
    } else {
        img.save(path).unwrap();
    }
}

// =========================================================================
// Fixture trees
// =========================================================================

/// Builder for an image tree in a temp directory. The tree lives at
/// `<tmp>/images`; the thumbnail cache goes to `<tmp>/cache`.
pub struct ImageTree {
    tmp: TempDir,
}

impl ImageTree {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("images")).unwrap();
        Self { tmp }
    }

    /// Add a real, decodable picture.
    pub fn picture(self, rel: &str, width: u32, height: u32) -> Self {
        write_test_image(&self.images().join(rel), width, height);
        self
    }

    /// Add a file with arbitrary bytes.
    pub fn file(self, rel: &str, contents: &[u8]) -> Self {
        let path = self.images().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
        self
    }

    pub fn dir(self, rel: &str) -> Self {
        std::fs::create_dir_all(self.images().join(rel)).unwrap();
        self
    }

    pub fn images(&self) -> PathBuf {
        self.tmp.path().join("images")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.tmp.path().join("cache")
    }

    pub fn gallery<B: ImageBackend>(&self, backend: B) -> GalleryService<B> {
        let cache = ThumbnailCache::with_backend(self.images(), self.cache_dir(), backend);
        GalleryService::new(self.images(), cache)
    }
}

/// Parse a gallery path. Panics on invalid input.
pub fn gp(raw: &str) -> GalleryPath {
    GalleryPath::parse(raw).unwrap_or_else(|e| panic!("bad test path '{raw}': {e}"))
}

// =========================================================================
// Listing lookups (panic with a clear message on miss)
// =========================================================================

/// Find a picture by name. Panics if not found.
pub fn find_file<'a>(listing: &'a Listing, name: &str) -> &'a DirectoryEntry {
    listing
        .files
        .iter()
        .find(|e| e.name == name)
        .unwrap_or_else(|| {
            let names = file_names(listing);
            panic!("file '{name}' not found. Available: {names:?}")
        })
}

/// Picture names in listing order.
pub fn file_names(listing: &Listing) -> Vec<&str> {
    listing.files.iter().map(|e| e.name.as_str()).collect()
}

/// Subdirectory names in listing order.
pub fn dir_names(listing: &Listing) -> Vec<&str> {
    listing.dirs.iter().map(|e| e.name.as_str()).collect()
}

/// Assert breadcrumbs as `(name, path)` pairs. The last crumb must be the
/// only active one.
pub fn assert_breadcrumbs(listing: &Listing, expected: &[(&str, &str)]) {
    let actual: Vec<(&str, &str)> = listing
        .breadcrumbs
        .iter()
        .map(|b| (b.name.as_str(), b.path.as_str()))
        .collect();
    assert_eq!(actual, expected, "breadcrumbs mismatch");

    let active: Vec<usize> = listing
        .breadcrumbs
        .iter()
        .enumerate()
        .filter(|(_, b)| b.active)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(
        active,
        vec![listing.breadcrumbs.len() - 1],
        "only the last breadcrumb should be active"
    );
}
