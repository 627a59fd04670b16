//! Thumbnail pre-generation.
//!
//! Walks the image tree and pushes every picture through the
//! [`ThumbnailCache`] on the rayon pool, so the first visitor to a large
//! directory doesn't pay for hundreds of transforms. Going through the cache
//! keeps single-flight and atomic writes in force, so warming a tree while
//! the server is running is safe.
//!
//! Dot-prefixed entries (the default `.thumbs` cache tree, `.hidden`
//! sidecars) and the legacy `orginals` folder are skipped, matching what a
//! listing would show. Hidden pictures are warmed too; admins still see them.

use crate::gallery::is_picture;
use crate::imaging::ImageBackend;
use crate::paths::GalleryPath;
use crate::thumbnails::ThumbnailCache;
use rayon::prelude::*;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

/// A picture that failed to warm.
#[derive(Debug)]
pub struct WarmFailure {
    pub path: GalleryPath,
    pub message: String,
}

fn is_skipped(entry: &DirEntry) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || (entry.file_type().is_dir() && name == "orginals")
}

/// Every picture under `images_root`, as gallery paths, in walk order.
pub fn collect_pictures(images_root: &Path) -> Vec<GalleryPath> {
    WalkDir::new(images_root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let name = e.file_name().to_str()?;
            if !is_picture(name) {
                return None;
            }
            let rel = e.path().strip_prefix(images_root).ok()?;
            let rel = rel.to_str()?;
            GalleryPath::parse(rel).ok()
        })
        .collect()
}

/// Generate thumbnails for `pictures` in parallel. Counts land in the
/// cache's [`CacheStats`](crate::thumbnails::CacheStats).
pub fn warm<B: ImageBackend>(
    cache: &ThumbnailCache<B>,
    pictures: &[GalleryPath],
) -> Vec<WarmFailure> {
    pictures
        .par_iter()
        .filter_map(|rel| match cache.get_or_create(rel) {
            Ok(_) => None,
            Err(e) => Some(WarmFailure {
                path: rel.clone(),
                message: e.to_string(),
            }),
        })
        .collect()
}
