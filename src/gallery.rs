//! Gallery operations: listing, originals, previews and visibility edits.
//!
//! [`GalleryService`] composes the [`VisibilityStore`] and the
//! [`ThumbnailCache`] over one image root. Every method takes an already
//! validated [`GalleryPath`], so nothing here can reach outside the root.
//! Callers that act on behalf of a client pass that client's [`Access`].
//!
//! ## Listing rules
//!
//! | Entry | Treatment |
//! |---|---|
//! | Dot-prefixed (`.hidden`, `.thumbs`) | Skipped |
//! | `*.png`, `*.jpg`, `*.jpeg`, `*.gif` (any case) | Picture, filtered by visibility |
//! | Directory named `orginals` | Skipped (legacy originals folder) |
//! | Other directory | Subdirectory |
//! | Anything else | Skipped (still reachable by direct URL) |
//!
//! Both lists are sorted by name.

use crate::access::Access;
use crate::imaging::{ImageBackend, RustBackend};
use crate::paths::{GalleryPath, PathError};
use crate::thumbnails::{ThumbnailCache, ThumbnailError};
use crate::visibility::{HiddenManifest, VisibilityStore};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Extensions listed as pictures. Matched case-insensitively.
pub const PICTURE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

/// Directory name that never appears in listings.
const LEGACY_ORIGINALS_DIR: &str = "orginals";

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Admin access required")]
    Forbidden,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Thumbnail(#[from] ThumbnailError),
}

/// One child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub relative_path: GalleryPath,
    pub absolute_path: PathBuf,
    /// Only meaningful for pictures; always `false` for directories.
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    pub name: String,
    /// Directory URL with trailing slash.
    pub path: String,
    pub active: bool,
}

/// What a caller may see in one directory.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub path: GalleryPath,
    pub files: Vec<DirectoryEntry>,
    pub dirs: Vec<DirectoryEntry>,
    pub breadcrumbs: Vec<Breadcrumb>,
}

/// What a path points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Directory,
    File,
}

/// An open image ready to be streamed.
#[derive(Debug)]
pub struct ImageFile {
    pub file: File,
    pub content_type: mime_guess::Mime,
    pub len: u64,
}

impl ImageFile {
    fn open(path: &Path) -> Result<Self, GalleryError> {
        let file = File::open(path).map_err(|e| not_found_or_io(e, path))?;
        let meta = file.metadata()?;
        if !meta.is_file() {
            return Err(GalleryError::NotFound(path.display().to_string()));
        }
        Ok(Self {
            file,
            content_type: mime_guess::from_path(path).first_or_octet_stream(),
            len: meta.len(),
        })
    }
}

fn not_found_or_io(e: io::Error, path: &Path) -> GalleryError {
    if e.kind() == io::ErrorKind::NotFound {
        GalleryError::NotFound(path.display().to_string())
    } else {
        GalleryError::Io(e)
    }
}

/// Whether `name` has a picture extension.
pub fn is_picture(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            PICTURE_EXTENSIONS
                .iter()
                .any(|p| p.eq_ignore_ascii_case(ext))
        })
}

/// `(root)` followed by one crumb per segment. The last crumb is active.
pub fn breadcrumbs(dir: &GalleryPath) -> Vec<Breadcrumb> {
    let mut crumbs = vec![Breadcrumb {
        name: "(root)".to_string(),
        path: "/".to_string(),
        active: false,
    }];
    let mut current = GalleryPath::root();
    for segment in dir.segments() {
        current = current.child(segment);
        crumbs.push(Breadcrumb {
            name: segment.clone(),
            path: current.dir_url(),
            active: false,
        });
    }
    if let Some(last) = crumbs.last_mut() {
        last.active = true;
    }
    crumbs
}

pub struct GalleryService<B: ImageBackend = RustBackend> {
    images_root: PathBuf,
    visibility: VisibilityStore,
    thumbnails: ThumbnailCache<B>,
}

impl<B: ImageBackend> GalleryService<B> {
    pub fn new(images_root: impl Into<PathBuf>, thumbnails: ThumbnailCache<B>) -> Self {
        Self {
            images_root: images_root.into(),
            visibility: VisibilityStore::new(),
            thumbnails,
        }
    }

    pub fn images_root(&self) -> &Path {
        &self.images_root
    }

    pub fn thumbnails(&self) -> &ThumbnailCache<B> {
        &self.thumbnails
    }

    pub fn visibility(&self) -> &VisibilityStore {
        &self.visibility
    }

    pub fn resolve(&self, rel: &GalleryPath) -> Result<Target, GalleryError> {
        let path = rel.resolve(&self.images_root);
        let meta = fs::metadata(&path).map_err(|e| not_found_or_io(e, &path))?;
        if meta.is_dir() {
            Ok(Target::Directory)
        } else if meta.is_file() {
            Ok(Target::File)
        } else {
            Err(GalleryError::NotFound(rel.to_string()))
        }
    }

    pub fn list_directory(
        &self,
        rel_dir: &GalleryPath,
        access: Access,
    ) -> Result<Listing, GalleryError> {
        let dir = rel_dir.resolve(&self.images_root);
        let read_dir = fs::read_dir(&dir).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => {
                GalleryError::NotFound(rel_dir.to_string())
            }
            _ => GalleryError::Io(e),
        })?;
        let manifest = self.visibility.load_manifest(&dir);

        let mut files = Vec::new();
        let mut dirs = Vec::new();
        for entry in read_dir {
            let entry = entry?;
            // Non-UTF-8 names can't be linked to; leave them out.
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            let absolute_path = entry.path();
            // Follows symlinks; a dangling link is skipped.
            let Ok(meta) = fs::metadata(&absolute_path) else {
                continue;
            };

            if meta.is_dir() {
                if name == LEGACY_ORIGINALS_DIR {
                    continue;
                }
                dirs.push(DirectoryEntry {
                    relative_path: rel_dir.child(&name),
                    absolute_path,
                    hidden: false,
                    name,
                });
            } else if meta.is_file() && is_picture(&name) {
                if !manifest.is_visible(&name, access) {
                    continue;
                }
                files.push(DirectoryEntry {
                    relative_path: rel_dir.child(&name),
                    absolute_path,
                    hidden: manifest.is_hidden(&name),
                    name,
                });
            }
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        dirs.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(Listing {
            path: rel_dir.clone(),
            files,
            dirs,
            breadcrumbs: breadcrumbs(rel_dir),
        })
    }

    /// Open the original file. Visibility is not consulted here; hidden
    /// files stay reachable by exact URL.
    pub fn open_original(&self, rel: &GalleryPath) -> Result<ImageFile, GalleryError> {
        if rel.is_root() {
            return Err(GalleryError::NotFound(rel.to_string()));
        }
        ImageFile::open(&rel.resolve(&self.images_root))
    }

    /// Open the thumbnail for `rel`, generating it on first request.
    ///
    /// Visitors asking for a hidden picture get `NotFound`, as if it did not
    /// exist.
    pub fn open_preview(
        &self,
        rel: &GalleryPath,
        access: Access,
    ) -> Result<ImageFile, GalleryError> {
        let Some(name) = rel.file_name() else {
            return Err(GalleryError::NotFound(rel.to_string()));
        };
        if !is_picture(name) {
            return Err(GalleryError::NotFound(rel.to_string()));
        }
        let manifest = self.manifest_for(&rel.parent());
        if !manifest.is_visible(name, access) {
            return Err(GalleryError::NotFound(rel.to_string()));
        }
        if !rel.resolve(&self.images_root).is_file() {
            return Err(GalleryError::NotFound(rel.to_string()));
        }

        let cached = self.thumbnails.get_or_create(rel)?;
        ImageFile::open(&cached)
    }

    /// Hide or unhide `filename` inside `rel_dir`. Admin only.
    pub fn set_visibility(
        &self,
        rel_dir: &GalleryPath,
        filename: &str,
        hidden: bool,
        access: Access,
    ) -> Result<(), GalleryError> {
        if !access.is_admin() {
            return Err(GalleryError::Forbidden);
        }
        let rel_file = GalleryPath::parse(filename)?;
        if rel_file.segments() != [filename] {
            return Err(PathError::InvalidCharacter(filename.to_string()).into());
        }
        let target = rel_dir.child(filename);
        if self.resolve(&target)? != Target::File {
            return Err(GalleryError::NotFound(target.to_string()));
        }

        let dir = rel_dir.resolve(&self.images_root);
        self.visibility.set_hidden(&dir, filename, hidden)?;
        Ok(())
    }

    pub fn manifest_for(&self, rel_dir: &GalleryPath) -> HiddenManifest {
        self.visibility
            .load_manifest(&rel_dir.resolve(&self.images_root))
    }
}
