//! Client-supplied path validation.
//!
//! Every path that arrives over HTTP is parsed into a [`GalleryPath`] before
//! anything touches the filesystem. A `GalleryPath` is a list of plain name
//! segments: no `..`, no root, no separators inside a segment. Joining it
//! onto a root directory therefore always lands inside that root.
//!
//! ```text
//! "/vacation//2019/./beach.jpg"  →  ["vacation", "2019", "beach.jpg"]
//! "/vacation/../../etc/passwd"   →  PathError::Traversal
//! "/vacation/.hidden"            →  PathError::DotSegment
//! ```
//!
//! Dot-prefixed segments are refused so the `.hidden` sidecars and the
//! default `.thumbs` cache tree can never be fetched directly.

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path escapes the image root: {0}")]
    Traversal(String),
    #[error("invalid character in path: {0}")]
    InvalidCharacter(String),
    #[error("dot-prefixed path segment: {0}")]
    DotSegment(String),
}

/// A normalized path relative to the image root (or the cache root, which
/// mirrors it).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GalleryPath {
    segments: Vec<String>,
}

impl GalleryPath {
    /// The image root itself.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a URL-style path. Leading, trailing and repeated slashes are
    /// ignored, as are `.` segments.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let mut segments = Vec::new();
        for segment in raw.split('/') {
            match segment {
                "" | "." => continue,
                ".." => return Err(PathError::Traversal(raw.to_string())),
                s if s.contains('\\') || s.contains('\0') => {
                    return Err(PathError::InvalidCharacter(raw.to_string()));
                }
                s if s.starts_with('.') => return Err(PathError::DotSegment(raw.to_string())),
                s => segments.push(s.to_string()),
            }
        }
        Ok(Self { segments })
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last segment, or `None` for the root.
    pub fn file_name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// The containing directory. The root is its own parent.
    pub fn parent(&self) -> GalleryPath {
        let mut segments = self.segments.clone();
        segments.pop();
        Self { segments }
    }

    /// Append a single child name. The name must be a plain segment; this is
    /// only called with names read back from `read_dir`.
    pub fn child(&self, name: &str) -> GalleryPath {
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Self { segments }
    }

    /// Resolve onto a base directory.
    pub fn resolve(&self, base: &Path) -> PathBuf {
        let mut path = base.to_path_buf();
        path.extend(&self.segments);
        path
    }

    /// URL form with a trailing slash, for linking to a directory listing.
    pub fn dir_url(&self) -> String {
        if self.is_root() {
            "/".to_string()
        } else {
            format!("/{}/", self.segments.join("/"))
        }
    }
}

impl fmt::Display for GalleryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_slashes_and_dots() {
        let p = GalleryPath::parse("/a//b/./c/").unwrap();
        assert_eq!(p.segments(), ["a", "b", "c"]);
        assert_eq!(p.to_string(), "/a/b/c");
    }

    #[test]
    fn parse_empty_is_root() {
        assert!(GalleryPath::parse("").unwrap().is_root());
        assert!(GalleryPath::parse("/").unwrap().is_root());
        assert!(GalleryPath::parse("//./").unwrap().is_root());
    }

    #[test]
    fn parse_rejects_parent_segments() {
        assert!(matches!(
            GalleryPath::parse("/a/../../etc/passwd"),
            Err(PathError::Traversal(_))
        ));
        assert!(matches!(
            GalleryPath::parse(".."),
            Err(PathError::Traversal(_))
        ));
    }

    #[test]
    fn parse_rejects_backslash_and_nul() {
        assert!(matches!(
            GalleryPath::parse("/a\\..\\b"),
            Err(PathError::InvalidCharacter(_))
        ));
        assert!(matches!(
            GalleryPath::parse("/a\0b"),
            Err(PathError::InvalidCharacter(_))
        ));
    }

    #[test]
    fn parse_rejects_dot_prefixed_segments() {
        assert!(matches!(
            GalleryPath::parse("/vacation/.hidden"),
            Err(PathError::DotSegment(_))
        ));
        assert!(matches!(
            GalleryPath::parse("/.thumbs/a.jpg"),
            Err(PathError::DotSegment(_))
        ));
    }

    #[test]
    fn parse_keeps_inner_dots_and_spaces() {
        let p = GalleryPath::parse("/summer 2019/img.v2.jpg").unwrap();
        assert_eq!(p.segments(), ["summer 2019", "img.v2.jpg"]);
    }

    #[test]
    fn resolve_stays_under_base() {
        let p = GalleryPath::parse("/vacation/beach.jpg").unwrap();
        let resolved = p.resolve(Path::new("/srv/images"));
        assert_eq!(resolved, PathBuf::from("/srv/images/vacation/beach.jpg"));
        assert!(resolved.starts_with("/srv/images"));
    }

    #[test]
    fn parent_and_file_name() {
        let p = GalleryPath::parse("/a/b/c.jpg").unwrap();
        assert_eq!(p.file_name(), Some("c.jpg"));
        assert_eq!(p.parent().to_string(), "/a/b");
        assert!(GalleryPath::root().parent().is_root());
        assert_eq!(GalleryPath::root().file_name(), None);
    }

    #[test]
    fn dir_url_has_trailing_slash() {
        assert_eq!(GalleryPath::root().dir_url(), "/");
        assert_eq!(GalleryPath::parse("a/b").unwrap().dir_url(), "/a/b/");
    }

    #[test]
    fn child_appends_segment() {
        let p = GalleryPath::parse("/a").unwrap().child("b.jpg");
        assert_eq!(p.to_string(), "/a/b.jpg");
    }
}
