//! Per-directory hidden-file manifests.
//!
//! Each directory may carry a `.hidden` sidecar: a JSON object mapping file
//! names to a hidden flag.
//!
//! ```json
//! { "beach.jpg": true, "sunset.jpg": false }
//! ```
//!
//! # Lenient loading
//!
//! A missing sidecar is the normal state of a directory nobody has edited,
//! so [`HiddenManifest::load`] never fails: missing, unreadable and
//! malformed files (a truncated write, hand-edited garbage) all load as an
//! empty manifest.
//!
//! # Writes
//!
//! [`VisibilityStore::set_hidden`] does load → modify → save under a
//! per-directory lock, so two admins hiding different files in the same
//! directory at the same moment both keep their change. The save writes a
//! temporary file next to the sidecar and renames it into place, so readers
//! see either the old manifest or the new one.

use crate::access::Access;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Name of the sidecar file inside each image directory.
pub const MANIFEST_FILENAME: &str = ".hidden";

/// Mapping of file name to hidden flag for one directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HiddenManifest {
    entries: BTreeMap<String, bool>,
}

impl HiddenManifest {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the sidecar from `dir`. Returns an empty manifest if the file
    /// doesn't exist or can't be parsed.
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(MANIFEST_FILENAME);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        match serde_json::from_str(&content) {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "ignoring unparsable manifest");
                Self::empty()
            }
        }
    }

    /// Replace the sidecar in `dir` with this manifest.
    pub fn save(&self, dir: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut tmp = tempfile::Builder::new()
            .prefix(".hidden.")
            .tempfile_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(dir.join(MANIFEST_FILENAME))
            .map_err(|e| e.error)?;
        Ok(())
    }

    pub fn is_hidden(&self, filename: &str) -> bool {
        self.entries.get(filename).copied().unwrap_or(false)
    }

    /// Admins see everything; visitors see anything not explicitly hidden.
    pub fn is_visible(&self, filename: &str, access: Access) -> bool {
        access.is_admin() || !self.is_hidden(filename)
    }

    pub fn set(&mut self, filename: &str, hidden: bool) {
        self.entries.insert(filename.to_string(), hidden);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Serializes manifest edits per directory.
///
/// The lock map only grows; it holds one entry per directory that has ever
/// been edited during this process's lifetime.
#[derive(Debug, Default)]
pub struct VisibilityStore {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl VisibilityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_manifest(&self, dir: &Path) -> HiddenManifest {
        HiddenManifest::load(dir)
    }

    /// Set one entry and rewrite the sidecar.
    ///
    /// Authorization is the caller's job.
    pub fn set_hidden(&self, dir: &Path, filename: &str, hidden: bool) -> io::Result<()> {
        let lock = self.lock_for(dir);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut manifest = HiddenManifest::load(dir);
        manifest.set(filename, hidden);
        manifest.save(dir)?;
        tracing::info!(
            dir = %dir.display(),
            file = filename,
            hidden,
            entries = manifest.len(),
            "saved hidden manifest"
        );
        Ok(())
    }

    fn lock_for(&self, dir: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(dir.to_path_buf()).or_default().clone()
    }
}
