//! On-demand thumbnail cache.
//!
//! Thumbnails live in a cache tree that mirrors the image tree one-to-one:
//!
//! ```text
//! images/vacation/beach.jpg   →   images/.thumbs/vacation/beach.jpg
//! ```
//!
//! A thumbnail is generated the first time it is requested and never again:
//! there is no staleness check against the source. Delete the cache file (or
//! the whole cache tree) to force regeneration.
//!
//! # Single flight
//!
//! Two requests for the same missing thumbnail must not both run the
//! transform. The cache keeps a registry of in-flight generations keyed by
//! relative path:
//!
//! 1. The first caller registers a flight and becomes its leader.
//! 2. Later callers for the same key find the flight and block on it.
//! 3. The leader generates, removes the registry entry, and publishes the
//!    outcome (success or failure) to every waiter.
//!
//! Different keys never contend beyond the brief registry lock, so unrelated
//! thumbnails generate fully in parallel. The registry entry is released by
//! a drop guard, so a panicking backend cannot wedge a key.
//!
//! # Atomic writes
//!
//! The backend writes into a temporary file next to the final path, which is
//! renamed into place only after a successful encode. A failed or
//! interrupted generation leaves nothing behind, so a bad source can't
//! poison the cache with a truncated file.

use crate::imaging::{BackendError, ImageBackend, RustBackend, ThumbnailParams, ThumbnailSpec};
use crate::paths::GalleryPath;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Instant;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ThumbnailError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Thumbnail generation failed: {0}")]
    Backend(#[from] BackendError),
    #[error("Thumbnail generation for {path} failed in another request: {message}")]
    Joined { path: String, message: String },
    #[error("Not a file: {0}")]
    NotAFile(String),
}

/// Outcome shared with waiters. Errors travel as messages because
/// `io::Error` can't be cloned.
type SharedOutcome = Result<PathBuf, String>;

/// One in-progress generation that other callers can wait on.
#[derive(Default)]
struct Flight {
    outcome: Mutex<Option<SharedOutcome>>,
    done: Condvar,
}

impl Flight {
    fn finish(&self, outcome: SharedOutcome) {
        let mut slot = self.outcome.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(outcome);
        self.done.notify_all();
    }

    fn wait(&self) -> SharedOutcome {
        let mut slot = self.outcome.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            slot = self
                .done
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

type Registry = Mutex<HashMap<GalleryPath, Arc<Flight>>>;

/// Held by the leader of a flight. Dropping it deregisters the key and wakes
/// every waiter, with an "aborted" error if no outcome was recorded.
struct FlightGuard<'a> {
    registry: &'a Registry,
    key: GalleryPath,
    flight: Arc<Flight>,
    outcome: Option<SharedOutcome>,
}

impl FlightGuard<'_> {
    fn complete(mut self, result: &Result<PathBuf, ThumbnailError>) {
        self.outcome = Some(match result {
            Ok(path) => Ok(path.clone()),
            Err(e) => Err(e.to_string()),
        });
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
        let outcome = self
            .outcome
            .take()
            .unwrap_or_else(|| Err("thumbnail generation aborted".to_string()));
        self.flight.finish(outcome);
    }
}

enum Role {
    Leader(Arc<Flight>),
    Waiter(Arc<Flight>),
}

/// Counters for cache activity since startup.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    joined: AtomicU64,
    generated: AtomicU64,
    failed: AtomicU64,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Requests that waited on another request's generation.
    pub fn joined(&self) -> u64 {
        self.joined.load(Ordering::Relaxed)
    }

    pub fn generated(&self) -> u64 {
        self.generated.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.hits() + self.joined() + self.generated() + self.failed()
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cached, {} generated",
            self.hits(),
            self.generated()
        )?;
        if self.joined() > 0 {
            write!(f, ", {} joined", self.joined())?;
        }
        if self.failed() > 0 {
            write!(f, ", {} failed", self.failed())?;
        }
        write!(f, " ({} total)", self.total())
    }
}

/// Thumbnail cache over an image tree.
pub struct ThumbnailCache<B: ImageBackend = RustBackend> {
    images_root: PathBuf,
    cache_root: PathBuf,
    spec: ThumbnailSpec,
    backend: B,
    in_flight: Registry,
    stats: CacheStats,
}

impl ThumbnailCache<RustBackend> {
    pub fn new(images_root: impl Into<PathBuf>, cache_root: impl Into<PathBuf>) -> Self {
        Self::with_backend(images_root, cache_root, RustBackend::new())
    }
}

impl<B: ImageBackend> ThumbnailCache<B> {
    pub fn with_backend(
        images_root: impl Into<PathBuf>,
        cache_root: impl Into<PathBuf>,
        backend: B,
    ) -> Self {
        Self {
            images_root: images_root.into(),
            cache_root: cache_root.into(),
            spec: ThumbnailSpec::default(),
            backend,
            in_flight: Mutex::new(HashMap::new()),
            stats: CacheStats::default(),
        }
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Where the thumbnail for `rel` lives (whether or not it exists yet).
    pub fn cache_path(&self, rel: &GalleryPath) -> PathBuf {
        rel.resolve(&self.cache_root)
    }

    /// Create the cache directory mirroring `rel_dir`, including parents.
    /// Succeeds if it already exists, including when another thread creates
    /// it concurrently.
    pub fn ensure_cache_directory(&self, rel_dir: &GalleryPath) -> io::Result<PathBuf> {
        let dir = rel_dir.resolve(&self.cache_root);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Return the cached thumbnail for `rel`, generating it first if absent.
    pub fn get_or_create(&self, rel: &GalleryPath) -> Result<PathBuf, ThumbnailError> {
        if rel.is_root() {
            return Err(ThumbnailError::NotAFile(rel.to_string()));
        }
        let cache_path = self.cache_path(rel);
        if cache_path.is_file() {
            CacheStats::bump(&self.stats.hits);
            return Ok(cache_path);
        }

        let role = {
            let mut in_flight = self
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            match in_flight.get(rel) {
                Some(flight) => Role::Waiter(Arc::clone(flight)),
                None => {
                    let flight = Arc::new(Flight::default());
                    in_flight.insert(rel.clone(), Arc::clone(&flight));
                    Role::Leader(flight)
                }
            }
        };

        match role {
            Role::Waiter(flight) => {
                CacheStats::bump(&self.stats.joined);
                flight.wait().map_err(|message| ThumbnailError::Joined {
                    path: rel.to_string(),
                    message,
                })
            }
            Role::Leader(flight) => {
                let guard = FlightGuard {
                    registry: &self.in_flight,
                    key: rel.clone(),
                    flight,
                    outcome: None,
                };
                // Another leader may have finished between our existence
                // check and registering this flight.
                let result = if cache_path.is_file() {
                    CacheStats::bump(&self.stats.hits);
                    Ok(cache_path)
                } else {
                    self.generate(rel, &cache_path)
                };
                guard.complete(&result);
                result
            }
        }
    }

    fn generate(&self, rel: &GalleryPath, cache_path: &Path) -> Result<PathBuf, ThumbnailError> {
        let dir = self.ensure_cache_directory(&rel.parent())?;
        let source = rel.resolve(&self.images_root);

        // Keep the extension so the backend picks the right encoder.
        let suffix = cache_path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let tmp = tempfile::Builder::new()
            .prefix(".tmp-")
            .suffix(&suffix)
            .tempfile_in(&dir)?;

        let started = Instant::now();
        let params = ThumbnailParams {
            source: source.clone(),
            output: tmp.path().to_path_buf(),
            spec: self.spec,
        };
        if let Err(e) = self.backend.thumbnail(&params) {
            CacheStats::bump(&self.stats.failed);
            tracing::warn!(source = %source.display(), error = %e, "preview generation failed");
            return Err(e.into());
        }
        tmp.persist(cache_path).map_err(|e| e.error)?;

        CacheStats::bump(&self.stats.generated);
        tracing::info!(
            source = %source.display(),
            preview = %cache_path.display(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "created preview"
        );
        Ok(cache_path.to_path_buf())
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        self.in_flight.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockBackend;
    use std::fs;
    use std::sync::Barrier;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Fixture {
        tmp: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            fs::create_dir_all(tmp.path().join("images/vacation")).unwrap();
            fs::write(tmp.path().join("images/vacation/beach.jpg"), b"jpeg").unwrap();
            fs::write(tmp.path().join("images/vacation/dunes.jpg"), b"jpeg").unwrap();
            Self { tmp }
        }

        fn images(&self) -> PathBuf {
            self.tmp.path().join("images")
        }

        fn cache_dir(&self) -> PathBuf {
            self.tmp.path().join("cache")
        }

        fn cache(&self, backend: MockBackend) -> ThumbnailCache<MockBackend> {
            ThumbnailCache::with_backend(self.images(), self.cache_dir(), backend)
        }
    }

    fn path(raw: &str) -> GalleryPath {
        GalleryPath::parse(raw).unwrap()
    }

    // =========================================================================
    // Cache hits and misses
    // =========================================================================

    #[test]
    fn first_request_generates_into_mirrored_path() {
        let fx = Fixture::new();
        let cache = fx.cache(MockBackend::new());

        let result = cache.get_or_create(&path("/vacation/beach.jpg")).unwrap();

        assert_eq!(result, fx.cache_dir().join("vacation/beach.jpg"));
        assert!(result.is_file());
        assert_eq!(cache.backend().thumbnail_calls(), 1);
    }

    #[test]
    fn second_request_reuses_cached_file() {
        let fx = Fixture::new();
        let cache = fx.cache(MockBackend::new());
        let key = path("/vacation/beach.jpg");

        let first = cache.get_or_create(&key).unwrap();
        let second = cache.get_or_create(&key).unwrap();

        assert_eq!(first, second);
        assert_eq!(cache.backend().thumbnail_calls(), 1);
        assert_eq!(cache.stats().hits(), 1);
        assert_eq!(cache.stats().generated(), 1);
    }

    #[test]
    fn existing_cache_file_is_never_regenerated() {
        let fx = Fixture::new();
        fs::create_dir_all(fx.cache_dir().join("vacation")).unwrap();
        fs::write(fx.cache_dir().join("vacation/beach.jpg"), b"old thumb").unwrap();
        // Source changes after caching; the cache does not notice.
        fs::write(fx.images().join("vacation/beach.jpg"), b"new jpeg").unwrap();

        let cache = fx.cache(MockBackend::new());
        let result = cache.get_or_create(&path("/vacation/beach.jpg")).unwrap();

        assert_eq!(fs::read(result).unwrap(), b"old thumb");
        assert_eq!(cache.backend().thumbnail_calls(), 0);
    }

    #[test]
    fn root_path_is_rejected() {
        let fx = Fixture::new();
        let cache = fx.cache(MockBackend::new());
        assert!(matches!(
            cache.get_or_create(&GalleryPath::root()),
            Err(ThumbnailError::NotAFile(_))
        ));
    }

    // =========================================================================
    // Single flight
    // =========================================================================

    #[test]
    fn concurrent_requests_for_same_path_generate_once() {
        let fx = Fixture::new();
        let cache = fx.cache(MockBackend::with_delay(Duration::from_millis(100)));
        let key = path("/vacation/beach.jpg");
        let n = 16;
        let barrier = Barrier::new(n);

        let results: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..n)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        cache.get_or_create(&key)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(cache.backend().thumbnail_calls(), 1);
        let expected = fx.cache_dir().join("vacation/beach.jpg");
        for result in results {
            assert_eq!(result.unwrap(), expected);
        }
        assert!(expected.is_file());
        assert_eq!(cache.in_flight_len(), 0);
    }

    #[test]
    fn different_paths_each_generate_once() {
        let fx = Fixture::new();
        let cache = fx.cache(MockBackend::with_delay(Duration::from_millis(50)));
        let keys = [path("/vacation/beach.jpg"), path("/vacation/dunes.jpg")];
        let barrier = Barrier::new(8);

        std::thread::scope(|s| {
            for i in 0..8 {
                let key = &keys[i % 2];
                let cache = &cache;
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    cache.get_or_create(key).unwrap();
                });
            }
        });

        assert_eq!(cache.backend().thumbnail_calls(), 2);
        assert!(fx.cache_dir().join("vacation/beach.jpg").is_file());
        assert!(fx.cache_dir().join("vacation/dunes.jpg").is_file());
    }

    #[test]
    fn waiters_see_leader_failure() {
        let fx = Fixture::new();
        let cache = fx.cache(MockBackend::with_delay(Duration::from_millis(200)));
        let key = path("/vacation/missing.jpg");
        let barrier = Barrier::new(4);

        let results: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        cache.get_or_create(&key)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(results.iter().all(|r| r.is_err()));
        assert_eq!(cache.backend().thumbnail_calls(), 1);
        assert_eq!(cache.in_flight_len(), 0);
    }

    // =========================================================================
    // Failures
    // =========================================================================

    #[test]
    fn missing_source_is_an_error_and_leaves_nothing() {
        let fx = Fixture::new();
        let cache = fx.cache(MockBackend::new());

        let result = cache.get_or_create(&path("/vacation/missing.jpg"));

        assert!(matches!(result, Err(ThumbnailError::Backend(_))));
        let leftovers: Vec<_> = fs::read_dir(fx.cache_dir().join("vacation"))
            .unwrap()
            .collect();
        assert!(leftovers.is_empty(), "found {leftovers:?}");
        assert_eq!(cache.stats().failed(), 1);
    }

    #[test]
    fn failed_encode_leaves_no_partial_file() {
        let fx = Fixture::new();
        let cache = fx.cache(MockBackend::failing());

        let result = cache.get_or_create(&path("/vacation/beach.jpg"));

        assert!(result.is_err());
        assert!(!fx.cache_dir().join("vacation/beach.jpg").exists());
        let leftovers: Vec<_> = fs::read_dir(fx.cache_dir().join("vacation"))
            .unwrap()
            .collect();
        assert!(leftovers.is_empty(), "found {leftovers:?}");
    }

    #[test]
    fn failure_is_retried_on_next_request() {
        let fx = Fixture::new();
        let cache = fx.cache(MockBackend::new());
        let key = path("/vacation/late.jpg");

        assert!(cache.get_or_create(&key).is_err());
        fs::write(fx.images().join("vacation/late.jpg"), b"jpeg").unwrap();
        assert!(cache.get_or_create(&key).is_ok());
        assert_eq!(cache.backend().thumbnail_calls(), 2);
    }

    // =========================================================================
    // Cache directories
    // =========================================================================

    #[test]
    fn ensure_cache_directory_is_idempotent() {
        let fx = Fixture::new();
        let cache = fx.cache(MockBackend::new());
        let dir = path("/a/b/c");

        let first = cache.ensure_cache_directory(&dir).unwrap();
        let second = cache.ensure_cache_directory(&dir).unwrap();

        assert_eq!(first, second);
        assert!(fx.cache_dir().join("a/b/c").is_dir());
    }

    #[test]
    fn ensure_cache_directory_concurrent() {
        let fx = Fixture::new();
        let cache = fx.cache(MockBackend::new());
        let dir = path("/deep/nested/tree");
        let barrier = Barrier::new(8);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    barrier.wait();
                    cache.ensure_cache_directory(&dir).unwrap();
                });
            }
        });

        assert!(fx.cache_dir().join("deep/nested/tree").is_dir());
    }

    // =========================================================================
    // CacheStats
    // =========================================================================

    #[test]
    fn cache_stats_display_plain() {
        let s = CacheStats::default();
        s.hits.store(5, Ordering::Relaxed);
        s.generated.store(2, Ordering::Relaxed);
        assert_eq!(s.to_string(), "5 cached, 2 generated (7 total)");
    }

    #[test]
    fn cache_stats_display_with_joins_and_failures() {
        let s = CacheStats::default();
        s.hits.store(1, Ordering::Relaxed);
        s.generated.store(1, Ordering::Relaxed);
        s.joined.store(3, Ordering::Relaxed);
        s.failed.store(1, Ordering::Relaxed);
        assert_eq!(
            s.to_string(),
            "1 cached, 1 generated, 3 joined, 1 failed (6 total)"
        );
    }
}
