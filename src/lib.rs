//! # Photoshelf
//!
//! A personal photo gallery served straight from a directory tree. There is
//! no database and no upload: directories become folders, pictures become a
//! grid of square thumbnails, and the filesystem is the only state.
//!
//! # Request Flow
//!
//! ```text
//! GET /vacation/beach.jpg?thumbnail
//!   server      peer IP → Access, URL → GalleryPath
//!   gallery     visibility check against vacation/.hidden
//!   thumbnails  cache hit, or single-flight generation into .thumbs/
//!   server      stream bytes with a one-year Cache-Control
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`paths`] | Validated, normalized request paths; traversal is impossible by construction |
//! | [`access`] | Admin vs. visitor, decided from the peer address |
//! | [`visibility`] | Per-directory `.hidden` manifests and serialized edits |
//! | [`imaging`] | Pure-Rust resize-and-crop behind the `ImageBackend` trait |
//! | [`thumbnails`] | On-disk thumbnail cache with single-flight generation |
//! | [`gallery`] | Listings, originals, previews and visibility edits over one image root |
//! | [`render`] | Maud templates for directory pages |
//! | [`server`] | Axum router, handlers, error mapping and logging setup |
//! | [`warm`] | Parallel thumbnail pre-generation for the `warm` command |
//! | [`config`] | `photoshelf.toml` loading, merging and validation |
//!
//! # Design Decisions
//!
//! ## Admin by Network Position
//!
//! Anyone connecting from a private, loopback or link-local address is an
//! admin. This is a home-network heuristic, not authentication: put the
//! server behind a reverse proxy and every visitor becomes an admin. The
//! decision is made once per request in [`access::Access::from_ip`] and passed
//! down explicitly.
//!
//! ## Thumbnails Are Never Invalidated
//!
//! The cache is keyed by path only. Replacing a source image leaves the old
//! thumbnail in place until the cache file is deleted. The crop is taken
//! from the top-left of the fitted image rather than the center, which
//! matches the thumbnails existing galleries already have on disk.
//!
//! ## Blocking Core, Async Edge
//!
//! The cache, manifests and image transforms are plain synchronous code using
//! `std::sync` primitives. The server runs them on tokio's blocking pool; the
//! `warm` command runs the same code on rayon. Single-flight therefore holds
//! across both.

pub mod access;
pub mod config;
pub mod gallery;
pub mod imaging;
pub mod paths;
pub mod render;
pub mod server;
pub mod thumbnails;
pub mod visibility;
pub mod warm;

#[cfg(test)]
pub(crate) mod test_helpers;
