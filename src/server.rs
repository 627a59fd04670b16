//! HTTP front end.
//!
//! Routes every path through two handlers:
//!
//! | Request | Response |
//! |---|---|
//! | `GET /<dir>/` | Directory page |
//! | `GET /<dir>` | `308` to `/<dir>/` |
//! | `GET /<file>?thumbnail` | Thumbnail bytes |
//! | `GET /<file>` | Original bytes |
//! | `POST /<file>` with `action=hide\|show` | `303` back to the directory (admin only) |
//!
//! The caller's [`Access`] is derived from the peer address supplied by
//! `into_make_service_with_connect_info`. All filesystem and image work runs
//! on the blocking pool.

use crate::access::Access;
use crate::config::ServerConfig;
use crate::gallery::{GalleryError, GalleryService, ImageFile, Target};
use crate::paths::{GalleryPath, PathError};
use crate::render::{encode_path, render_listing};
use crate::thumbnails::ThumbnailCache;
use axum::body::Body;
use axum::extract::{ConnectInfo, Form, Path, Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, Uri, header};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::io::ReaderStream;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Sent with every original and thumbnail. Files are addressed by path and
/// thumbnails never change once written.
pub const IMAGE_CACHE_CONTROL: &str = "public,no-transform,max-age=31536000";

pub const RESPONSE_TIME_HEADER: &str = "x-response-time";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub gallery: Arc<GalleryService>,
    pub title: Arc<str>,
}

impl AppState {
    pub fn new(gallery: GalleryService, title: impl Into<Arc<str>>) -> Self {
        Self {
            gallery: Arc::new(gallery),
            title: title.into(),
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        let cache = ThumbnailCache::new(config.images_root.clone(), config.cache_root());
        Self::new(
            GalleryService::new(config.images_root.clone(), cache),
            config.server.title.as_str(),
        )
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(get_entry).post(post_entry))
        .route("/{*path}", get(get_entry).post(post_entry))
        .layer(middleware::from_fn(response_time))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// filter.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "photoshelf=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(state: AppState, addr: SocketAddr) -> io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        images = %state.gallery.images_root().display(),
        cache = %state.gallery.thumbnails().cache_root().display(),
        "listening"
    );

    let app = router(state.clone());
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!(thumbnails = %state.gallery.thumbnails().stats(), "shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
}

// ============================================================================
// Middleware
// ============================================================================

async fn response_time(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let mut response = next.run(request).await;
    let elapsed = format!("{}ms", started.elapsed().as_millis());
    if let Ok(value) = HeaderValue::from_str(&elapsed) {
        response.headers_mut().insert(RESPONSE_TIME_HEADER, value);
    }
    response
}

// ============================================================================
// Handlers
// ============================================================================

enum Reply {
    Redirect(String),
    Page(String),
    Image(ImageFile),
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self {
            Reply::Redirect(location) => Redirect::permanent(&location).into_response(),
            Reply::Page(html) => Html(html).into_response(),
            Reply::Image(image) => image_response(image),
        }
    }
}

fn image_response(image: ImageFile) -> Response {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(image.content_type.as_ref()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(image.len));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(IMAGE_CACHE_CONTROL),
    );
    let stream = ReaderStream::new(tokio::fs::File::from_std(image.file));
    (headers, Body::from_stream(stream)).into_response()
}

/// Run gallery work on the blocking pool.
async fn blocking<T, F>(work: F) -> Result<T, GalleryError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, GalleryError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| GalleryError::Io(io::Error::other(e)))?
}

fn parse_path(path: Option<Path<String>>) -> Result<GalleryPath, GalleryError> {
    let raw = path.map(|Path(p)| p).unwrap_or_default();
    Ok(GalleryPath::parse(&raw)?)
}

async fn get_entry(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    path: Option<Path<String>>,
    uri: Uri,
) -> Result<Reply, GalleryError> {
    let rel = parse_path(path)?;
    let access = Access::from_ip(peer.ip());
    let wants_thumbnail = uri.query().is_some_and(|q| q.contains("thumbnail"));
    let has_trailing_slash = uri.path().ends_with('/');

    blocking(move || match state.gallery.resolve(&rel)? {
        Target::Directory if !has_trailing_slash => {
            Ok(Reply::Redirect(encode_path(&rel.dir_url())))
        }
        Target::Directory => {
            let listing = state.gallery.list_directory(&rel, access)?;
            let page = render_listing(&state.title, &listing, access);
            Ok(Reply::Page(page.into_string()))
        }
        Target::File if wants_thumbnail => {
            Ok(Reply::Image(state.gallery.open_preview(&rel, access)?))
        }
        Target::File => Ok(Reply::Image(state.gallery.open_original(&rel)?)),
    })
    .await
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum VisibilityAction {
    Hide,
    Show,
}

#[derive(Debug, Deserialize)]
struct VisibilityForm {
    action: VisibilityAction,
}

async fn post_entry(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    path: Option<Path<String>>,
    Form(form): Form<VisibilityForm>,
) -> Result<Redirect, GalleryError> {
    let rel = parse_path(path)?;
    let access = Access::from_ip(peer.ip());
    let hidden = matches!(form.action, VisibilityAction::Hide);

    let Some(filename) = rel.file_name().map(str::to_string) else {
        return Err(GalleryError::NotFound(rel.to_string()));
    };
    let dir = rel.parent();
    let back = encode_path(&dir.dir_url());

    blocking(move || state.gallery.set_visibility(&dir, &filename, hidden, access)).await?;
    Ok(Redirect::to(&back))
}

// ============================================================================
// Error mapping
// ============================================================================

impl GalleryError {
    pub fn status(&self) -> StatusCode {
        match self {
            GalleryError::Path(PathError::DotSegment(_)) => StatusCode::NOT_FOUND,
            GalleryError::Path(_) => StatusCode::BAD_REQUEST,
            GalleryError::NotFound(_) => StatusCode::NOT_FOUND,
            GalleryError::Forbidden => StatusCode::FORBIDDEN,
            GalleryError::Io(_) | GalleryError::Thumbnail(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GalleryError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match status {
            StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!(error = %self, "request failed");
                "internal server error".to_string()
            }
            StatusCode::NOT_FOUND => "not found".to_string(),
            _ => self.to_string(),
        };
        (status, message).into_response()
    }
}
