//! Server configuration.
//!
//! Handles loading, validating, and merging `photoshelf.toml`. Stock defaults
//! are overridden by the config file, which is in turn overridden by CLI
//! flags (`--images`, `--listen`).
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! images_root = "images"     # Directory tree to browse
//! # cache_root = "thumbs"    # Thumbnail cache (default: <images_root>/.thumbs)
//!
//! [server]
//! listen = "0.0.0.0:3000"    # Address and port to bind
//! title = "Pictures"         # Page title
//!
//! [processing]
//! max_processes = 4          # Max parallel workers for `warm` (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILENAME: &str = "photoshelf.toml";

/// Name of the default cache directory inside the image root.
pub const DEFAULT_CACHE_DIRNAME: &str = ".thumbs";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Server configuration loaded from `photoshelf.toml`.
///
/// All fields have sensible defaults. Config files need only specify the
/// values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Root of the browsable image tree.
    pub images_root: PathBuf,
    /// Root of the thumbnail cache tree. `None` means `<images_root>/.thumbs`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_root: Option<PathBuf>,
    /// HTTP listener settings.
    pub server: ListenConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            images_root: PathBuf::from("images"),
            cache_root: None,
            server: ListenConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.images_root.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "images_root must not be empty".into(),
            ));
        }
        if let Some(cache_root) = &self.cache_root
            && cache_root.as_os_str().is_empty()
        {
            return Err(ConfigError::Validation(
                "cache_root must not be empty when set".into(),
            ));
        }
        self.listen_addr()?;
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server.listen.parse().map_err(|_| {
            ConfigError::Validation(format!(
                "server.listen is not a socket address: {}",
                self.server.listen
            ))
        })
    }

    /// The effective cache root.
    pub fn cache_root(&self) -> PathBuf {
        self.cache_root
            .clone()
            .unwrap_or_else(|| self.images_root.join(DEFAULT_CACHE_DIRNAME))
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListenConfig {
    /// Socket address to bind, e.g. `"0.0.0.0:3000"`.
    pub listen: String,
    /// Title shown in the browser tab and page header.
    pub title: String,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:3000".to_string(),
            title: "Pictures".to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel thumbnail workers for `warm`.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(ServerConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Load config from `path`, merging it over stock defaults and validating.
/// A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match load_raw_config(path)? {
        Some(overlay) => merge_toml(base, overlay),
        None => base,
    };
    let config: ServerConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `photoshelf.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# photoshelf configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# Directory tree to browse. Subdirectories become navigable folders;
# .png, .jpg, .jpeg and .gif files are shown as pictures.
images_root = "images"

# Where generated thumbnails are cached. The tree mirrors images_root.
# Defaults to a hidden .thumbs directory inside images_root.
# cache_root = "thumbs"

# ---------------------------------------------------------------------------
# HTTP server
# ---------------------------------------------------------------------------
[server]
# Address and port to listen on. Clients connecting from private or
# loopback addresses get admin rights (see hidden files, hide/show).
listen = "0.0.0.0:3000"

# Page title.
title = "Pictures"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel thumbnail workers for `photoshelf warm`.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
