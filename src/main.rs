use clap::{Parser, Subcommand};
use photoshelf::config::{self, ServerConfig};
use photoshelf::server::{self, AppState};
use photoshelf::thumbnails::ThumbnailCache;
use photoshelf::warm;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "photoshelf")]
#[command(about = "Browse a directory of photos over HTTP")]
#[command(long_about = "\
Browse a directory of photos over HTTP

Directories become navigable folders, pictures are shown as a grid of
square thumbnails generated on first view and cached on disk.

  images/
  ├── .hidden                  # {\"name.jpg\": true} hides a picture from visitors
  ├── .thumbs/                 # Thumbnail cache (mirrors the tree)
  ├── beach.jpg
  └── 2019/
      └── alps.png

Clients on private or loopback addresses are admins: they see hidden
pictures and can hide or show them from the page.

Run 'photoshelf gen-config' to generate a documented photoshelf.toml.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    /// Image directory (overrides `images_root`)
    #[arg(long, global = true)]
    images: Option<PathBuf>,

    /// Listen address (overrides `server.listen`)
    #[arg(long, global = true)]
    listen: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the gallery server (default)
    Serve,
    /// Generate every missing thumbnail up front
    Warm,
    /// Print a stock photoshelf.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let config = resolve_config(&cli.config, cli.images, cli.listen)?;
            server::init_logging();
            let addr = config.listen_addr()?;
            let state = AppState::from_config(&config);
            tokio::runtime::Runtime::new()?.block_on(server::serve(state, addr))?;
        }
        Command::Warm => {
            let config = resolve_config(&cli.config, cli.images, cli.listen)?;
            init_thread_pool(&config.processing);
            let started = Instant::now();
            let cache = ThumbnailCache::new(config.images_root.clone(), config.cache_root());
            let pictures = warm::collect_pictures(&config.images_root);
            println!(
                "==> Warming {} thumbnails from {}",
                pictures.len(),
                config.images_root.display()
            );
            let failures = warm::warm(&cache, &pictures);
            for failure in &failures {
                eprintln!("  failed {}: {}", failure.path, failure.message);
            }
            println!(
                "Cache: {} in {:.1}s",
                cache.stats(),
                started.elapsed().as_secs_f64()
            );
            if !failures.is_empty() {
                return Err(format!("{} thumbnails failed", failures.len()).into());
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load the config file, then apply CLI overrides and re-validate.
fn resolve_config(
    path: &std::path::Path,
    images: Option<PathBuf>,
    listen: Option<String>,
) -> Result<ServerConfig, config::ConfigError> {
    let mut config = config::load_config(path)?;
    if let Some(images) = images {
        config.images_root = images;
    }
    if let Some(listen) = listen {
        config.server.listen = listen;
    }
    config.validate()?;
    Ok(config)
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down,
/// not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
