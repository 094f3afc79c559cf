//! # Site Asset Optimizer - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing` (su stderr)
//! - Caricamento configurazione da file JSON e override da CLI
//! - Avvio del job richiesto
//!
//! ## Esempio di utilizzo:
//! ```bash
//! asset-optimizer optimize --quality 80
//! asset-optimizer --assets public/img convert-webp --min-size 2097152
//! asset-optimizer favicons --source assets/logo.png --out public
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use site_asset_optimizer::{AssetOptimizer, Config, Console, FaviconGenerator, OutputMode, WebpConverter};

#[derive(Parser)]
#[command(name = "asset-optimizer")]
#[command(about = "Back up and re-encode a website's raster assets")]
struct Args {
    /// JSON configuration file (missing file = defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Asset root directory
    #[arg(long, global = true)]
    assets: Option<PathBuf>,

    /// Emit one JSON object per line instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Back up every raster asset, then re-encode each in place (default)
    Optimize {
        /// Directory receiving the timestamped backup set
        #[arg(long)]
        backups: Option<PathBuf>,

        /// JPEG quality (1-100)
        #[arg(short, long)]
        quality: Option<u8>,

        /// Size threshold (replace only if new size < original * threshold)
        #[arg(short, long)]
        threshold: Option<f64>,

        /// WebP quality (1-100)
        #[arg(long)]
        webp_quality: Option<u8>,

        /// Re-encode WebP losslessly
        #[arg(long)]
        webp_lossless: bool,

        /// GIF quantizer speed (1-30)
        #[arg(long)]
        gif_speed: Option<i32>,

        /// Dry run - don't back up or replace files
        #[arg(long)]
        dry_run: bool,
    },

    /// Write a WebP sibling for every PNG above a size threshold
    ConvertWebp {
        /// Minimum PNG size in bytes (exclusive)
        #[arg(long)]
        min_size: Option<u64>,

        /// WebP quality (1-100)
        #[arg(short, long)]
        quality: Option<u8>,
    },

    /// Generate favicon PNG variants from a source image
    Favicons {
        /// Source image
        #[arg(long)]
        source: Option<PathBuf>,

        /// Output directory
        #[arg(long)]
        out: Option<PathBuf>,

        /// Channel value from which pixels become transparent
        #[arg(long)]
        white_threshold: Option<u8>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = match &args.config {
        Some(path) => Config::from_file(path).await?,
        None => Config::default(),
    };

    if let Some(assets) = args.assets {
        config.assets_dir = assets;
    }
    config.json_output = config.json_output || args.json;

    let command = args.command.unwrap_or(Command::Optimize {
        backups: None,
        quality: None,
        threshold: None,
        webp_quality: None,
        webp_lossless: false,
        gif_speed: None,
        dry_run: false,
    });

    let mode = if config.json_output {
        OutputMode::Json
    } else {
        OutputMode::Text
    };
    let mut console = Console::new(mode);

    match command {
        Command::Optimize {
            backups,
            quality,
            threshold,
            webp_quality,
            webp_lossless,
            gif_speed,
            dry_run,
        } => {
            if let Some(backups) = backups {
                config.backups_dir = backups;
            }
            if let Some(quality) = quality {
                config.jpeg_quality = quality;
            }
            if let Some(threshold) = threshold {
                config.size_threshold = threshold;
            }
            if let Some(webp_quality) = webp_quality {
                config.webp_quality = webp_quality;
            }
            config.webp_lossless = config.webp_lossless || webp_lossless;
            if let Some(gif_speed) = gif_speed {
                config.gif_speed = gif_speed;
            }
            config.dry_run = config.dry_run || dry_run;
            debug!("Effective configuration: {:?}", config);

            AssetOptimizer::new(config)?.run(&mut console).await?;
        }
        Command::ConvertWebp { min_size, quality } => {
            if let Some(min_size) = min_size {
                config.webp_min_size = min_size;
            }
            if let Some(quality) = quality {
                config.convert_webp_quality = quality;
            }
            debug!("Effective configuration: {:?}", config);

            WebpConverter::new(config)?.run(&mut console).await?;
        }
        Command::Favicons {
            source,
            out,
            white_threshold,
        } => {
            if let Some(source) = source {
                config.favicon_source = source;
            }
            if let Some(out) = out {
                config.favicon_out = out;
            }
            if let Some(white_threshold) = white_threshold {
                config.white_threshold = white_threshold;
            }
            config.validate()?;
            debug!("Effective configuration: {:?}", config);

            FaviconGenerator::new(config).run(&mut console).await?;
        }
    }

    Ok(())
}
