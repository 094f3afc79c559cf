//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dei job sugli asset.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri dei tre job
//! - Fornisce validazione dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `assets_dir`: Root degli asset (default: `assets`)
//! - `backups_dir`: Root dei backup set (default: `backups`)
//! - `jpeg_quality`: Qualità JPEG (1-100, default: 85)
//! - `webp_quality` / `webp_lossless`: WebP lossy a qualità 85, lossless solo su richiesta
//! - `convert_webp_quality`: Qualità dei sibling WebP (default: 80)
//! - `gif_speed`: Velocità quantizzazione GIF (1-30, default: 10, più basso = migliore)
//! - `size_threshold`: Sostituisce solo se `nuovo < originale * soglia` (default: 1.0)
//! - `dry_run`: Ricodifica in memoria senza toccare i file (default: false)
//! - `webp_min_size`: Soglia PNG per la conversione WebP (default: 3 MiB)
//! - `favicon_source` / `favicon_out`: Sorgente e destinazione favicon
//! - `white_threshold`: Canale minimo per rendere trasparente un pixel (default: 245)
//!
//! ## Esempio:
//! ```ignore
//! let config = Config {
//!     jpeg_quality: 80,
//!     dry_run: true,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use crate::error::OptimizeError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Configuration shared by the optimize, convert-webp and favicons jobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root directory holding the site's raster assets
    pub assets_dir: PathBuf,
    /// Directory under which timestamped backup sets are created
    pub backups_dir: PathBuf,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
    /// WebP quality for in-place re-encoding (1-100)
    pub webp_quality: u8,
    /// Re-encode WebP losslessly instead of at `webp_quality`
    pub webp_lossless: bool,
    /// WebP quality for siblings written by convert-webp (1-100)
    pub convert_webp_quality: u8,
    /// GIF quantizer speed (1-30, lower = better palette)
    pub gif_speed: i32,
    /// Size threshold (replace only if new size < original * threshold)
    pub size_threshold: f64,
    /// Dry run - encode in memory, don't back up or replace files
    pub dry_run: bool,
    /// PNGs strictly larger than this get a WebP sibling
    pub webp_min_size: u64,
    /// Source image for favicon variants
    pub favicon_source: PathBuf,
    /// Directory receiving favicon variants
    pub favicon_out: PathBuf,
    /// Pixels with every channel >= this become transparent in favicons
    pub white_threshold: u8,
    /// Output progress and status as JSON lines
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("assets"),
            backups_dir: PathBuf::from("backups"),
            jpeg_quality: 85,
            webp_quality: 85,
            webp_lossless: false,
            convert_webp_quality: 80,
            gif_speed: 10,
            size_threshold: 1.0,
            dry_run: false,
            webp_min_size: 3 * 1024 * 1024,
            favicon_source: PathBuf::from("assets").join("favicon.png"),
            favicon_out: PathBuf::from("."),
            white_threshold: 245,
            json_output: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), OptimizeError> {
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(OptimizeError::Validation(
                "JPEG quality must be between 1 and 100".to_string(),
            ));
        }

        if !(1..=100).contains(&self.webp_quality) || !(1..=100).contains(&self.convert_webp_quality) {
            return Err(OptimizeError::Validation(
                "WebP quality must be between 1 and 100".to_string(),
            ));
        }

        if !(1..=30).contains(&self.gif_speed) {
            return Err(OptimizeError::Validation(
                "GIF speed must be between 1 and 30".to_string(),
            ));
        }

        if self.size_threshold <= 0.0 || self.size_threshold > 1.0 {
            return Err(OptimizeError::Validation(
                "Size threshold must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.webp_min_size == 0 {
            return Err(OptimizeError::Validation(
                "WebP minimum size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Load configuration from a JSON file, falling back to defaults when it is absent
    pub async fn from_file(path: &Path) -> Result<Self, OptimizeError> {
        if !path.exists() {
            warn!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<(), OptimizeError> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}
