//! # Favicon Generator Module
//!
//! Genera le varianti PNG delle favicon a partire da un'immagine sorgente.
//!
//! ## Responsabilità:
//! - Rende trasparenti i pixel quasi bianchi (tutti i canali >= soglia)
//! - Ridimensiona con filtro Lanczos3 a ciascuna dimensione quadrata
//! - Scrive ogni variante con sostituzione atomica nella directory di output
//!
//! Il packing ICO multi-size non è gestito qui.

use crate::{
    config::Config,
    error::OptimizeError,
    file_manager::FileManager,
    image_processor::encode_png,
    json_output::JsonMessage,
    progress::Console,
};
use anyhow::{Context, Result};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use std::path::PathBuf;
use tracing::info;

/// File name and square edge of each generated variant
pub const FAVICON_VARIANTS: &[(&str, u32)] = &[
    ("favicon-48x48.png", 48),
    ("android-chrome-192x192.png", 192),
    ("android-chrome-512x512.png", 512),
    ("apple-touch-icon.png", 180),
];

/// Turn every pixel whose R, G and B are all >= `threshold` into transparent white
pub fn make_white_transparent(img: &mut RgbaImage, threshold: u8) {
    for pixel in img.pixels_mut() {
        let Rgba([r, g, b, _]) = *pixel;
        if r >= threshold && g >= threshold && b >= threshold {
            *pixel = Rgba([255, 255, 255, 0]);
        }
    }
}

/// Resized, transparency-adjusted variants ready to encode
pub fn render_variants(source: &DynamicImage, threshold: u8) -> Vec<(&'static str, RgbaImage)> {
    let mut base = source.to_rgba8();
    make_white_transparent(&mut base, threshold);

    FAVICON_VARIANTS
        .iter()
        .map(|&(name, edge)| (name, imageops::resize(&base, edge, edge, FilterType::Lanczos3)))
        .collect()
}

pub struct FaviconGenerator {
    config: Config,
}

impl FaviconGenerator {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Write every variant and return the written paths
    pub async fn run(&self, console: &mut Console) -> Result<Vec<PathBuf>> {
        let source = &self.config.favicon_source;
        if !source.is_file() {
            return Err(OptimizeError::Validation(format!(
                "Source image not found: {}",
                source.display()
            ))
            .into());
        }

        let bytes = tokio::fs::read(source)
            .await
            .with_context(|| format!("Failed to read {}", source.display()))?;
        tokio::fs::create_dir_all(&self.config.favicon_out)
            .await
            .with_context(|| format!("Failed to create {}", self.config.favicon_out.display()))?;

        let out_dir = self.config.favicon_out.clone();
        let threshold = self.config.white_threshold;
        let written = tokio::task::spawn_blocking(move || -> Result<Vec<PathBuf>, OptimizeError> {
            let img = image::load_from_memory(&bytes)?;
            let mut written = Vec::with_capacity(FAVICON_VARIANTS.len());

            for (name, variant) in render_variants(&img, threshold) {
                let dest = out_dir.join(name);
                FileManager::write_atomically(&dest, &encode_png(&DynamicImage::ImageRgba8(variant))?)?;
                written.push(dest);
            }

            Ok(written)
        })
        .await?
        .with_context(|| format!("Failed to generate favicons from {}", source.display()))?;

        for path in &written {
            info!("Saved {}", path.display());
            console.line(&format!("Saved {}", path.display()));
            console.event(JsonMessage::Written { path: path.clone() });
        }

        Ok(written)
    }
}
