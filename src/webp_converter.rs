//! # WebP Converter Module
//!
//! Converte i PNG sopra una soglia di dimensione (default 3 MiB) in WebP lossy
//! (qualità `convert_webp_quality`, default 80), scrivendo un file `.webp` accanto all'originale. Gli originali non vengono
//! mai modificati né rimossi, quindi non serve un backup set.

use crate::{
    config::Config,
    error::OptimizeError,
    file_manager::FileManager,
    image_processor::{encode_webp, WebpMode},
    json_output::JsonMessage,
    optimizer::path_resolver::PathResolver,
    progress::Console,
    report::{FileOutcome, FileReport, RunReport},
};
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Writes lossy WebP siblings for oversized PNGs
pub struct WebpConverter {
    config: Config,
}

impl WebpConverter {
    pub fn new(config: Config) -> Result<Self, OptimizeError> {
        config.validate()?;

        if !config.assets_dir.is_dir() {
            return Err(OptimizeError::Validation(format!(
                "Assets folder not found: {}",
                config.assets_dir.display()
            )));
        }

        Ok(Self { config })
    }

    pub async fn run(&self, console: &mut Console) -> Result<RunReport> {
        let assets_dir = &self.config.assets_dir;
        let threshold = FileManager::format_size(self.config.webp_min_size);
        info!("Looking for PNGs larger than {} in {}", threshold, assets_dir.display());

        let files = FileManager::find_large_pngs(assets_dir, self.config.webp_min_size)?;
        console.event(JsonMessage::start("convert-webp", assets_dir.clone(), files.len()));

        let mut report = RunReport::new();

        if files.is_empty() {
            let message = format!("No PNGs >{} found in assets.", threshold);
            console.line(&message);
            console.event(JsonMessage::Notice { message });
            return Ok(report);
        }

        console.line(&format!("Found {} PNG(s) >{} to convert.", files.len(), threshold));
        console.start_progress(files.len() as u64);

        for file in &files {
            let out_path = PathResolver::webp_sibling(file);
            let file_report = match self.convert(file, &out_path).await {
                Ok(outcome) => {
                    let file_report = FileReport::new(file, outcome);
                    console.line(&Self::describe(&file_report, &out_path));
                    file_report
                }
                Err(e) => {
                    warn!("Error converting {}: {}", file.display(), e);
                    let size = FileManager::size_or_zero(file).await;
                    let file_report = FileReport::new(
                        file,
                        FileOutcome::Error {
                            size,
                            message: e.to_string(),
                        },
                    );
                    console.line(&Self::describe(&file_report, &out_path));
                    file_report
                }
            };

            let output = matches!(file_report.outcome, FileOutcome::Optimized { .. }).then(|| out_path.clone());
            console.event(JsonMessage::file_complete(&file_report, output));
            console.advance(&file.file_name().unwrap_or_default().to_string_lossy());
            report.push(file_report);
        }

        console.finish_progress();
        console.lines(report.totals().summary_lines());
        console.event(JsonMessage::complete(&report));

        Ok(report)
    }

    /// Convert one PNG; `before` is the PNG size, `after` the WebP size
    pub async fn convert(&self, input: &Path, output: &Path) -> Result<FileOutcome, OptimizeError> {
        let bytes = tokio::fs::read(input).await?;
        let before = bytes.len() as u64;
        let output: PathBuf = output.to_path_buf();
        let mode = WebpMode::Lossy(self.config.convert_webp_quality);

        let after = tokio::task::spawn_blocking(move || -> Result<u64, OptimizeError> {
            let img = image::load_from_memory(&bytes)?;
            let encoded = encode_webp(&img, mode)?;
            FileManager::write_atomically(&output, &encoded)?;
            debug!("Wrote {} ({} bytes)", output.display(), encoded.len());
            Ok(encoded.len() as u64)
        })
        .await
        .map_err(|e| OptimizeError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))??;

        Ok(FileOutcome::Optimized { before, after })
    }

    fn describe(report: &FileReport, out_path: &Path) -> String {
        let name = report.path.file_name().unwrap_or_default().to_string_lossy();
        match &report.outcome {
            FileOutcome::Optimized { before, after } => format!(
                "Converted: {} - {} -> {} ({:.1}% saved) -> {}",
                name,
                FileManager::format_size(*before),
                FileManager::format_size(*after),
                report.reduction_percent(),
                out_path.display()
            ),
            FileOutcome::Error { message, .. } => {
                format!("Error converting {}: {}", report.path.display(), message)
            }
            FileOutcome::Skipped { reason, .. } => {
                format!("Skipped: {} ({})", report.path.display(), reason)
            }
        }
    }
}
