//! # Asset Optimizer Orchestrator
//!
//! Orchestratore del job principale: discovery → backup → ricodifica → report.
//!
//! ## Flusso di esecuzione:
//! 1. **Validazione**: config valida e root degli asset esistente
//! 2. **Discovery**: file raster ammessi, ordinati per path
//! 3. **Backup**: backup set timestampato (saltato in dry run), fatale se fallisce
//! 4. **Processing**: un file alla volta, errori per file non bloccano il run
//! 5. **Reporting**: una riga per file e blocco di riepilogo finale

use crate::{
    backup::BackupSet,
    config::Config,
    error::OptimizeError,
    file_manager::FileManager,
    image_processor::ImageProcessor,
    json_output::JsonMessage,
    progress::Console,
    report::{FileOutcome, FileReport, RunReport},
};
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::Path;
use tracing::{debug, info, warn};

/// Main asset optimizer orchestrator
pub struct AssetOptimizer {
    config: Config,
    processor: ImageProcessor,
}

impl AssetOptimizer {
    /// Create a new optimizer, failing when the configuration is invalid or
    /// the asset root is missing
    pub fn new(config: Config) -> Result<Self, OptimizeError> {
        config.validate()?;

        if !config.assets_dir.is_dir() {
            return Err(OptimizeError::Validation(format!(
                "Assets folder not found: {}",
                config.assets_dir.display()
            )));
        }

        Ok(Self {
            processor: ImageProcessor::new(config.clone()),
            config,
        })
    }

    /// Run the backup-and-optimize job over the asset root
    pub async fn run(&self, console: &mut Console) -> Result<RunReport> {
        let assets_dir = &self.config.assets_dir;
        info!("Starting asset optimization in: {}", assets_dir.display());
        info!(
            "JPEG quality: {}, GIF speed: {}, size threshold: {}",
            self.config.jpeg_quality, self.config.gif_speed, self.config.size_threshold
        );

        let files = FileManager::find_raster_files(assets_dir)?;
        console.event(JsonMessage::start("optimize", assets_dir.clone(), files.len()));

        let mut report = RunReport::new();

        if files.is_empty() {
            info!("No raster images found to optimize");
            console.line("No raster images found to optimize.");
            console.event(JsonMessage::Notice {
                message: "No raster images found to optimize.".to_string(),
            });
            return Ok(report);
        }

        console.line(&format!("Found {} images to consider for optimization.", files.len()));

        if self.config.dry_run {
            info!("Dry run mode: no backup, no files will be modified");
            console.line("Dry run: no backup created, no files will be modified.");
        } else {
            let backup = BackupSet::create(assets_dir, &self.config.backups_dir, &files, Utc::now())
                .await
                .context("Failed to back up originals, nothing was modified")?;

            console.line(&format!("Backed up originals to: {}", backup.dir.display()));
            console.event(JsonMessage::Backup {
                dir: backup.dir.clone(),
                files: backup.manifest.files.len(),
            });
            report.backup_dir = Some(backup.dir);
        }

        console.start_progress(files.len() as u64);

        for file in &files {
            let file_report = self.process_file(file).await;

            console.line(&file_report.describe());
            console.event(JsonMessage::file_complete(&file_report, None));
            console.advance(&file.file_name().unwrap_or_default().to_string_lossy());

            report.push(file_report);
        }

        console.finish_progress();
        console.lines(report.totals().summary_lines());
        console.event(JsonMessage::complete(&report));

        info!(
            "=== Optimization Complete === optimized: {}, skipped: {}, errors: {}, saved: {} ({:.2}%)",
            report.files_optimized(),
            report.files_skipped(),
            report.errors(),
            FileManager::format_size(report.totals().saved()),
            report.overall_reduction_percent()
        );

        Ok(report)
    }

    /// Optimize one file, folding any failure into an error outcome
    async fn process_file(&self, path: &Path) -> FileReport {
        debug!("Processing: {}", path.display());

        match self.processor.optimize(path).await {
            Ok(outcome) => FileReport::new(path, outcome),
            Err(e) => {
                warn!("Error optimizing {}: {}", path.display(), e);
                let size = FileManager::size_or_zero(path).await;
                FileReport::new(
                    path,
                    FileOutcome::Error {
                        size,
                        message: e.to_string(),
                    },
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::OutputMode;
    use crate::report::FileStatus;
    use image::codecs::jpeg::JpegEncoder;
    use image::{DynamicImage, Rgb, RgbImage};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn jpeg_bytes() -> Vec<u8> {
        let img = RgbImage::from_fn(320, 240, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x * y) % 256) as u8])
        });
        let mut buf = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut buf, 100);
        DynamicImage::ImageRgb8(img).write_with_encoder(encoder).unwrap();
        buf
    }

    struct Site {
        _temp: TempDir,
        assets: PathBuf,
        backups: PathBuf,
    }

    impl Site {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let assets = temp.path().join("assets");
            let backups = temp.path().join("backups");
            std::fs::create_dir_all(&assets).unwrap();
            Self { _temp: temp, assets, backups }
        }

        fn write(&self, relative: &str, bytes: &[u8]) -> PathBuf {
            let path = self.assets.join(relative);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, bytes).unwrap();
            path
        }

        fn config(&self) -> Config {
            Config {
                assets_dir: self.assets.clone(),
                backups_dir: self.backups.clone(),
                ..Default::default()
            }
        }
    }

    #[tokio::test]
    async fn test_end_to_end_backup_optimize_report() {
        let site = Site::new();
        let photo = jpeg_bytes();
        let corrupt = b"\x89PNG but then nothing sensible".to_vec();
        let photo_path = site.write("img/photo.jpg", &photo);
        let corrupt_path = site.write("broken.png", &corrupt);
        let svg_path = site.write("logo.svg", b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>");

        let optimizer = AssetOptimizer::new(site.config()).unwrap();
        let report = optimizer.run(&mut Console::silent()).await.unwrap();

        // Backup holds byte-identical originals of every eligible file, not the svg
        let backup_dir = report.backup_dir.clone().unwrap();
        assert!(backup_dir.starts_with(&site.backups));
        assert!(backup_dir
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("images_backup_"));
        assert_eq!(std::fs::read(backup_dir.join("img/photo.jpg")).unwrap(), photo);
        assert_eq!(std::fs::read(backup_dir.join("broken.png")).unwrap(), corrupt);
        assert!(!backup_dir.join("logo.svg").exists());

        // Only the two eligible files are reported
        assert_eq!(report.files.len(), 2);
        assert!(report.get(&svg_path).is_none());
        assert!(report.files.iter().all(|r| !r.describe().contains("logo.svg")));

        match &report.get(&photo_path).unwrap().outcome {
            FileOutcome::Optimized { before, after } => {
                assert_eq!(*before, photo.len() as u64);
                assert!(after < before);
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        match &report.get(&corrupt_path).unwrap().outcome {
            FileOutcome::Error { size, .. } => assert_eq!(*size, corrupt.len() as u64),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(std::fs::read(&corrupt_path).unwrap(), corrupt);

        let totals = report.totals();
        let (photo_before, photo_after) = report.get(&photo_path).unwrap().outcome.sizes();
        assert_eq!(totals.before, photo_before);
        assert_eq!(totals.after, photo_after);
        assert_eq!(report.errors(), 1);
    }

    #[tokio::test]
    async fn test_failed_replace_keeps_original_and_run_continues() {
        let site = Site::new();
        let photo = jpeg_bytes();
        // Fits NAME_MAX, but its temporary sibling's name does not
        let long_name = format!("{}.jpg", "a".repeat(246));
        let blocked = site.write(&long_name, &photo);
        let next = site.write("b.jpg", &photo);

        let report = AssetOptimizer::new(site.config())
            .unwrap()
            .run(&mut Console::silent())
            .await
            .unwrap();

        match &report.get(&blocked).unwrap().outcome {
            FileOutcome::Error { size, .. } => assert_eq!(*size, photo.len() as u64),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(std::fs::read(&blocked).unwrap(), photo);

        let leftovers: Vec<_> = std::fs::read_dir(&site.assets)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());

        assert!(matches!(
            report.get(&next).unwrap().outcome,
            FileOutcome::Optimized { before, after } if after < before
        ));
        assert!(std::fs::metadata(&next).unwrap().len() < photo.len() as u64);
        assert_eq!(report.errors(), 1);
        assert_eq!(report.files_optimized(), 1);
    }

    #[tokio::test]
    async fn test_json_mode_emits_event_sequence() {
        let site = Site::new();
        site.write("img/photo.jpg", &jpeg_bytes());
        site.write("broken.png", b"\x89PNG but then nothing sensible");

        let mut console = Console::capturing(OutputMode::Json);
        let report = AssetOptimizer::new(site.config())
            .unwrap()
            .run(&mut console)
            .await
            .unwrap();

        let events: Vec<JsonMessage> = console
            .take_output()
            .iter()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(events.len(), 5);

        assert!(matches!(&events[0], JsonMessage::Start { total_files: 2, .. }));
        match &events[1] {
            JsonMessage::Backup { dir, files } => {
                assert_eq!(Some(dir), report.backup_dir.as_ref());
                assert_eq!(*files, 2);
            }
            other => panic!("unexpected event {:?}", other),
        }

        let statuses: Vec<_> = events[2..4]
            .iter()
            .map(|event| match event {
                JsonMessage::FileComplete { status, .. } => *status,
                other => panic!("unexpected event {:?}", other),
            })
            .collect();
        assert_eq!(statuses, vec![FileStatus::Error, FileStatus::Optimized]);

        assert!(matches!(
            &events[4],
            JsonMessage::Complete { files_optimized: 1, errors: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_text_mode_report_lines() {
        let site = Site::new();
        site.write("photo.jpg", &jpeg_bytes());
        site.write("odd.png", b"BM\x3a\x00\x00\x00 not a real bitmap");

        let mut console = Console::capturing(OutputMode::Text);
        AssetOptimizer::new(site.config())
            .unwrap()
            .run(&mut console)
            .await
            .unwrap();

        let output = console.take_output();
        assert_eq!(output[0], "Found 2 images to consider for optimization.");
        assert!(output[1].starts_with("Backed up originals to: "));
        assert!(output[2].starts_with("Skipped: ") && output[2].contains("odd.png"));
        assert!(output[3].starts_with("Optimized: ") && output[3].contains("photo.jpg"));
        assert_eq!(output[4], "");
        assert_eq!(output[5], "Summary:");
        assert!(output[6].starts_with("Total before: "));
        assert!(output.iter().all(|line| !line.starts_with('{')));
    }

    #[tokio::test]
    async fn test_missing_asset_root_is_fatal() {
        let site = Site::new();
        let config = Config {
            assets_dir: site.assets.join("nope"),
            ..site.config()
        };
        assert!(matches!(AssetOptimizer::new(config), Err(OptimizeError::Validation(_))));
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let site = Site::new();
        let config = Config {
            jpeg_quality: 0,
            ..site.config()
        };
        assert!(AssetOptimizer::new(config).is_err());
    }

    #[tokio::test]
    async fn test_empty_asset_root_creates_no_backup() {
        let site = Site::new();
        site.write("only.svg", b"<svg/>");

        let report = AssetOptimizer::new(site.config())
            .unwrap()
            .run(&mut Console::silent())
            .await
            .unwrap();

        assert!(report.files.is_empty());
        assert!(report.backup_dir.is_none());
        assert!(!site.backups.exists());
    }

    #[tokio::test]
    async fn test_dry_run_touches_nothing() {
        let site = Site::new();
        let photo = jpeg_bytes();
        let path = site.write("photo.jpeg", &photo);

        let config = Config {
            dry_run: true,
            ..site.config()
        };
        let report = AssetOptimizer::new(config)
            .unwrap()
            .run(&mut Console::silent())
            .await
            .unwrap();

        assert!(report.backup_dir.is_none());
        assert!(!site.backups.exists());
        assert_eq!(std::fs::read(&path).unwrap(), photo);
        assert_eq!(report.files_optimized(), 1);
    }

    #[tokio::test]
    async fn test_backup_failure_aborts_before_any_change() {
        let site = Site::new();
        let photo = jpeg_bytes();
        let path = site.write("photo.jpg", &photo);
        // A regular file where the backups root should be
        std::fs::write(&site.backups, b"blocker").unwrap();

        let result = AssetOptimizer::new(site.config())
            .unwrap()
            .run(&mut Console::silent())
            .await;

        assert!(result.is_err());
        assert_eq!(std::fs::read(&path).unwrap(), photo);
    }
}
