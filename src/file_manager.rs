//! # File Management Module
//!
//! Questo modulo gestisce tutte le operazioni sui file e la discovery degli asset.
//!
//! ## Responsabilità:
//! - Discovery ricorsiva dei file raster nella root degli asset
//! - Filtro per estensione con allow-list e deny-list
//! - Scrittura atomica tramite file temporaneo fratello + rename
//! - Utilità per calcoli dimensioni e percentuali
//! - Formattazione human-readable delle dimensioni
//!
//! ## Formati considerati:
//! - **Ammessi**: JPG, JPEG, PNG, WebP, GIF
//! - **Sempre esclusi**: AVIF, SVG, ICO (anche se matchassero l'allow-list)
//!
//! ## Sicurezza operazioni:
//! - L'originale non viene toccato finché il file temporaneo non è completo
//! - Il temporaneo viene rimosso automaticamente se la scrittura fallisce
//! - I permessi dell'originale sono copiati sul file che lo sostituisce
//!
//! ## Esempio:
//! ```ignore
//! let files = FileManager::find_raster_files(Path::new("assets"))?;
//! for file in files {
//!     println!("{}", FileManager::format_size(FileManager::get_file_size(&file).await?));
//! }
//! ```

use crate::error::OptimizeError;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;

/// Extensions eligible for re-encoding
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

/// Extensions never touched, checked before the allow-list
pub const DENIED_EXTENSIONS: &[&str] = &["avif", "svg", "ico"];

/// Manages file operations and discovery
pub struct FileManager;

impl FileManager {
    /// Get the size of a file in bytes
    pub async fn get_file_size(path: &Path) -> Result<u64, OptimizeError> {
        Ok(fs::metadata(path).await?.len())
    }

    /// Size for error reporting; a file that cannot be stat'ed counts as 0
    pub async fn size_or_zero(path: &Path) -> u64 {
        match Self::get_file_size(path).await {
            Ok(size) => size,
            Err(e) => {
                debug!("Cannot stat {}, reporting size 0: {}", path.display(), e);
                0
            }
        }
    }

    /// Find all eligible raster files under `root`, sorted by path
    pub fn find_raster_files(root: &Path) -> Result<Vec<PathBuf>, OptimizeError> {
        Self::walk_files(root, Self::is_eligible)
    }

    /// Find PNG files strictly larger than `min_size` bytes
    pub fn find_large_pngs(root: &Path, min_size: u64) -> Result<Vec<PathBuf>, OptimizeError> {
        let pngs = Self::walk_files(root, |path| Self::lowercase_extension(path).as_deref() == Some("png"))?;

        Ok(pngs
            .into_iter()
            .filter(|path| match std::fs::metadata(path) {
                Ok(metadata) => metadata.len() > min_size,
                Err(e) => {
                    debug!("Skipping unreadable file {}: {}", path.display(), e);
                    false
                }
            })
            .collect())
    }

    fn walk_files(root: &Path, keep: impl Fn(&Path) -> bool) -> Result<Vec<PathBuf>, OptimizeError> {
        if !root.is_dir() {
            return Err(OptimizeError::Validation(format!(
                "Assets folder not found: {}",
                root.display()
            )));
        }

        let mut files = Vec::new();

        for entry in WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| match e {
                Ok(entry) => Some(entry),
                Err(err) => {
                    debug!("Skipping unreadable entry: {}", err);
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            if keep(path) {
                files.push(path.to_path_buf());
            }
        }

        Ok(files)
    }

    /// Check if a file is eligible: allowed extension and not denied
    pub fn is_eligible(path: &Path) -> bool {
        match Self::lowercase_extension(path) {
            Some(ext) => {
                !DENIED_EXTENSIONS.contains(&ext.as_str()) && ALLOWED_EXTENSIONS.contains(&ext.as_str())
            }
            None => false,
        }
    }

    fn lowercase_extension(path: &Path) -> Option<String> {
        path.extension().map(|ext| ext.to_string_lossy().to_lowercase())
    }

    /// Write `bytes` to `target` through a temporary sibling that is renamed
    /// over the target only once fully written and synced.
    ///
    /// When `target` already exists its permissions carry over to the new file.
    pub fn write_atomically(target: &Path, bytes: &[u8]) -> Result<(), OptimizeError> {
        let parent = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let file_name = target
            .file_name()
            .ok_or_else(|| OptimizeError::Validation(format!("Invalid file name: {}", target.display())))?
            .to_string_lossy();

        let mut tmp = tempfile::Builder::new()
            .prefix(&format!(".{}.", file_name))
            .suffix(".tmp")
            .tempfile_in(parent)?;

        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;

        if let Ok(metadata) = std::fs::metadata(target) {
            std::fs::set_permissions(tmp.path(), metadata.permissions())?;
        }

        tmp.persist(target).map_err(|e| OptimizeError::Io(e.error))?;
        debug!("Atomically replaced {}", target.display());
        Ok(())
    }

    /// Get human-readable file size (base 1024, one decimal)
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        format!("{:.1}{}", size, UNITS[unit_index])
    }

    /// Calculate percentage reduction
    pub fn calculate_reduction(original_size: u64, new_size: u64) -> f64 {
        if original_size == 0 {
            0.0
        } else {
            ((original_size as f64 - new_size as f64) / original_size as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str, len: usize) -> PathBuf {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, vec![0u8; len]).unwrap();
        path
    }

    #[test]
    fn test_eligibility() {
        assert!(FileManager::is_eligible(Path::new("a/photo.JPG")));
        assert!(FileManager::is_eligible(Path::new("a/photo.jpeg")));
        assert!(FileManager::is_eligible(Path::new("banner.webp")));
        assert!(FileManager::is_eligible(Path::new("spinner.gif")));
        assert!(!FileManager::is_eligible(Path::new("logo.svg")));
        assert!(!FileManager::is_eligible(Path::new("favicon.ico")));
        assert!(!FileManager::is_eligible(Path::new("hero.avif")));
        assert!(!FileManager::is_eligible(Path::new("README")));
        assert!(!FileManager::is_eligible(Path::new("styles.css")));
    }

    #[test]
    fn test_find_raster_files_recursive_and_sorted() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(root, "z.png", 1);
        touch(root, "img/b.jpg", 1);
        touch(root, "img/a.gif", 1);
        touch(root, "img/deep/c.webp", 1);
        touch(root, "logo.svg", 1);
        touch(root, "favicon.ico", 1);
        touch(root, "notes.txt", 1);

        let files = FileManager::find_raster_files(root).unwrap();
        let relative: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();

        assert_eq!(relative, vec!["img/a.gif", "img/b.jpg", "img/deep/c.webp", "z.png"]);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = FileManager::find_raster_files(&temp_dir.path().join("assets"));
        assert!(matches!(result, Err(OptimizeError::Validation(_))));
    }

    #[test]
    fn test_find_large_pngs_threshold_is_strict() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(root, "small.png", 100);
        touch(root, "exact.png", 200);
        touch(root, "big.PNG", 201);
        touch(root, "big.jpg", 5000);

        let files = FileManager::find_large_pngs(root, 200).unwrap();
        assert_eq!(files, vec![root.join("big.PNG")]);
    }

    #[test]
    fn test_write_atomically_replaces_content() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("photo.jpg");
        std::fs::write(&target, b"old bytes").unwrap();

        FileManager::write_atomically(&target, b"new").unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"new");
        let leftovers: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_write_atomically_creates_new_file() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("photo.webp");
        FileManager::write_atomically(&target, b"webp").unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"webp");
    }

    #[test]
    fn test_failed_rename_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        // A non-empty directory cannot be replaced by a file
        let target = temp_dir.path().join("photo.jpg");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("keep"), b"x").unwrap();

        let result = FileManager::write_atomically(&target, b"new");

        assert!(matches!(result, Err(OptimizeError::Io(_))));
        assert_eq!(std::fs::read(target.join("keep")).unwrap(), b"x");
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(FileManager::format_size(0), "0.0B");
        assert_eq!(FileManager::format_size(512), "512.0B");
        assert_eq!(FileManager::format_size(1536), "1.5KB");
        assert_eq!(FileManager::format_size(5 * 1024 * 1024), "5.0MB");
        assert_eq!(FileManager::format_size(3 * 1024 * 1024 * 1024), "3.0GB");
        assert_eq!(FileManager::format_size(2048 * 1024 * 1024 * 1024 * 1024), "2048.0TB");
    }

    #[test]
    fn test_calculate_reduction() {
        assert_eq!(FileManager::calculate_reduction(0, 0), 0.0);
        assert_eq!(FileManager::calculate_reduction(200, 50), 75.0);
        assert_eq!(FileManager::calculate_reduction(100, 100), 0.0);
    }

    #[tokio::test]
    async fn test_get_file_size() {
        let temp_dir = TempDir::new().unwrap();
        let path = touch(temp_dir.path(), "a.png", 42);
        assert_eq!(FileManager::get_file_size(&path).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_size_or_zero() {
        let temp_dir = TempDir::new().unwrap();
        let path = touch(temp_dir.path(), "a.png", 42);
        assert_eq!(FileManager::size_or_zero(&path).await, 42);
        assert_eq!(FileManager::size_or_zero(&temp_dir.path().join("gone.png")).await, 0);
    }
}
