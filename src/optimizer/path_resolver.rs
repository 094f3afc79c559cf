//! # Path Resolution Module
//!
//! Centralizza la logica di calcolo dei path derivati da un asset:
//! copia nel backup set e sibling WebP.

use crate::error::OptimizeError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Utility per calcolare i path derivati in modo centralizzato
pub struct PathResolver;

impl PathResolver {
    /// Path relativo di un asset rispetto alla root degli asset
    pub fn relative_to_root<'a>(input_path: &'a Path, asset_root: &Path) -> Result<&'a Path, OptimizeError> {
        input_path.strip_prefix(asset_root).map_err(|_| {
            OptimizeError::Validation(format!(
                "{} is not under asset root {}",
                input_path.display(),
                asset_root.display()
            ))
        })
    }

    /// Destinazione della copia di backup: stesso path relativo sotto il backup set
    pub fn backup_path(input_path: &Path, asset_root: &Path, backup_dir: &Path) -> Result<PathBuf, OptimizeError> {
        let relative = Self::relative_to_root(input_path, asset_root)?;
        let result = backup_dir.join(relative);
        debug!("Resolved backup path: {} -> {}", input_path.display(), result.display());
        Ok(result)
    }

    /// Sibling `.webp` accanto al file sorgente
    pub fn webp_sibling(input_path: &Path) -> PathBuf {
        input_path.with_extension("webp")
    }

    /// Crea le directory parent se necessario
    pub async fn ensure_parent_dirs(path: &Path) -> Result<(), OptimizeError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}
