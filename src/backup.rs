//! # Backup Set Module
//!
//! Questo modulo crea il backup set timestampato prima di qualsiasi modifica.
//!
//! ## Responsabilità:
//! - Crea una directory nuova `images_backup_<UTC timestamp>` sotto la root dei backup
//! - Copia ogni file candidato preservando il path relativo alla root degli asset
//! - Scrive `manifest.json` con dimensione e SHA-256 di ogni copia
//!
//! ## Garanzie:
//! - Il backup set è creato una sola volta per run e mai modificato dopo
//! - Il job non rilegge mai il backup: serve solo per rollback manuale
//! - Qualsiasi errore di creazione o copia è fatale (`OptimizeError::Backup`)
//!
//! ## Struttura prodotta:
//! ```text
//! backups/
//! └── images_backup_20240501T093012Z/
//!     ├── manifest.json
//!     ├── hero.jpg
//!     └── img/
//!         └── team.png
//! ```

use crate::{error::OptimizeError, optimizer::path_resolver::PathResolver};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

pub const BACKUP_PREFIX: &str = "images_backup_";
pub const MANIFEST_FILE: &str = "manifest.json";

const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// One backed-up file as recorded in the manifest
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackupEntry {
    /// Path relative to the asset root, `/`-separated
    pub path: String,
    pub size: u64,
    pub sha256: String,
}

/// Manifest written next to the copies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupManifest {
    pub created_at: String,
    pub asset_root: PathBuf,
    pub files: Vec<BackupEntry>,
}

/// A created backup set
#[derive(Debug)]
pub struct BackupSet {
    pub dir: PathBuf,
    pub manifest: BackupManifest,
}

impl BackupSet {
    /// Directory name for a backup taken at `timestamp`
    pub fn dir_name(timestamp: DateTime<Utc>) -> String {
        format!("{}{}", BACKUP_PREFIX, timestamp.format("%Y%m%dT%H%M%SZ"))
    }

    /// Copy every file in `files` under a fresh backup directory
    pub async fn create(
        asset_root: &Path,
        backups_root: &Path,
        files: &[PathBuf],
        timestamp: DateTime<Utc>,
    ) -> Result<Self, OptimizeError> {
        let dir = Self::create_fresh_dir(backups_root, &Self::dir_name(timestamp)).await?;
        let mut entries = Vec::with_capacity(files.len());

        for file in files {
            let target = PathResolver::backup_path(file, asset_root, &dir)?;
            PathResolver::ensure_parent_dirs(&target)
                .await
                .map_err(|e| OptimizeError::Backup(format!("{}: {}", target.display(), e)))?;

            let size = fs::copy(file, &target).await.map_err(|e| {
                OptimizeError::Backup(format!("copying {} to {}: {}", file.display(), target.display(), e))
            })?;

            let sha256 = Self::hash_file(&target)
                .await
                .map_err(|e| OptimizeError::Backup(format!("{}: {}", target.display(), e)))?;

            let relative = PathResolver::relative_to_root(file, asset_root)?;
            entries.push(BackupEntry {
                path: relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/"),
                size,
                sha256,
            });
            debug!("Backed up {} -> {}", file.display(), target.display());
        }

        let manifest = BackupManifest {
            created_at: timestamp.to_rfc3339(),
            asset_root: asset_root.to_path_buf(),
            files: entries,
        };

        let content = serde_json::to_string_pretty(&manifest)?;
        fs::write(dir.join(MANIFEST_FILE), content)
            .await
            .map_err(|e| OptimizeError::Backup(format!("writing manifest: {}", e)))?;

        info!("Backed up {} files to {}", manifest.files.len(), dir.display());
        Ok(Self { dir, manifest })
    }

    /// SHA-256 of a file, read in fixed-size chunks
    async fn hash_file(path: &Path) -> std::io::Result<String> {
        let mut file = fs::File::open(path).await?;
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; HASH_CHUNK_SIZE];

        loop {
            let read = file.read(&mut buf).await?;
            if read == 0 {
                break;
            }
            hasher.update(&buf[..read]);
        }

        Ok(hex::encode(hasher.finalize()))
    }

    /// Create `backups_root/name`, suffixing `_1`, `_2`, ... if a set with
    /// the same timestamp already exists
    async fn create_fresh_dir(backups_root: &Path, name: &str) -> Result<PathBuf, OptimizeError> {
        fs::create_dir_all(backups_root).await.map_err(|e| {
            OptimizeError::Backup(format!("cannot create {}: {}", backups_root.display(), e))
        })?;

        let mut attempt = 0u32;
        loop {
            let candidate = if attempt == 0 {
                backups_root.join(name)
            } else {
                backups_root.join(format!("{}_{}", name, attempt))
            };

            match fs::create_dir(&candidate).await {
                Ok(()) => return Ok(candidate),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => {
                    return Err(OptimizeError::Backup(format!(
                        "cannot create {}: {}",
                        candidate.display(),
                        e
                    )))
                }
            }
        }
    }
}
