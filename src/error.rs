//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom della libreria.
//!
//! ## Responsabilità:
//! - Definisce `OptimizeError` enum per categorizzare gli errori possibili
//! - Integra con `thiserror` per automatic error conversion
//! - Separa errori fatali (setup, backup) da errori per singolo file
//!
//! ## Categorie di errori:
//! - `Io`: Errori di I/O (file non trovati, permessi, rename fallito)
//! - `Image`: Errori di decode/encode (file corrotti, formato incoerente)
//! - `Encode`: Encoder esterno (libwebp) che rifiuta l'immagine
//! - `UnsupportedFormat`: Formato non ricodificabile, il file risulta saltato
//! - `Backup`: Impossibile creare o popolare il backup set (fatale)
//! - `Validation`: Parametri di configurazione fuori range
//! - `Config`: File di configurazione illeggibile
//!
//! ## Esempio:
//! ```ignore
//! if !config.assets_dir.is_dir() {
//!     return Err(OptimizeError::Validation(format!(
//!         "Assets folder not found: {}",
//!         config.assets_dir.display()
//!     )));
//! }
//! ```

/// Custom error types for asset optimization
#[derive(thiserror::Error, Debug)]
pub enum OptimizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Encoding error: {0}")]
    Encode(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Backup error: {0}")]
    Backup(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

impl OptimizeError {
    /// Errors that abort the whole run rather than a single file
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Backup(_) | Self::Validation(_) | Self::Config(_))
    }
}
