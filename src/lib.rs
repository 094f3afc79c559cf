//! # Site Asset Optimizer Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dei job sugli asset del sito
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per i test
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore custom
//! - `file_manager`: Discovery degli asset, scrittura atomica, formattazione dimensioni
//! - `backup`: Backup set timestampato con manifest
//! - `image_processor`: Ricodifica JPEG/PNG/WebP/GIF nel formato originale
//! - `optimizer`: Orchestratore del job di backup e ricodifica
//! - `webp_converter`: Sibling WebP per PNG troppo grandi
//! - `favicon`: Varianti PNG delle favicon
//! - `report`: Esiti per file e totali
//! - `progress` / `json_output`: Output su console, testo o JSON
//!
//! ## Utilizzo:
//! ```ignore
//! use site_asset_optimizer::{AssetOptimizer, Config, Console, OutputMode};
//!
//! let optimizer = AssetOptimizer::new(Config::default())?;
//! let report = optimizer.run(&mut Console::new(OutputMode::Text)).await?;
//! ```

pub mod backup;
pub mod config;
pub mod error;
pub mod favicon;
pub mod file_manager;
pub mod image_processor;
pub mod json_output;
pub mod optimizer;
pub mod progress;
pub mod report;
pub mod webp_converter;

pub use backup::BackupSet;
pub use config::Config;
pub use error::OptimizeError;
pub use favicon::FaviconGenerator;
pub use optimizer::AssetOptimizer;
pub use progress::{Console, OutputMode};
pub use report::{FileOutcome, FileReport, RunReport};
pub use webp_converter::WebpConverter;
