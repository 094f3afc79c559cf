//! # Optimizer Module
//!
//! Separa le responsabilità in sottomoduli:
//! - `asset_optimizer`: Orchestratore del job di backup e ricodifica
//! - `path_resolver`: Logica di calcolo path centralizzata

pub mod asset_optimizer;
pub mod path_resolver;

pub use asset_optimizer::AssetOptimizer;
pub use path_resolver::PathResolver;
