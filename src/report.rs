//! # Run Report Module
//!
//! Questo modulo raccoglie gli esiti per file e le statistiche aggregate di un run.
//!
//! ## Responsabilità:
//! - `FileOutcome`: esito di un singolo file (ottimizzato, saltato, errore)
//! - `FileReport`: path + esito, nell'ordine di elaborazione
//! - `RunReport`: sequenza ordinata degli esiti e totali aggregati
//! - Formattazione delle righe di console e del blocco di riepilogo
//!
//! ## Regola dei totali:
//! I totali before/after/saved sommano solo i file ottimizzati.
//! Saltati ed errori compaiono nei contatori ma non nei byte.

use crate::file_manager::FileManager;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Result of attempting one file
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    /// Re-encoded; `after == before` when the original was kept
    Optimized { before: u64, after: u64 },
    /// Format not handled, file left untouched
    Skipped { size: u64, reason: String },
    /// Failure during read/decode/encode/replace, file left untouched
    Error { size: u64, message: String },
}

/// Status tag used in JSON output
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Optimized,
    Skipped,
    Error,
}

impl FileOutcome {
    pub fn status(&self) -> FileStatus {
        match self {
            Self::Optimized { .. } => FileStatus::Optimized,
            Self::Skipped { .. } => FileStatus::Skipped,
            Self::Error { .. } => FileStatus::Error,
        }
    }

    /// Size before and after; untouched files report the same size twice
    pub fn sizes(&self) -> (u64, u64) {
        match self {
            Self::Optimized { before, after } => (*before, *after),
            Self::Skipped { size, .. } | Self::Error { size, .. } => (*size, *size),
        }
    }
}

/// Outcome for a single path
#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: FileOutcome,
}

impl FileReport {
    pub fn new(path: impl Into<PathBuf>, outcome: FileOutcome) -> Self {
        Self {
            path: path.into(),
            outcome,
        }
    }

    pub fn reduction_percent(&self) -> f64 {
        let (before, after) = self.outcome.sizes();
        FileManager::calculate_reduction(before, after)
    }

    /// Console line for this outcome
    pub fn describe(&self) -> String {
        match &self.outcome {
            FileOutcome::Optimized { before, after } => format!(
                "Optimized: {} - {} -> {} ({:.1}% saved)",
                self.path.display(),
                FileManager::format_size(*before),
                FileManager::format_size(*after),
                self.reduction_percent()
            ),
            FileOutcome::Skipped { reason, .. } => {
                format!("Skipped: {} ({})", self.path.display(), reason)
            }
            FileOutcome::Error { message, .. } => {
                format!("Error optimizing {}: {}", self.path.display(), message)
            }
        }
    }
}

/// Aggregate byte totals over optimized files
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub before: u64,
    pub after: u64,
}

impl Totals {
    pub fn saved(&self) -> u64 {
        self.before.saturating_sub(self.after)
    }

    pub fn add(&mut self, before: u64, after: u64) {
        self.before += before;
        self.after += after;
    }

    /// Trailing summary block, blank line first
    pub fn summary_lines(&self) -> Vec<String> {
        vec![
            String::new(),
            "Summary:".to_string(),
            format!("Total before: {}", FileManager::format_size(self.before)),
            format!("Total after:  {}", FileManager::format_size(self.after)),
            format!("Total saved:  {}", FileManager::format_size(self.saved())),
        ]
    }
}

/// Ordered per-file outcomes of one run
#[derive(Debug, Default, Clone)]
pub struct RunReport {
    pub files: Vec<FileReport>,
    pub backup_dir: Option<PathBuf>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, report: FileReport) {
        self.files.push(report);
    }

    pub fn get(&self, path: &Path) -> Option<&FileReport> {
        self.files.iter().find(|r| r.path == path)
    }

    pub fn files_optimized(&self) -> usize {
        self.count(FileStatus::Optimized)
    }

    pub fn files_skipped(&self) -> usize {
        self.count(FileStatus::Skipped)
    }

    pub fn errors(&self) -> usize {
        self.count(FileStatus::Error)
    }

    fn count(&self, status: FileStatus) -> usize {
        self.files.iter().filter(|r| r.outcome.status() == status).count()
    }

    pub fn totals(&self) -> Totals {
        let mut totals = Totals::default();
        for report in &self.files {
            if let FileOutcome::Optimized { before, after } = report.outcome {
                totals.add(before, after);
            }
        }
        totals
    }

    pub fn overall_reduction_percent(&self) -> f64 {
        let totals = self.totals();
        FileManager::calculate_reduction(totals.before, totals.after)
    }
}
