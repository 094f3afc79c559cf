//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON, una riga per evento,
//! per chi invoca i job da script o CI.
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio job con numero di file trovati
//! - `backup`: Backup set creato
//! - `file_complete`: Esito di un singolo file
//! - `written`: File generato (favicon)
//! - `notice`: Messaggio informativo (es. nessun file trovato)
//! - `complete`: Fine job con totali

use crate::report::{FileReport, FileStatus, RunReport};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum JsonMessage {
    /// Inizio del job
    #[serde(rename = "start")]
    Start {
        job: String,
        asset_root: PathBuf,
        total_files: usize,
    },

    /// Backup set creato
    #[serde(rename = "backup")]
    Backup { dir: PathBuf, files: usize },

    /// Fine elaborazione di un file specifico
    #[serde(rename = "file_complete")]
    FileComplete {
        path: PathBuf,
        status: FileStatus,
        original_size: u64,
        optimized_size: u64,
        reduction_percent: f64,
        output: Option<PathBuf>,
        error: Option<String>,
    },

    /// File scritto da un job generativo
    #[serde(rename = "written")]
    Written { path: PathBuf },

    /// Messaggio informativo
    #[serde(rename = "notice")]
    Notice { message: String },

    /// Job completato
    #[serde(rename = "complete")]
    Complete {
        files_optimized: usize,
        files_skipped: usize,
        errors: usize,
        total_before: u64,
        total_after: u64,
        total_saved: u64,
    },
}

impl JsonMessage {
    /// Serializza il messaggio su una sola riga
    pub fn to_line(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }

    pub fn start(job: &str, asset_root: PathBuf, total_files: usize) -> Self {
        Self::Start {
            job: job.to_string(),
            asset_root,
            total_files,
        }
    }

    /// Crea un messaggio di completamento file da un `FileReport`
    pub fn file_complete(report: &FileReport, output: Option<PathBuf>) -> Self {
        let (original_size, optimized_size) = report.outcome.sizes();
        let error = match &report.outcome {
            crate::report::FileOutcome::Error { message, .. } => Some(message.clone()),
            crate::report::FileOutcome::Skipped { reason, .. } => Some(reason.clone()),
            _ => None,
        };

        Self::FileComplete {
            path: report.path.clone(),
            status: report.outcome.status(),
            original_size,
            optimized_size,
            reduction_percent: report.reduction_percent(),
            output,
            error,
        }
    }

    /// Crea il messaggio finale dai totali del run
    pub fn complete(report: &RunReport) -> Self {
        let totals = report.totals();
        Self::Complete {
            files_optimized: report.files_optimized(),
            files_skipped: report.files_skipped(),
            errors: report.errors(),
            total_before: totals.before,
            total_after: totals.after,
            total_saved: totals.saved(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::FileOutcome;

    #[test]
    fn test_file_complete_serialization() {
        let report = FileReport::new("assets/a.jpg", FileOutcome::Optimized { before: 200, after: 50 });
        let json = serde_json::to_value(JsonMessage::file_complete(&report, None)).unwrap();

        assert_eq!(json["type"], "file_complete");
        assert_eq!(json["status"], "optimized");
        assert_eq!(json["original_size"], 200);
        assert_eq!(json["optimized_size"], 50);
        assert_eq!(json["reduction_percent"], 75.0);
        assert!(json["error"].is_null());
    }

    #[test]
    fn test_error_carries_message() {
        let report = FileReport::new(
            "assets/b.png",
            FileOutcome::Error { size: 10, message: "decode failed".to_string() },
        );
        match JsonMessage::file_complete(&report, None) {
            JsonMessage::FileComplete { status, error, optimized_size, .. } => {
                assert_eq!(status, FileStatus::Error);
                assert_eq!(error.as_deref(), Some("decode failed"));
                assert_eq!(optimized_size, 10);
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_complete_from_report() {
        let mut run = RunReport::new();
        run.push(FileReport::new("a.jpg", FileOutcome::Optimized { before: 100, after: 40 }));
        run.push(FileReport::new("b.png", FileOutcome::Skipped { size: 9, reason: "x".to_string() }));

        let json = serde_json::to_string(&JsonMessage::complete(&run)).unwrap();
        let parsed: JsonMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(
            parsed,
            JsonMessage::Complete {
                files_optimized: 1,
                files_skipped: 1,
                errors: 0,
                total_before: 100,
                total_after: 40,
                total_saved: 60,
            }
        );
    }
}
