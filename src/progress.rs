//! # Progress & Console Module
//!
//! Questo modulo gestisce il progress tracking e l'output verso la console.
//!
//! ## Responsabilità:
//! - Progress bar visual con `indicatif` durante il loop sui file
//! - `Console`: instrada righe di testo o messaggi JSON a seconda della modalità
//! - Le righe di report vanno su stdout; la barra (su stderr) viene sospesa mentre si scrive
//! - `Console::capturing`: registra le righe invece di stamparle (test)
//!
//! ## Modalità:
//! - `Text`: righe leggibili + progress bar
//! - `Json`: un oggetto JSON per riga, nessuna barra
//! - `Silent`: nessun output (test e uso come libreria)
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:04] [========>-------------------------------] 12/57 (21%) hero.jpg
//! ```

use crate::json_output::JsonMessage;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

/// Manages progress reporting for a batch job
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total_files: u64) -> Self {
        let bar = ProgressBar::new(total_files);

        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// A progress manager that never draws
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Update progress with a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Print a line to stdout, clearing the bar while it is written
    pub fn println(&self, line: &str) {
        self.bar.suspend(|| println!("{}", line));
    }

    /// Finish and clear the bar
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// How a job talks to the console
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Text,
    Json,
    Silent,
}

/// Routes human-readable lines and JSON events according to the output mode
pub struct Console {
    mode: OutputMode,
    progress: Option<ProgressManager>,
    captured: Option<Mutex<Vec<String>>>,
}

impl Console {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            progress: None,
            captured: None,
        }
    }

    /// A console that records its output instead of printing it
    pub fn capturing(mode: OutputMode) -> Self {
        Self {
            mode,
            progress: None,
            captured: Some(Mutex::new(Vec::new())),
        }
    }

    /// Drain the lines recorded by a capturing console
    pub fn take_output(&self) -> Vec<String> {
        match &self.captured {
            Some(captured) => captured.lock().map(|mut lines| std::mem::take(&mut *lines)).unwrap_or_default(),
            None => Vec::new(),
        }
    }

    pub fn silent() -> Self {
        Self::new(OutputMode::Silent)
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Start a progress bar over `total` files (text mode only)
    pub fn start_progress(&mut self, total: u64) {
        if self.mode == OutputMode::Text {
            self.progress = Some(if self.captured.is_some() {
                ProgressManager::hidden()
            } else {
                ProgressManager::new(total)
            });
        }
    }

    /// Advance the bar by one file
    pub fn advance(&self, message: &str) {
        if let Some(progress) = &self.progress {
            progress.update(message);
        }
    }

    pub fn finish_progress(&mut self) {
        if let Some(progress) = self.progress.take() {
            progress.finish();
        }
    }

    /// Print a text line in text mode
    pub fn line(&self, line: &str) {
        if self.mode == OutputMode::Text {
            self.write(line);
        }
    }

    pub fn lines<I, S>(&self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            self.line(line.as_ref());
        }
    }

    /// Emit a JSON event in JSON mode
    pub fn event(&self, message: JsonMessage) {
        if self.mode == OutputMode::Json {
            if let Some(json) = message.to_line() {
                self.write(&json);
            }
        }
    }

    fn write(&self, line: &str) {
        if let Some(captured) = &self.captured {
            if let Ok(mut lines) = captured.lock() {
                lines.push(line.to_string());
            }
            return;
        }

        match &self.progress {
            Some(progress) => progress.println(line),
            None => println!("{}", line),
        }
    }
}
