//! Per-run logger with file and callback output.
//!
//! Each conversion run gets its own logger that writes to a dedicated
//! log file and mirrors every line to a UI callback (if provided).

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

use super::UiLogCallback;
use crate::config::LoggingSettings;

/// Per-run logger with dual output (file + UI).
pub struct RunLogger {
    /// Path to the log file, if file output could be opened.
    log_path: Option<PathBuf>,
    /// File writer (buffered).
    file_writer: Mutex<Option<BufWriter<File>>>,
    /// UI callback for mirroring lines.
    ui_callback: Option<UiLogCallback>,
    /// Logging configuration.
    config: LoggingSettings,
}

impl RunLogger {
    /// Create a logger writing into `dir` using the configured file name.
    ///
    /// A log file that cannot be created is not worth failing the run
    /// over: the logger falls back to callback-only output and reports
    /// the problem through `tracing`.
    pub fn new(
        dir: impl AsRef<Path>,
        config: LoggingSettings,
        ui_callback: Option<UiLogCallback>,
    ) -> Self {
        let log_path = dir.as_ref().join(&config.run_log_file);
        match File::create(&log_path) {
            Ok(file) => Self {
                log_path: Some(log_path),
                file_writer: Mutex::new(Some(BufWriter::new(file))),
                ui_callback,
                config,
            },
            Err(e) => {
                tracing::warn!(path = %log_path.display(), error = %e, "run log file unavailable");
                Self::detached(config, ui_callback)
            }
        }
    }

    /// Create a logger with no file backing (callback only, or silent).
    pub fn detached(config: LoggingSettings, ui_callback: Option<UiLogCallback>) -> Self {
        Self {
            log_path: None,
            file_writer: Mutex::new(None),
            ui_callback,
            config,
        }
    }

    /// Get the log file path, if file output is active.
    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Log an info message.
    pub fn info(&self, message: &str) {
        self.output(&self.format_message(message));
    }

    /// Log a warning.
    pub fn warn(&self, message: &str) {
        self.output(&self.format_message(&format!("[WARNING] {}", message)));
    }

    /// Log an error.
    pub fn error(&self, message: &str) {
        self.output(&self.format_message(&format!("[ERROR] {}", message)));
    }

    /// Log a document phase marker.
    pub fn phase(&self, name: &str) {
        self.output(&self.format_message(&format!("--- {} ---", name)));
    }

    /// Flush the log file.
    pub fn flush(&self) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writer.flush();
        }
    }

    /// Close the logger and release the file handle.
    pub fn close(&self) {
        self.flush();
        *self.file_writer.lock() = None;
    }

    fn format_message(&self, message: &str) -> String {
        if self.config.show_timestamps {
            let timestamp = Local::now().format("%H:%M:%S");
            format!("[{}] {}", timestamp, message)
        } else {
            message.to_string()
        }
    }

    fn output(&self, formatted: &str) {
        if let Some(ref mut writer) = *self.file_writer.lock() {
            let _ = writeln!(writer, "{}", formatted);
        }

        if let Some(ref callback) = self.ui_callback {
            callback(formatted);
        }
    }
}

impl Drop for RunLogger {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn creates_log_file() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new(dir.path(), LoggingSettings::default(), None);

        let path = logger.log_path().unwrap();
        assert!(path.exists());
        assert!(path.to_string_lossy().ends_with("conversion.log"));
    }

    #[test]
    fn writes_to_file() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::new(dir.path(), LoggingSettings::default(), None);

        logger.info("converted page 1");
        logger.flush();

        let content = fs::read_to_string(logger.log_path().unwrap()).unwrap();
        assert!(content.contains("converted page 1"));
    }

    #[test]
    fn calls_ui_callback() {
        let dir = tempdir().unwrap();
        let call_count = Arc::new(AtomicUsize::new(0));
        let count_clone = call_count.clone();

        let callback: UiLogCallback = Box::new(move |_msg| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        let logger =
            RunLogger::new(dir.path(), LoggingSettings::default(), Some(callback));

        logger.info("one");
        logger.warn("two");

        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn detached_logger_does_not_write_files() {
        let mut config = LoggingSettings::default();
        config.show_timestamps = false;

        let logger = RunLogger::detached(config, None);
        logger.info("nowhere");
        assert!(logger.log_path().is_none());
    }

    #[test]
    fn timestamps_can_be_disabled() {
        let dir = tempdir().unwrap();
        let mut config = LoggingSettings::default();
        config.show_timestamps = false;

        let logger = RunLogger::new(dir.path(), config, None);
        logger.info("plain line");
        logger.flush();

        let content = fs::read_to_string(logger.log_path().unwrap()).unwrap();
        assert!(content.starts_with("plain line"));
    }
}
