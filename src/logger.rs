//! Custom logging module.
//!
//! This module provides the logger installed by the command-line driver. It
//! writes timestamped lines to stderr and can forward them to a callback,
//! which the replay report uses to collect the reconciler's trace.

use crate::error::{AppError, AppResult};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Format a log record into a string for display
///
pub fn format_log(record: &Record) -> String {
    let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f");
    let level_str = match record.level() {
        Level::Error => "ERROR",
        Level::Warn => "WARN",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    };
    format!("{} {} {}", timestamp, level_str, record.args())
}

type LogCallback = Box<dyn Fn(String) + Send + Sync>;

/// Logger writing to stderr and, optionally, to a capture callback.
///
pub struct HistoryLogger {
    level: LevelFilter,
    echo: bool,
    log_callback: Arc<Mutex<Option<LogCallback>>>,
}

impl HistoryLogger {
    pub fn new(level: LevelFilter) -> Self {
        HistoryLogger {
            level,
            echo: true,
            log_callback: Arc::new(Mutex::new(None)),
        }
    }

    /// Stop writing to stderr; only the callback receives lines.
    ///
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    pub fn set_log_callback(&self, callback: LogCallback) {
        if let Ok(mut guard) = self.log_callback.lock() {
            *guard = Some(callback);
        }
        // Without the lock the callback stays unset; stderr output continues.
    }
}

impl Log for HistoryLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let formatted = format_log(record);
        if let Ok(callback) = self.log_callback.lock() {
            if let Some(ref cb) = *callback {
                cb(formatted.clone());
            }
        }
        if self.echo {
            let _ = writeln!(std::io::stderr(), "{}", formatted);
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Parse a configured level name, defaulting to `Info` for unknown names.
///
pub fn parse_level(name: &str) -> LevelFilter {
    name.parse().unwrap_or(LevelFilter::Info)
}

/// Install a [`HistoryLogger`] as the global logger.
///
pub fn init(logger: HistoryLogger) -> AppResult<()> {
    let level = logger.level;
    log::set_boxed_logger(Box::new(logger)).map_err(|e| AppError::Logger(e.to_string()))?;
    log::set_max_level(level);
    Ok(())
}
