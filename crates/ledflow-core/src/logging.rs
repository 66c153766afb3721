//! Logging configuration
//!
//! Consumed by the binary's tracing setup. Lives in core so the config
//! loader can deserialize it alongside the fixture configuration.

use std::io;
use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::Level;

/// Rotated log files kept per prefix
const MAX_LOG_FILES: usize = 5;

/// Logging options, one `[log]` table in the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Minimum level: "trace", "debug", "info", "warn" or "error"
    pub level: String,
    /// Mirror log lines to stderr
    pub console_output: bool,
    /// Write log lines to a file under `directory`
    pub file_output: bool,
    /// Directory holding log files
    pub directory: PathBuf,
    /// Log file name prefix
    pub file_prefix: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_output: true,
            file_output: false,
            directory: std::env::temp_dir().join("ledflow").join("logs"),
            file_prefix: "ledflow".to_string(),
        }
    }
}

impl LogConfig {
    /// Parse the configured level, defaulting to INFO if invalid
    pub fn parse_level(&self) -> Level {
        self.level.parse().unwrap_or(Level::INFO)
    }

    /// Create the log directory if missing
    pub fn ensure_log_directory(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.directory)
    }

    /// Path of the log file for the current day
    pub fn current_log_path(&self) -> PathBuf {
        let stamp = Utc::now().format("%Y%m%d");
        self.directory
            .join(format!("{}_{}.log", self.file_prefix, stamp))
    }

    /// Delete the oldest log files beyond the retention count
    pub fn cleanup_old_logs(&self) -> io::Result<()> {
        let mut logs: Vec<PathBuf> = std::fs::read_dir(&self.directory)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension().is_some_and(|ext| ext == "log")
                    && path
                        .file_name()
                        .and_then(|name| name.to_str())
                        .is_some_and(|name| name.starts_with(self.file_prefix.as_str()))
            })
            .collect();

        // Date-stamped names sort chronologically
        logs.sort();
        while logs.len() > MAX_LOG_FILES {
            let oldest = logs.remove(0);
            std::fs::remove_file(oldest)?;
        }
        Ok(())
    }
}
