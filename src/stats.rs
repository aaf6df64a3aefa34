//! Stats and log recording.
//!
//! Append-only sinks for the pipeline: a transaction log file and the
//! operator-facing progress log. Sinks never fail the caller; IO errors
//! are logged and swallowed.

use chrono::Local;
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, warn};

/// Default transaction log path.
const DEFAULT_TRANSACTION_FILE: &str = "transactions.log";

/// Append-only transaction log.
pub struct TransactionLog {
    path: PathBuf,
}

impl Default for TransactionLog {
    fn default() -> Self {
        Self::new(DEFAULT_TRANSACTION_FILE)
    }
}

impl TransactionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TransactionLog { path: path.into() }
    }

    /// Append one line. Best-effort: a failed write is logged, not raised.
    pub fn append(&self, line: &str) {
        let result = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut f| writeln!(f, "{line}"));

        if let Err(e) = result {
            warn!(path = %self.path.display(), error = %e, "Failed to append transaction");
        }
    }

    /// Local wall-clock time in the transaction line format.
    pub fn timestamp() -> String {
        Local::now().format("%H:%M:%S").to_string()
    }
}

/// Write a line to the operator progress log.
pub fn progress(line: &str) {
    info!(target: "autobuyer::progress", "{line}");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path() -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("autobuyer_test_tx_{}.log", uuid::Uuid::new_v4()));
        p
    }

    #[test]
    fn test_append_writes_lines_in_order() {
        let path = temp_path();
        let log = TransactionLog::new(&path);
        log.append("[10:00:01] Kante buy success - Price : 15000");
        log.append("[10:00:05] Saka bid success - Price : 3200");

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Kante buy success"));
        assert!(lines[1].contains("Saka bid success"));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_append_to_unwritable_path_does_not_panic() {
        let log = TransactionLog::new("/nonexistent-dir/tx.log");
        log.append("dropped line");
    }

    #[test]
    fn test_timestamp_shape() {
        let ts = TransactionLog::timestamp();
        assert_eq!(ts.len(), 8);
        assert_eq!(ts.as_bytes()[2], b':');
        assert_eq!(ts.as_bytes()[5], b':');
    }
}
