//! The human-readable run log uploaded alongside every output artifact.

use std::path::Path;
use tracing::{error, info, warn};

/// Process exit code: success without caveats
pub const EXIT_OK: i32 = 0;

/// Process exit code: a fatal error aborted the run
pub const EXIT_FAILURE: i32 = 1;

/// Process exit code: succeeded, but warnings were logged
pub const EXIT_WARNINGS: i32 = 2;

const WARNING_PREFIX: &str = "WARNING: ";
const ERROR_PREFIX: &str = "ERROR: ";

/// Ordered log lines for one run, mirrored to `tracing`
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    lines: Vec<String>,
    warnings: usize,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("{message}");
        self.lines.push(message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{message}");
        self.lines.push(format!("{WARNING_PREFIX}{message}"));
        self.warnings += 1;
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!("{message}");
        self.lines.push(format!("{ERROR_PREFIX}{message}"));
    }

    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    #[must_use]
    pub fn has_warnings(&self) -> bool {
        self.warnings > 0
    }

    /// [`EXIT_WARNINGS`] if any warning was logged, else [`EXIT_OK`]
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.has_warnings() {
            EXIT_WARNINGS
        } else {
            EXIT_OK
        }
    }

    #[must_use]
    pub fn render(&self) -> String {
        self.lines.join("\n")
    }

    /// Write the log to a file
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be written.
    pub fn write(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_reflects_warnings() {
        let mut log = RunLog::new();
        log.info("Pooling OK");
        assert_eq!(log.exit_code(), EXIT_OK);

        log.warning("Target pool vol is adjusted to 25 ul");
        assert_eq!(log.exit_code(), EXIT_WARNINGS);
        assert_eq!(log.warning_count(), 1);
        assert_eq!(
            log.render(),
            "Pooling OK\nWARNING: Target pool vol is adjusted to 25 ul"
        );
    }

    #[test]
    fn test_error_lines_do_not_count_as_warnings() {
        let mut log = RunLog::new();
        log.error("Identical indices detected");
        assert!(!log.has_warnings());
        assert_eq!(log.lines()[0], "ERROR: Identical indices detected");
    }
}
