//! Error types for salam-stats.
//!
//! Uses `thiserror` for structured, matchable variants. Only the edges of the
//! engine produce these (configuration, trace parsing, file output); the
//! per-cycle accounting methods are infallible.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced at the I/O and configuration boundary of the engine.
#[derive(Debug, Error)]
pub enum StatsError {
    /// A file could not be opened, read, or written.
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A configuration value was rejected.
    #[error("invalid configuration: {reason}")]
    Config { reason: String },

    /// A line of an event trace could not be parsed.
    #[error("trace line {line}: {reason}")]
    Trace { line: usize, reason: String },
}

impl StatsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StatsError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_names_path() {
        let err = StatsError::io(
            "/nope/run1.csv",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert_eq!(err.to_string(), "I/O error on '/nope/run1.csv': missing");
    }

    #[test]
    fn trace_error_names_line() {
        let err = StatsError::Trace {
            line: 4,
            reason: "unknown event".into(),
        };
        assert_eq!(err.to_string(), "trace line 4: unknown event");
    }
}
