//! Error types for the scan pipeline.
//!
//! Per-seed failures ([`ScanError::BandOverflow`], [`ScanError::DegenerateInput`]) are
//! contained by the caller and counted; configuration and volume failures halt the run.

use std::io;
use thiserror::Error;

/// Errors raised while configuring or running a scan.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Malformed or out-of-range parameters, detected before scanning starts.
    #[error("invalid configuration: {}", .0.join("; "))]
    Configuration(Vec<String>),

    /// A reference volume could not be loaded or indexed.
    #[error("failed to load volume {volume}: {source}")]
    IndexLoad {
        volume: usize,
        #[source]
        source: io::Error,
    },

    /// Gapped or centroid band growth hit the configured ceiling.
    #[error("band width {width} exceeds ceiling {ceiling}")]
    BandOverflow { width: usize, ceiling: usize },

    /// Empty record or empty seed pattern.
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ScanError {
    /// Build a configuration error from a single message.
    pub fn config(message: impl Into<String>) -> Self {
        ScanError::Configuration(vec![message.into()])
    }

    /// True for failures that only drop one candidate and never halt a run.
    pub fn is_contained(&self) -> bool {
        matches!(
            self,
            ScanError::BandOverflow { .. } | ScanError::DegenerateInput(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_message_joins_reasons() {
        let err = ScanError::Configuration(vec!["a is bad".into(), "b is bad".into()]);
        assert_eq!(
            err.to_string(),
            "invalid configuration: a is bad; b is bad"
        );
    }

    #[test]
    fn test_index_load_keeps_source() {
        let err = ScanError::IndexLoad {
            volume: 3,
            source: io::Error::new(io::ErrorKind::NotFound, "missing.fa"),
        };
        assert!(err.to_string().contains("volume 3"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_contained_errors() {
        assert!(ScanError::BandOverflow { width: 10, ceiling: 5 }.is_contained());
        assert!(ScanError::DegenerateInput("empty".into()).is_contained());
        assert!(!ScanError::config("x").is_contained());
    }
}
