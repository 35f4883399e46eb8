//! Error types for the latency engine.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while opening or tailing a stream, or building an engine.
///
/// Per-line parse failures are not engine errors; they are reported as
/// [`ParseError`](crate::data::record::ParseError) and counted without
/// aborting the batch.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The backing file did not exist when the stream was opened.
    #[error("backing file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The file is shorter than the read cursor (truncated or replaced).
    #[error(
        "stream reset on {}: cursor at byte {} but file is {} bytes",
        .path.display(),
        .offset,
        .size
    )]
    StreamReset { path: PathBuf, offset: u64, size: u64 },

    /// Any other I/O failure while reading the stream.
    #[error("read error on {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The producer side of an in-process line source hung up.
    #[error("line source closed")]
    Closed,

    /// Engine settings that cannot produce correct results.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl EngineError {
    /// Wrap an I/O error, mapping `NotFound` onto its own variant.
    pub fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            EngineError::NotFound(path)
        } else {
            EngineError::Io { path, source }
        }
    }

    /// Whether the stream can no longer be tailed.
    ///
    /// Transient read errors abort the current tick only; the driver retries
    /// them on the next one.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, EngineError::Io { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io_maps_not_found() {
        let err = EngineError::from_io(
            "/tmp/missing.csv",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, EngineError::NotFound(_)));
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "backing file not found: /tmp/missing.csv");
    }

    #[test]
    fn test_io_errors_are_retryable() {
        let err = EngineError::from_io(
            "/tmp/a.csv",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(!err.is_fatal());
        assert!(err.to_string().starts_with("read error on /tmp/a.csv"));
    }

    #[test]
    fn test_stream_reset_message() {
        let err = EngineError::StreamReset {
            path: PathBuf::from("SPY.csv"),
            offset: 120,
            size: 40,
        };
        assert!(err.is_fatal());
        assert_eq!(
            err.to_string(),
            "stream reset on SPY.csv: cursor at byte 120 but file is 40 bytes"
        );
    }
}
