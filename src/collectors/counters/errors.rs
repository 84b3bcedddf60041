//! Error types for interface counter collection
//!
//! Every backend reports failures through a single [`CollectionError`]. The
//! [`CollectionErrorKind`] only drives the diagnostic log entry; callers treat
//! all kinds the same way and discard the whole collection.

use log::error;
use std::fmt;
use thiserror::Error;

/// Classification of a failed collection, used for diagnostics only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionErrorKind {
    /// The initial OS call that sizes or opens the data source failed
    QueryFailure,
    /// Retrieving the data failed after a successful size/open step
    FetchFailure,
    /// A working buffer could not be allocated
    ResourceExhaustion,
}

impl CollectionErrorKind {
    /// Stable snake_case label used in log entries
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionErrorKind::QueryFailure => "query_failure",
            CollectionErrorKind::FetchFailure => "fetch_failure",
            CollectionErrorKind::ResourceExhaustion => "resource_exhaustion",
        }
    }
}

impl fmt::Display for CollectionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A collection could not be completed; no samples are available for this call
#[derive(Debug, Error)]
#[error("{backend} collection failed ({kind}): {message}{}", os_code_suffix(.os_code))]
pub struct CollectionError {
    kind: CollectionErrorKind,
    backend: &'static str,
    message: String,
    os_code: Option<i32>,
    #[source]
    source: Option<std::io::Error>,
}

fn os_code_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" (os error {})", code),
        None => String::new(),
    }
}

impl CollectionError {
    pub fn new(kind: CollectionErrorKind, backend: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind,
            backend,
            message: message.into(),
            os_code: None,
            source: None,
        }
    }

    pub fn query(backend: &'static str, message: impl Into<String>) -> Self {
        Self::new(CollectionErrorKind::QueryFailure, backend, message)
    }

    pub fn fetch(backend: &'static str, message: impl Into<String>) -> Self {
        Self::new(CollectionErrorKind::FetchFailure, backend, message)
    }

    pub fn exhausted(backend: &'static str, message: impl Into<String>) -> Self {
        Self::new(CollectionErrorKind::ResourceExhaustion, backend, message)
    }

    /// Attaches a raw OS error code (errno or Win32 status)
    pub fn with_os_code(mut self, code: i32) -> Self {
        self.os_code = Some(code);
        self
    }

    /// Attaches the underlying I/O error, copying its raw OS code if it has one
    pub fn with_io_source(mut self, err: std::io::Error) -> Self {
        if self.os_code.is_none() {
            self.os_code = err.raw_os_error();
        }
        self.source = Some(err);
        self
    }

    pub fn kind(&self) -> CollectionErrorKind {
        self.kind
    }

    pub fn backend(&self) -> &'static str {
        self.backend
    }

    pub fn os_code(&self) -> Option<i32> {
        self.os_code
    }

    /// Emits the single diagnostic entry for this failure and hands the error back
    pub fn logged(self) -> Self {
        log_collection_failure(&self);
        self
    }
}

/// Writes one structured error entry describing a failed collection
pub fn log_collection_failure(err: &CollectionError) {
    match err.os_code {
        Some(code) => error!(
            "Interface counter collection failed: backend={}, classification={}, os_error={}, detail={}",
            err.backend, err.kind, code, err.message
        ),
        None => error!(
            "Interface counter collection failed: backend={}, classification={}, detail={}",
            err.backend, err.kind, err.message
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels() {
        assert_eq!(CollectionErrorKind::QueryFailure.as_str(), "query_failure");
        assert_eq!(CollectionErrorKind::FetchFailure.as_str(), "fetch_failure");
        assert_eq!(
            CollectionErrorKind::ResourceExhaustion.as_str(),
            "resource_exhaustion"
        );
    }

    #[test]
    fn test_display_includes_os_code() {
        let err = CollectionError::query("windows-iftable", "GetIfTable failed").with_os_code(87);
        let rendered = err.to_string();
        assert!(rendered.contains("windows-iftable"));
        assert!(rendered.contains("query_failure"));
        assert!(rendered.contains("os error 87"));
    }

    #[test]
    fn test_io_source_supplies_os_code() {
        let io = std::io::Error::from_raw_os_error(2);
        let err = CollectionError::query("linux-procfs", "open failed").with_io_source(io);
        assert_eq!(err.os_code(), Some(2));
        assert_eq!(err.kind(), CollectionErrorKind::QueryFailure);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_explicit_code_wins_over_io_source() {
        let io = std::io::Error::from_raw_os_error(2);
        let err = CollectionError::fetch("macos-sysctl", "fetch failed")
            .with_os_code(12)
            .with_io_source(io);
        assert_eq!(err.os_code(), Some(12));
    }
}
