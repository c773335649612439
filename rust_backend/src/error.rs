//! Error types for catalog, cache and visibility operations.
//!
//! Library functions return [`UptimeResult`]; binaries wrap these in
//! `anyhow` with additional context.

use std::fmt;
use std::path::{Path, PathBuf};

/// Result type for uptime operations
pub type UptimeResult<T> = Result<T, UptimeError>;

/// Where an error happened: the file involved and, for tabular input, the row.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    pub path: Option<PathBuf>,
    pub row: Option<usize>,
    pub details: Option<String>,
}

impl ErrorContext {
    pub fn for_path(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            ..Default::default()
        }
    }

    /// Set the (0-based) data row.
    pub fn with_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref path) = self.path {
            parts.push(format!("path={}", path.display()));
        }
        if let Some(row) = self.row {
            parts.push(format!("row={}", row));
        }
        if let Some(ref details) = self.details {
            parts.push(format!("details={}", details));
        }
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Error type for uptime operations
#[derive(Debug, thiserror::Error)]
pub enum UptimeError {
    /// The catalog file could not be opened or is not valid delimited text.
    #[error("Catalog read error: {message} {context}")]
    CatalogRead {
        message: String,
        context: ErrorContext,
    },

    /// A required catalog column is absent from the header.
    #[error("Missing catalog column '{column}' {context}")]
    MissingColumn {
        column: String,
        context: ErrorContext,
    },

    /// A catalog row holds a value that does not fit the schema.
    #[error("Invalid catalog row: {message} {context}")]
    InvalidRow {
        message: String,
        context: ErrorContext,
    },

    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("Invalid time grid: {0}")]
    InvalidGrid(String),

    #[error("Cache I/O error: {source} {context}")]
    CacheIo {
        #[source]
        source: std::io::Error,
        context: ErrorContext,
    },

    /// The cache header is not one this build knows how to read.
    #[error("Unsupported cache format: {message} {context}")]
    CacheFormat {
        message: String,
        context: ErrorContext,
    },

    #[error("Cache decode error: {message} {context}")]
    CacheDecode {
        message: String,
        context: ErrorContext,
    },

    #[error("Cache encode error: {0}")]
    CacheEncode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl UptimeError {
    pub fn is_cache_error(&self) -> bool {
        matches!(
            self,
            UptimeError::CacheIo { .. }
                | UptimeError::CacheFormat { .. }
                | UptimeError::CacheDecode { .. }
                | UptimeError::CacheEncode(_)
        )
    }
}
