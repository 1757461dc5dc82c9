//! Error types for the pindah toolkit.
//!
//! This module provides a unified error type with explicit variants for
//! source-database, file, destination-API, record-codec, and configuration
//! failures.

use std::fmt;
use thiserror::Error;

/// The unified error type for migration operations.
///
/// Covers all failure modes in the toolkit, with explicit variants so
/// callers can handle specific categories (e.g. abort on authentication
/// failure but continue past a single batch failure).
#[derive(Debug, Error)]
pub enum Error {
    /// Source database errors (connection, count, page retrieval).
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// CSV file errors (create, open, write, close, parse).
    #[error("file error: {0}")]
    File(#[from] FileError),

    /// Destination API errors (authentication, batch creation, connect).
    #[error("api error: {0}")]
    Api(#[from] ApiError),

    /// Record codec errors (metadata cell, field layout).
    #[error("record error: {0}")]
    Record(#[from] RecordError),

    /// Configuration errors (unsupported version pair, invalid URL).
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Returns true if this error is a destination authentication failure.
    ///
    /// Authentication failure aborts an import outright; every other
    /// per-kind failure is logged and the remaining kinds still run.
    pub fn is_auth_error(&self) -> bool {
        match self {
            Error::Api(ApiError::Auth { .. }) => true,
            Error::Api(ApiError::Status(status)) => status.is_auth_error(),
            _ => false,
        }
    }
}

/// Source database errors.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Connecting to the database failed.
    #[error("failed to connect to source database: {message}")]
    Connect { message: String },

    /// The COUNT(*) query for an entity kind failed.
    #[error("failed to count rows during {operation}: {message}")]
    Count { operation: String, message: String },

    /// A page query or row decode failed, without pagination context.
    #[error("query failed: {message}")]
    Query { message: String },

    /// A pagination round failed; carries the window in effect.
    #[error("error occurred at offset {offset} with limit {limit} during {operation}: {message}")]
    Retrieve {
        operation: String,
        offset: u64,
        limit: u64,
        message: String,
    },
}

/// CSV file errors. Every variant carries the file path and the
/// operation that was underway, so a failing record window can be located
/// from the log line alone.
#[derive(Debug, Error)]
pub enum FileError {
    /// Creating a parent directory failed.
    #[error("failed to create directory for {path} during {operation}: {message}")]
    CreateDir {
        path: String,
        operation: String,
        message: String,
    },

    /// Creating the file failed.
    #[error("failed to create file {path} during {operation}: {message}")]
    Create {
        path: String,
        operation: String,
        message: String,
    },

    /// Opening the file failed.
    #[error("failed to open file {path} during {operation}: {message}")]
    Open {
        path: String,
        operation: String,
        message: String,
    },

    /// Writing a row (or flushing) failed.
    #[error("failed to write to file {path} during {operation}: {message}")]
    Write {
        path: String,
        operation: String,
        message: String,
    },

    /// A row or the required header could not be parsed.
    #[error("failed to parse csv file {path} during {operation}: {message}")]
    Parse {
        path: String,
        operation: String,
        message: String,
    },
}

/// Destination API errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Token issue failed; fatal for an import run.
    #[error("authentication failed: {message}")]
    Auth { message: String },

    /// Network transport failure (DNS, TLS, connection, timeout).
    #[error("http error: {message}")]
    Http { message: String },

    /// Non-success response from the platform.
    #[error("platform error: {0}")]
    Status(#[from] StatusError),

    /// A batch create or connect call failed; carries the identifiers of
    /// the records in the failing batch.
    #[error("failed batch of {} record(s) [{}] during {operation}: {message}", .ids.len(), .ids.join(","))]
    Batch {
        operation: String,
        ids: Vec<String>,
        message: String,
    },
}

/// Error response from the destination platform.
#[derive(Debug)]
pub struct StatusError {
    /// HTTP status code.
    pub status: u16,
    /// Platform error code (if present).
    pub error: Option<String>,
    /// Error message from the platform.
    pub message: Option<String>,
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(ref error) = self.error {
            write!(f, " [{}]", error)?;
        }
        if let Some(ref message) = self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for StatusError {}

impl StatusError {
    /// Create a new status error.
    pub fn new(status: u16, error: Option<String>, message: Option<String>) -> Self {
        Self {
            status,
            error,
            message,
        }
    }

    /// Check if this is an authentication error.
    pub fn is_auth_error(&self) -> bool {
        self.status == 401
            || self.error.as_deref() == Some("AuthenticationRequired")
            || self.error.as_deref() == Some("InvalidToken")
    }
}

/// Record codec errors.
#[derive(Debug, Error)]
pub enum RecordError {
    /// A metadata cell could not be encoded or decoded.
    #[error("invalid metadata cell: {message}")]
    Metadata { message: String },

    /// A CSV row had the wrong number of fields for its entity kind.
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The requested (from, to, operation) triple is not supported.
    #[error("unsupported migration: operation {operation} from version {from} to version {to}")]
    UnsupportedMigration {
        from: String,
        to: String,
        operation: String,
    },

    /// A configured URL is not valid.
    #[error("invalid url '{value}': {reason}")]
    InvalidUrl { value: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retrieve_error_carries_window() {
        let err = Error::Source(SourceError::Retrieve {
            operation: "retrieving things".to_string(),
            offset: 200,
            limit: 100,
            message: "connection reset".to_string(),
        });
        let msg = err.to_string();
        assert!(msg.contains("offset 200"));
        assert!(msg.contains("limit 100"));
        assert!(msg.contains("retrieving things"));
    }

    #[test]
    fn batch_error_lists_ids() {
        let err = ApiError::Batch {
            operation: "creating things".to_string(),
            ids: vec!["t1".to_string(), "t2".to_string()],
            message: "HTTP 500".to_string(),
        };
        assert!(err.to_string().contains("t1,t2"));
    }

    #[test]
    fn auth_detection() {
        let unauthorized = Error::Api(ApiError::Status(StatusError::new(401, None, None)));
        assert!(unauthorized.is_auth_error());

        let conflict = Error::Api(ApiError::Status(StatusError::new(409, None, None)));
        assert!(!conflict.is_auth_error());

        let auth = Error::Api(ApiError::Auth {
            message: "bad secret".to_string(),
        });
        assert!(auth.is_auth_error());
    }
}
