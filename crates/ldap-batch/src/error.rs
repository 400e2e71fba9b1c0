//! Batch lookup error types
//!
//! Error definitions with fatal/per-identifier classification. Fatal errors
//! abort the whole run; per-identifier errors are recorded on the result
//! table and the batch continues.

use thiserror::Error;

use crate::session::SessionState;
use crate::table::ResultTable;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Error that can occur while running a batch lookup.
#[derive(Debug, Error)]
pub enum LookupError {
    // Validation errors (fatal, raised before any network activity)
    /// Connection configuration is incomplete or malformed.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Search specification is incomplete or malformed.
    #[error("invalid search specification: {message}")]
    InvalidSpec { message: String },

    /// A filter could not be built from the given attribute and value.
    #[error("invalid filter input: {message}")]
    InvalidFilterInput { message: String },

    // Session establishment errors (fatal)
    /// Failed to reach or negotiate with the directory server.
    #[error("connection failed: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// The directory server rejected the bind credentials.
    #[error("authentication failed: {message}")]
    Authentication { message: String },

    // Search errors
    /// The directory server rejected a search request.
    #[error("search failed (result code {rc}): {message}")]
    Search { rc: u32, message: String },

    /// A search did not complete within the configured timeout.
    #[error("search timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// The underlying connection dropped mid-session.
    #[error("connection lost: {message}")]
    ConnectionLost {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// Operation attempted on a session that is not open.
    #[error("cannot {operation} a session in state {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    /// The run was cancelled between identifiers.
    #[error("batch cancelled after {} data rows", partial.rows().len())]
    Cancelled { partial: Box<ResultTable> },
}

impl LookupError {
    /// Check if this error aborts the whole batch.
    ///
    /// Per-identifier errors (rejected search, timeout, unusable identifier)
    /// are recorded and the batch moves on to the next identifier.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            LookupError::Search { .. }
                | LookupError::Timeout { .. }
                | LookupError::InvalidFilterInput { .. }
        )
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            LookupError::Configuration { .. } => "CONFIGURATION_ERROR",
            LookupError::InvalidSpec { .. } => "INVALID_SPEC",
            LookupError::InvalidFilterInput { .. } => "INVALID_FILTER_INPUT",
            LookupError::Connection { .. } => "CONNECTION_FAILED",
            LookupError::Authentication { .. } => "AUTH_FAILED",
            LookupError::Search { .. } => "SEARCH_FAILED",
            LookupError::Timeout { .. } => "SEARCH_TIMEOUT",
            LookupError::ConnectionLost { .. } => "CONNECTION_LOST",
            LookupError::InvalidState { .. } => "INVALID_STATE",
            LookupError::Cancelled { .. } => "CANCELLED",
        }
    }

    // Convenience constructors

    /// Create a configuration error for a required field that is absent.
    pub fn missing_field(field: &str) -> Self {
        LookupError::Configuration {
            message: format!("missing field: {field}"),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        LookupError::Configuration {
            message: message.into(),
        }
    }

    /// Create an invalid search specification error.
    pub fn invalid_spec(message: impl Into<String>) -> Self {
        LookupError::InvalidSpec {
            message: message.into(),
        }
    }

    /// Create an invalid filter input error.
    pub fn invalid_filter_input(message: impl Into<String>) -> Self {
        LookupError::InvalidFilterInput {
            message: message.into(),
        }
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        LookupError::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection error with source.
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        LookupError::Connection {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a connection lost error with source.
    pub fn connection_lost_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        LookupError::ConnectionLost {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a search error from a directory result code.
    pub fn search(rc: u32, message: impl Into<String>) -> Self {
        LookupError::Search {
            rc,
            message: message.into(),
        }
    }
}

/// Result type for batch lookup operations.
pub type LookupResult<T> = Result<T, LookupError>;
