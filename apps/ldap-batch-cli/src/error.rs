//! CLI error types and exit codes

use ldap_batch::LookupError;
use thiserror::Error;

/// Exit codes for the CLI
/// - 0: Success
/// - 1: General or I/O error
/// - 2: Configuration or search specification error
/// - 3: Connection error
/// - 4: Authentication error
/// - 5: Some identifiers could not be looked up
/// - 130: Cancelled (Ctrl+C)
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("Cancelled; partial results with {rows} data row(s) were written")]
    Cancelled { rows: usize },

    #[error("{count} identifier(s) could not be looked up")]
    PartialFailure { count: usize },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 2,
            CliError::Io(_) | CliError::Output(_) => 1,
            CliError::PartialFailure { .. } => 5,
            CliError::Cancelled { .. } => 130,
            CliError::Lookup(e) => match e {
                LookupError::Configuration { .. }
                | LookupError::InvalidSpec { .. }
                | LookupError::InvalidFilterInput { .. } => 2,
                LookupError::Connection { .. } | LookupError::ConnectionLost { .. } => 3,
                LookupError::Authentication { .. } => 4,
                LookupError::Cancelled { .. } => 130,
                _ => 1,
            },
        }
    }

    /// Print the error to stderr
    pub fn print(&self) {
        eprintln!("Error: {self}");
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e.to_string())
    }
}

impl From<config::ConfigError> for CliError {
    fn from(e: config::ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<csv::Error> for CliError {
    fn from(e: csv::Error) -> Self {
        CliError::Output(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Output(e.to_string())
    }
}
