//! # CLI Error Type
//!
//! One error type for every command. It is printed on stderr as
//! `error: <message>` and mapped to the process exit code.
//!
//! ```text
//! DbError ──────────┐
//! NumberingError ───┤
//! CoreError ────────┼──► CliError ──► "error: ..." + exit code
//! ConfigError ──────┤
//! bad arguments ────┘
//! ```

use sanbill_core::{CoreError, ValidationError};
use sanbill_db::{DbError, NumberingError};
use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;

/// Exit code for bad command-line usage.
pub const EXIT_USAGE: u8 = 2;

/// Exit code when the database cannot be reached.
pub const EXIT_UNAVAILABLE: u8 = 3;

/// Errors returned by commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// A command used where it cannot run.
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Numbering(#[from] NumberingError),

    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid document draft {path}: {source}")]
    Draft {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl From<ValidationError> for CliError {
    fn from(err: ValidationError) -> Self {
        CliError::Core(CoreError::Validation(err))
    }
}

impl CliError {
    /// Creates a usage error.
    pub fn usage(message: impl Into<String>) -> Self {
        CliError::Usage(message.into())
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Usage(_) => EXIT_USAGE,
            CliError::Numbering(NumberingError::StorageUnavailable(_)) => EXIT_UNAVAILABLE,
            CliError::Db(err) if err.is_unavailable() => EXIT_UNAVAILABLE,
            _ => 1,
        }
    }
}

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::usage("missing --rate").exit_code(), EXIT_USAGE);
        assert_eq!(
            CliError::from(NumberingError::StorageUnavailable(DbError::PoolExhausted)).exit_code(),
            EXIT_UNAVAILABLE
        );
        assert_eq!(
            CliError::from(DbError::not_found("Job", "SE/1")).exit_code(),
            1
        );
        assert_eq!(CliError::from(ValidationError::NoLineItems).exit_code(), 1);
    }

    #[test]
    fn test_messages_pass_through() {
        let err = CliError::from(CoreError::JobClosed {
            job_no: "SE/1042".into(),
        });
        assert_eq!(err.to_string(), "Job SE/1042 is closed");

        let err = CliError::from(ValidationError::NoLineItems);
        assert_eq!(err.to_string(), "Validation error: Add at least one line item");
    }
}
