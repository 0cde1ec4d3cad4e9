//! CLI error types and conversions

use crate::collector::CollectorError;
use crate::output::OutputError;
use crate::query::QueryError;
use crate::source::FetchError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Query parse error
    #[error("query error: {0}")]
    QueryError(#[from] QueryError),

    /// Collection error
    #[error("collection error: {0}")]
    CollectorError(#[from] CollectorError),

    /// Source construction error
    #[error("source error: {0}")]
    SourceError(#[from] FetchError),

    /// Output error
    #[error("output error: {0}")]
    OutputError(#[from] OutputError),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}
