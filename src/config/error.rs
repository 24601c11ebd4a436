//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration loading, validation and path resolution.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A numeric environment variable could not be parsed.
    #[error("failed to parse {name}='{value}': {source}")]
    InvalidNumber {
        name: &'static str,
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// A boolean environment variable had an unrecognised value.
    #[error("invalid boolean for {name}: '{value}' (expected true/false/1/0)")]
    InvalidBool { name: &'static str, value: String },

    /// The corrupt-entry policy was not one of the known values.
    #[error("unknown corrupt-entry policy '{value}' (expected 'fail' or 'refetch')")]
    InvalidPolicy { value: String },

    /// The RPC endpoint is empty or not an http(s) URL.
    #[error("invalid RPC endpoint '{value}': must start with http:// or https://")]
    InvalidEndpoint { value: String },

    /// No storage root was configured and the home directory is unknown.
    #[error("storage root could not be resolved (set DATALAYER_ROOT)")]
    StorageRootUnresolved,

    /// Path exists but is not a directory.
    #[error("path is not a directory: {path}")]
    NotADirectory { path: PathBuf },
}

/// Convenience result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
