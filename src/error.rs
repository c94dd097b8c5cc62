//! Error types for the data viewer cache
//!
//! Centralized error handling using snafu for ergonomic error definitions.

use snafu::Snafu;

/// Main error type for the crate
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum Error {
    /// Invalid input or configuration
    #[snafu(display("Invalid: {message}"))]
    Invalid { message: String },

    /// Fragment shape disagrees with the dataset it is merged into
    #[snafu(display("Schema mismatch: expected {expected}, got {actual}"))]
    SchemaMismatch { expected: String, actual: String },

    /// Fragment overlaps rows that were already merged at another offset
    #[snafu(display("Fragment starting at row {start_row} overlaps loaded rows"))]
    Overlap { start_row: usize },

    /// Transport refused the send, or the remote side reported a failure
    #[snafu(display("Transport error: {message}"))]
    Transport { message: String },

    /// Pending request outlived the request timeout
    #[snafu(display("Timeout waiting for rows at {start_row}"))]
    Timeout { start_row: usize },

    /// Pending request was discarded before its response arrived
    #[snafu(display("Request for rows at {start_row} was cancelled"))]
    Cancelled { start_row: usize },

    /// Too many requests in flight
    #[snafu(display("Request queue full ({limit} in flight)"))]
    QueueFull { limit: usize },

    /// IO error (config files)
    #[snafu(display("IO error: {message}"))]
    Io { message: String },

    /// JSON serialization/deserialization error
    #[snafu(display("JSON error: {message}"))]
    Json { message: String },

    /// TOML deserialization error
    #[snafu(display("TOML parse error: {message}"))]
    TomlDe { message: String },

    /// TOML serialization error
    #[snafu(display("TOML serialize error: {message}"))]
    TomlSe { message: String },
}

// Library errors are flattened to strings so `Error` stays `Clone` and can be
// fanned out to every waiter of a shared request.

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Io {
            message: source.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Error::Json {
            message: source.to_string(),
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(source: toml::de::Error) -> Self {
        Error::TomlDe {
            message: source.to_string(),
        }
    }
}

impl From<toml::ser::Error> for Error {
    fn from(source: toml::ser::Error) -> Self {
        Error::TomlSe {
            message: source.to_string(),
        }
    }
}

/// Result type alias for convenience
pub type Result<T, E = Error> = std::result::Result<T, E>;
