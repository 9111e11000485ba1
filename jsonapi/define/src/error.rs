//! Error types for loading API documents.

use thiserror::Error;

/// Errors that can occur while obtaining or parsing an API document.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Failed to read the document from disk
    #[error("Failed to read API document '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The source looked like a URL but could not be parsed as one
    #[error("Invalid document URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Fetching the document failed
    #[error("Failed to fetch API document: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("Fetching '{url}' returned HTTP status {status}")]
    HttpStatus { url: String, status: u16 },

    /// The bytes are neither YAML nor JSON
    #[error("Failed to parse API document: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The document parsed but lacks the structure generation needs
    #[error("Malformed API document: {0}")]
    Structure(String),
}
