//! Error types for the jsonapi generator.

use jsonapi_define::LoadError;
use thiserror::Error;

/// Errors that can occur during code generation.
///
/// Every variant is fatal: the run stops at the first one and no output is
/// produced. Operations that merely fall outside the JSON:API conventions are
/// not errors; they are skipped (see [`crate::conformance`]).
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// Failed to load or parse the API document
    #[error(transparent)]
    Load(#[from] LoadError),

    /// A schema claims a primitive kind that has no Rust counterpart.
    #[error("Unsupported primitive in '{schema}': type '{kind}'{}", format_suffix(.format))]
    UnsupportedPrimitive {
        /// Where the primitive was found (schema, field or parameter).
        schema: String,
        kind: String,
        format: Option<String>,
    },

    /// A reference inside a generated type points nowhere.
    #[error("Unresolved reference '{reference}' in {context}")]
    UnresolvedReference { reference: String, context: String },

    /// Two distinct operations or types map to the same emitted identifier.
    #[error("Naming collision on '{identifier}': {first} and {second} both produce it")]
    NamingCollision {
        /// The emitted identifier both sources produce.
        identifier: String,
        /// Description of the source that claimed the identifier first.
        first: String,
        /// Description of the source that collided with it.
        second: String,
    },

    /// A name cannot be turned into a Rust identifier.
    #[error("Invalid identifier '{name}': {reason}")]
    InvalidIdentifier { name: String, reason: String },

    /// The assembled declarations do not form a valid Rust file
    #[error("Failed to serialize generated code: {0}")]
    Serialization(String),

    /// Failed to write output file
    #[error("Failed to write output file '{path}': {source}")]
    WriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

fn format_suffix(format: &Option<String>) -> String {
    format
        .as_ref()
        .map(|f| format!(" with format '{}'", f))
        .unwrap_or_default()
}
