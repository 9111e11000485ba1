//! JSON:API generator document model.
//!
//! This crate provides the in-memory representation of an OpenAPI v3 document
//! as consumed by the `jsonapi-gen` code generator, plus the loader that builds
//! it from a file, a URL, or raw YAML/JSON bytes.
//!
//! ## Core Types
//!
//! - [`SchemaDocument`] - Named schemas (`components.schemas`) and path items
//! - [`SchemaNode`] - A closed variant over primitive, object, array and reference
//! - [`PathItem`] - A path template with operations keyed by [`HttpMethod`]
//! - [`Operation`] - Identifier, [`Parameter`]s, request body and [`Response`]s
//! - [`LoadError`] - Everything that can go wrong before generation starts
//!
//! ## Examples
//!
//! ```
//! use jsonapi_define::{SchemaDocument, SchemaNode};
//!
//! let yaml = br#"
//! openapi: 3.0.0
//! paths:
//!   /articles:
//!     get:
//!       operationId: listArticles
//! components:
//!   schemas:
//!     Title:
//!       type: string
//! "#;
//!
//! let doc = SchemaDocument::from_slice(yaml).unwrap();
//! assert_eq!(doc.paths.len(), 1);
//! assert!(matches!(doc.schema("Title"), Some(SchemaNode::Primitive(_))));
//! ```

pub mod error;
pub mod loader;
pub mod prelude;
pub mod schema;
pub mod types;

pub use error::LoadError;
pub use loader::{load_source, parse_document};
pub use schema::{ObjectSchema, Primitive, SchemaNode};
pub use types::{
    Body, HttpMethod, Operation, Parameter, ParameterLocation, PathItem, Response, SchemaDocument,
};

impl SchemaDocument {
    /// Parses YAML or JSON bytes into a document.
    ///
    /// ## Errors
    ///
    /// Returns `LoadError` if the bytes are not a well-formed OpenAPI 3.x document.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, LoadError> {
        loader::parse_slice(bytes)
    }
}
