//! Convenient re-exports for working with loaded API documents.
//!
//! ```
//! use jsonapi_define::prelude::*;
//!
//! let doc = SchemaDocument::default();
//! assert!(doc.operations().next().is_none());
//! ```

pub use crate::error::LoadError;
pub use crate::schema::{ObjectSchema, Primitive, SchemaNode};
pub use crate::types::{
    Body, HttpMethod, Operation, Parameter, ParameterLocation, PathItem, Response, SchemaDocument,
};
