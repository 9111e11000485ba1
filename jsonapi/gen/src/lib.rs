//! JSON:API code generator library.
//!
//! This crate turns an OpenAPI v3 document loaded by `jsonapi-define` into a
//! single Rust source file for a JSON:API service. The generated file
//! contains:
//!
//! - Serde types for every schema reachable from a conformant operation
//! - A `<Op>Params` struct per operation with a validating `extract` function
//! - A `<op>_handler` function per operation, instrumented with a tracing span
//!   and an invocation counter, delegating to a `Service` trait method
//! - A `ROUTES` table for wiring the handlers into a router
//! - `Validate` implementations checking resource `type` members
//!
//! Operations the generator cannot represent (no `operationId`, non-JSON
//! bodies, bodies that are not JSON:API envelopes, cookie parameters) are
//! skipped rather than failing the run.
//!
//! ## Modules
//!
//! - [`build`] - The [`Generator`] and its [`Stage`] pipeline
//! - [`resolver`] - Type resolution for schemas and envelopes
//! - [`handlers`] - Params structs, handlers, `Service` and `ROUTES`
//! - [`validators`] - `Validate` implementations for document types
//! - [`conformance`] - Decides which operations can be generated
//! - [`codegen`] - Shared token builders (support code, scalars, docs)
//! - [`output`] - Validation, formatting and atomic file writing
//! - [`errors`] - Error types for the generator
//!
//! ## Example Usage
//!
//! ```no_run
//! use jsonapi_gen::{Generator, Package};
//!
//! let package = Package::from_name("blog");
//! let source = Generator::new()
//!     .build_source("openapi/blog.yaml", &package)
//!     .unwrap();
//! println!("{}", source);
//! ```
//!
//! ## Generated Code Structure
//!
//! For an operation `getArticle` returning an `Article` resource:
//!
//! ```text
//! pub struct Article { pub kind: String, pub id: String, ... }
//! pub struct ArticleDocument { pub data: Article }
//!
//! pub struct GetArticleParams { pub id: String }
//! pub fn get_article_handler<S, R>(service: &S, request: &R)
//!     -> Result<ArticleDocument, HandlerError>;
//!
//! pub trait Service: Send + Sync {
//!     fn get_article(&self, params: GetArticleParams)
//!         -> Result<ArticleDocument, HandlerError>;
//! }
//!
//! pub const ROUTES: &[Route] = &[Route { method: "GET", path: "/articles/{id}", .. }];
//! ```

pub mod build;
pub mod codegen;
pub mod conformance;
pub mod context;
pub mod emission;
pub mod errors;
pub mod handlers;
pub mod naming;
pub mod output;
pub mod parser;
pub mod resolver;
pub mod validation;
pub mod validators;

pub use build::{Generated, Generator, Stage};
pub use context::{BuildContext, BuildState, GeneratorOptions, Package};
pub use errors::GeneratorError;
