//! Token-level building blocks shared by the stages.
//!
//! ## Submodules
//!
//! - [`module_docs`] - Package-level `//!` documentation and doc-line helpers
//! - [`scalar`] - Maps primitive schemas to Rust types
//! - [`support`] - The fixed declarations every generated file starts with
//!
//! ## Output Format
//!
//! All generators return `proc_macro2::TokenStream`, which is then:
//! - Validated with `syn::parse2` to ensure correctness
//! - Formatted with `prettyplease` for consistent style
//!
//! See [`crate::output`] for the validation and file writing logic.

pub mod module_docs;
pub mod scalar;
pub mod support;

pub use module_docs::{ModuleDocBuilder, doc_comment};
pub use scalar::scalar_type;
pub use support::{SUPPORT_TYPES, generate_support};
