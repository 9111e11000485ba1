//! Per-run generation state.
//!
//! A [`BuildContext`] is created for every `build_schema`/`build_source` call
//! and threaded by `&mut` through the stages. It owns the emission buffer and
//! both deduplication sets, so nothing generated in one run can leak into
//! another.

use std::collections::{HashMap, HashSet};
use std::fmt;

use indexmap::IndexMap;
use jsonapi_define::{HttpMethod, ParameterLocation, SchemaDocument};
use proc_macro2::TokenStream;
use tracing::debug;

use crate::codegen::SUPPORT_TYPES;
use crate::emission::EmissionBuffer;
use crate::errors::GeneratorError;

/// Default name of the handler invocation counter.
pub const DEFAULT_COUNTER_NAME: &str = "jsonapi_handler_invocations_total";

/// The target package of a generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    /// Module path of the generated file (e.g. `crate::api`).
    pub path: String,
    /// Package name, used as the service name in spans and metrics.
    pub name: String,
}

impl Package {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }

    /// Creates a package living at `crate::<name>`.
    ///
    /// ```
    /// use jsonapi_gen::Package;
    ///
    /// let package = Package::from_name("articles");
    /// assert_eq!(package.path, "crate::articles");
    /// ```
    pub fn from_name(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            path: format!("crate::{}", name),
            name,
        }
    }
}

/// Options that shape the generated code but not its structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Metric name the generated handlers increment.
    pub counter_name: String,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            counter_name: DEFAULT_COUNTER_NAME.to_string(),
        }
    }
}

/// Progress of a run through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BuildState {
    Loaded,
    TypesResolved,
    HandlersSynthesized,
    ValidatorsSynthesized,
    Serialized,
}

/// What produced a generated type name, used to tell a repeat visit from a
/// collision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeOrigin {
    /// A named schema in `components.schemas`.
    Schema(String),
    /// An inline object under a property of another type.
    Inline { owner: String, field: String },
    /// The list wrapper of an element type.
    ArrayOf(String),
    /// The document type of an envelope schema in `components.schemas`.
    Document(String),
    /// The document type of an inline request or response body.
    Body { operation: String, envelope: String },
    /// The parameters struct of an operation.
    Params(String),
    /// A fixed support declaration.
    Support,
}

impl fmt::Display for TypeOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeOrigin::Schema(name) => write!(f, "schema '{}'", name),
            TypeOrigin::Inline { owner, field } => {
                write!(f, "inline object '{}' of '{}'", field, owner)
            }
            TypeOrigin::ArrayOf(element) => write!(f, "list of '{}'", element),
            TypeOrigin::Document(schema) => write!(f, "document schema '{}'", schema),
            TypeOrigin::Body {
                operation,
                envelope,
            } => write!(f, "inline body '{}' of operation '{}'", envelope, operation),
            TypeOrigin::Params(operation) => write!(f, "parameters of operation '{}'", operation),
            TypeOrigin::Support => write!(f, "a built-in support type"),
        }
    }
}

/// Result of claiming a type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// The name is new; the caller must emit the type.
    New,
    /// The same origin already claimed the name; nothing to emit.
    Existing,
}

/// One operation parameter after type resolution.
#[derive(Debug, Clone)]
pub struct ResolvedParameter {
    /// Wire name (e.g. `page[size]`).
    pub name: String,
    /// Field name in the params struct.
    pub field: String,
    pub location: ParameterLocation,
    pub required: bool,
    /// Scalar or list element type.
    pub ty: TokenStream,
    pub list: bool,
    pub description: Option<String>,
}

/// A conformant operation with every referenced type emitted.
#[derive(Debug, Clone)]
pub struct ResolvedOperation {
    pub id: String,
    pub method: HttpMethod,
    pub path: String,
    pub summary: Option<String>,
    pub parameters: Vec<ResolvedParameter>,
    /// Document type of the request body.
    pub request: Option<String>,
    /// Document type of the success response body.
    pub response: Option<String>,
}

/// A generated JSON:API document type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentType {
    pub name: String,
    /// The resource type its data must carry, if the schema pins one.
    pub resource_type: Option<String>,
    pub collection: bool,
}

/// Mutable state of one generation run.
pub struct BuildContext<'a> {
    pub document: &'a SchemaDocument,
    pub package: &'a Package,
    pub options: &'a GeneratorOptions,
    pub state: BuildState,
    pub buffer: EmissionBuffer,
    /// Conformant operations in document order, filled by the types stage.
    pub operations: Vec<ResolvedOperation>,
    /// Document types in discovery order.
    pub documents: Vec<DocumentType>,
    /// Resource struct name to its pinned `type` value.
    pub resource_types: HashMap<String, Option<String>>,
    /// Named types whose fields are still being resolved.
    pub in_progress: HashSet<String>,
    /// Schema names currently being followed as aliases.
    pub resolving_aliases: HashSet<String>,
    generated_types: IndexMap<String, TypeOrigin>,
    generated_array_types: HashSet<String>,
}

impl<'a> BuildContext<'a> {
    pub fn new(
        document: &'a SchemaDocument,
        package: &'a Package,
        options: &'a GeneratorOptions,
    ) -> Self {
        let generated_types = SUPPORT_TYPES
            .iter()
            .map(|name| (name.to_string(), TypeOrigin::Support))
            .collect();

        Self {
            document,
            package,
            options,
            state: BuildState::Loaded,
            buffer: EmissionBuffer::new(),
            operations: Vec::new(),
            documents: Vec::new(),
            resource_types: HashMap::new(),
            in_progress: HashSet::new(),
            resolving_aliases: HashSet::new(),
            generated_types,
            generated_array_types: HashSet::new(),
        }
    }

    /// Claims a type name for an origin.
    ///
    /// ## Errors
    ///
    /// Returns `GeneratorError::NamingCollision` if a different origin
    /// already owns the name.
    pub fn claim_type(&mut self, name: &str, origin: TypeOrigin) -> Result<Claim, GeneratorError> {
        match self.generated_types.get(name) {
            Some(existing) if *existing == origin => {
                debug!(name, "Type already generated");
                Ok(Claim::Existing)
            }
            Some(existing) => Err(GeneratorError::NamingCollision {
                identifier: name.to_string(),
                first: existing.to_string(),
                second: origin.to_string(),
            }),
            None => {
                self.generated_types.insert(name.to_string(), origin);
                Ok(Claim::New)
            }
        }
    }

    /// Records a list wrapper for an element type.
    ///
    /// Returns false if the wrapper was already generated.
    pub fn claim_array_type(&mut self, element: &str) -> bool {
        let new = self.generated_array_types.insert(element.to_string());
        if !new {
            debug!(element, "List wrapper already generated");
        }
        new
    }

    /// Returns true if a type with this name was claimed.
    pub fn is_generated(&self, name: &str) -> bool {
        self.generated_types.contains_key(name)
    }

    /// Advances the state, logging the transition.
    pub fn advance(&mut self, state: BuildState) {
        debug!(from = ?self.state, to = ?state, "Build state transition");
        self.state = state;
    }
}
