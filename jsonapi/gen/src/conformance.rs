//! JSON:API conformance checks for operations.
//!
//! Every operation is classified before any code is generated for it:
//!
//! - `Ok(Conformance::Conformant(shape))` - the operation can be generated
//! - `Ok(Conformance::Skip(reason))` - the operation falls outside the
//!   conventions and is left out without failing the run
//! - `Err(_)` - the operation is conformant in shape but claims something the
//!   generator cannot represent (an unsupported primitive), which is fatal
//!
//! The checks are a closed `match` over [`SchemaNode`], so a new node shape
//! cannot be added without deciding how it conforms.

use std::fmt;

use jsonapi_define::{
    Body, ObjectSchema, Operation, Parameter, ParameterLocation, PathItem, SchemaDocument,
    SchemaNode,
};
use proc_macro2::TokenStream;

use crate::codegen::scalar_type;
use crate::errors::GeneratorError;
use crate::naming::{to_pascal_case, type_name};
use crate::parser::undeclared_path_params;

/// Members a resource object must declare besides `type`, at least one of.
const RESOURCE_MEMBERS: &[&str] = &["id", "attributes", "relationships"];

const DOCUMENT_SUFFIX: &str = "Document";

/// Outcome of a conformance check that did not fail.
#[derive(Debug)]
pub enum Conformance<T> {
    Conformant(T),
    Skip(SkipReason),
}

/// Why an operation was left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingOperationId,
    UndeclaredPathParameter(String),
    UnsupportedLocation {
        name: String,
        location: ParameterLocation,
    },
    DanglingReference(String),
    NonScalarParameter(String),
    NonJsonBody { media_type: String },
    MissingBodySchema,
    NotAnEnvelope(&'static str),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingOperationId => write!(f, "operation has no operationId"),
            SkipReason::UndeclaredPathParameter(name) => {
                write!(f, "path parameter '{}' is not declared", name)
            }
            SkipReason::UnsupportedLocation { name, location } => {
                write!(f, "parameter '{}' is read from the {}", name, location)
            }
            SkipReason::DanglingReference(reference) => {
                write!(f, "reference '{}' does not resolve", reference)
            }
            SkipReason::NonScalarParameter(name) => {
                write!(f, "parameter '{}' is not a scalar", name)
            }
            SkipReason::NonJsonBody { media_type } => {
                write!(f, "body media type '{}' is not JSON", media_type)
            }
            SkipReason::MissingBodySchema => write!(f, "body declares no schema"),
            SkipReason::NotAnEnvelope(why) => write!(f, "body is not a JSON:API document: {}", why),
        }
    }
}

/// A parameter that passed the checks, with its Rust scalar type.
#[derive(Debug)]
pub struct ParameterShape<'a> {
    pub parameter: &'a Parameter,
    /// The scalar (or list element) type.
    pub ty: TokenStream,
    /// True for comma separated lists of scalars.
    pub list: bool,
}

/// A resource object found under `data`.
#[derive(Debug)]
pub struct Resource<'a> {
    /// Emitted type name.
    pub name: String,
    /// The named schema the resource came from, if it was referenced.
    pub schema: Option<&'a str>,
    pub object: &'a ObjectSchema,
}

/// How many resources a document carries.
#[derive(Debug)]
pub enum EnvelopeData<'a> {
    Single(Resource<'a>),
    Collection(Resource<'a>),
}

impl<'a> EnvelopeData<'a> {
    pub fn resource(&self) -> &Resource<'a> {
        match self {
            EnvelopeData::Single(resource) | EnvelopeData::Collection(resource) => resource,
        }
    }
}

/// A request or response body in JSON:API document shape.
#[derive(Debug)]
pub struct Envelope<'a> {
    /// The envelope name.
    pub name: String,
    /// The named schema the body came from, if it was referenced.
    pub schema: Option<&'a str>,
    pub data: EnvelopeData<'a>,
}

impl Envelope<'_> {
    /// Name of the generated document type.
    pub fn document_name(&self) -> String {
        document_name(&self.name)
    }
}

/// The envelope name with a `Document` suffix, unless it already ends in one.
///
/// ```
/// use jsonapi_gen::conformance::document_name;
///
/// assert_eq!(document_name("ArticleEnvelope"), "ArticleEnvelopeDocument");
/// assert_eq!(document_name("ArticleDocument"), "ArticleDocument");
/// ```
pub fn document_name(envelope: &str) -> String {
    if envelope.ends_with(DOCUMENT_SUFFIX) {
        envelope.to_string()
    } else {
        format!("{}{}", envelope, DOCUMENT_SUFFIX)
    }
}

/// Name of an inline single resource, kept apart from the document name.
fn inline_resource_name(envelope: &str) -> String {
    match envelope.strip_suffix(DOCUMENT_SUFFIX) {
        Some("") => format!("{}Data", envelope),
        Some(stem) => stem.to_string(),
        None => envelope.to_string(),
    }
}

/// Everything the resolver and synthesizer need about a conformant operation.
#[derive(Debug)]
pub struct OperationShape<'a> {
    pub id: &'a str,
    pub parameters: Vec<ParameterShape<'a>>,
    pub request: Option<Envelope<'a>>,
    pub response: Option<Envelope<'a>>,
}

/// Returns true if an object looks like a JSON:API resource object.
///
/// ```
/// use jsonapi_define::{ObjectSchema, Primitive, SchemaNode};
/// use jsonapi_gen::conformance::is_resource;
///
/// let mut object = ObjectSchema::default();
/// object.properties.insert("type".into(), SchemaNode::Primitive(Primitive::new("string")));
/// assert!(!is_resource(&object));
///
/// object.properties.insert("id".into(), SchemaNode::Primitive(Primitive::new("string")));
/// assert!(is_resource(&object));
/// ```
pub fn is_resource(object: &ObjectSchema) -> bool {
    object.declares_any(&["type"]) && object.declares_any(RESOURCE_MEMBERS)
}

macro_rules! conform {
    ($expr:expr) => {
        match $expr? {
            Conformance::Conformant(value) => value,
            Conformance::Skip(reason) => return Ok(Conformance::Skip(reason)),
        }
    };
}

/// Checks one operation against the JSON:API conventions.
///
/// ## Errors
///
/// Returns `GeneratorError::UnsupportedPrimitive` if a parameter's scalar has
/// no Rust counterpart, and `GeneratorError::InvalidIdentifier` if a schema
/// name cannot become a type name.
pub fn check_operation<'a>(
    doc: &'a SchemaDocument,
    item: &'a PathItem,
    operation: &'a Operation,
) -> Result<Conformance<OperationShape<'a>>, GeneratorError> {
    let Some(id) = operation.id.as_deref() else {
        return Ok(Conformance::Skip(SkipReason::MissingOperationId));
    };

    let declared: Vec<&str> = operation
        .parameters
        .iter()
        .filter(|p| p.location == ParameterLocation::Path)
        .map(|p| p.name.as_str())
        .collect();
    if let Some(missing) = undeclared_path_params(&item.path, &declared).first() {
        return Ok(Conformance::Skip(SkipReason::UndeclaredPathParameter(
            missing.to_string(),
        )));
    }

    let mut parameters = Vec::with_capacity(operation.parameters.len());
    for parameter in &operation.parameters {
        parameters.push(conform!(check_parameter(doc, id, parameter)));
    }

    let op_name = to_pascal_case(id);
    let request = match &operation.request_body {
        Some(body) => Some(conform!(check_body(doc, body, format!("{}Request", op_name)))),
        None => None,
    };
    let response = match operation.success_response().and_then(|r| r.body.as_ref()) {
        Some(body) => Some(conform!(check_body(doc, body, format!("{}Response", op_name)))),
        None => None,
    };

    Ok(Conformance::Conformant(OperationShape {
        id,
        parameters,
        request,
        response,
    }))
}

fn check_parameter<'a>(
    doc: &'a SchemaDocument,
    operation_id: &str,
    parameter: &'a Parameter,
) -> Result<Conformance<ParameterShape<'a>>, GeneratorError> {
    if parameter.location == ParameterLocation::Cookie {
        return Ok(Conformance::Skip(SkipReason::UnsupportedLocation {
            name: parameter.name.clone(),
            location: parameter.location,
        }));
    }

    let context = format!("{}.{}", operation_id, parameter.name);
    let Some((_, node)) = doc.deref(&parameter.schema) else {
        return Ok(Conformance::Skip(dangling(&parameter.schema)));
    };

    let (primitive, list) = match node {
        SchemaNode::Primitive(primitive) => (primitive, false),
        SchemaNode::Array(element) if parameter.location != ParameterLocation::Path => {
            match doc.deref(element) {
                Some((_, SchemaNode::Primitive(primitive))) => (primitive, true),
                Some(_) => {
                    return Ok(Conformance::Skip(SkipReason::NonScalarParameter(
                        parameter.name.clone(),
                    )));
                }
                None => return Ok(Conformance::Skip(dangling(element))),
            }
        }
        SchemaNode::Array(_) | SchemaNode::Object(_) | SchemaNode::Reference(_) => {
            return Ok(Conformance::Skip(SkipReason::NonScalarParameter(
                parameter.name.clone(),
            )));
        }
    };

    let ty = scalar_type(primitive, &context)?;
    Ok(Conformance::Conformant(ParameterShape {
        parameter,
        ty,
        list,
    }))
}

fn check_body<'a>(
    doc: &'a SchemaDocument,
    body: &'a Body,
    fallback_name: String,
) -> Result<Conformance<Envelope<'a>>, GeneratorError> {
    if !body.is_json() {
        return Ok(Conformance::Skip(SkipReason::NonJsonBody {
            media_type: body.media_type.clone(),
        }));
    }
    let Some(schema) = &body.schema else {
        return Ok(Conformance::Skip(SkipReason::MissingBodySchema));
    };
    check_envelope(doc, schema, fallback_name)
}

/// Checks that a body schema is a JSON:API document with resource data.
pub fn check_envelope<'a>(
    doc: &'a SchemaDocument,
    schema: &'a SchemaNode,
    fallback_name: String,
) -> Result<Conformance<Envelope<'a>>, GeneratorError> {
    let Some((schema_name, node)) = doc.deref(schema) else {
        return Ok(Conformance::Skip(dangling(schema)));
    };

    let envelope = match node {
        SchemaNode::Object(object) => object,
        SchemaNode::Primitive(_) | SchemaNode::Array(_) | SchemaNode::Reference(_) => {
            return Ok(Conformance::Skip(SkipReason::NotAnEnvelope(
                "top level is not an object",
            )));
        }
    };
    let Some(data) = envelope.property("data") else {
        return Ok(Conformance::Skip(SkipReason::NotAnEnvelope(
            "no `data` member",
        )));
    };

    let name = match schema_name {
        Some(schema_name) => type_name(schema_name)?,
        None => fallback_name,
    };

    let Some((data_name, data_node)) = doc.deref(data) else {
        return Ok(Conformance::Skip(dangling(data)));
    };

    let data = match data_node {
        SchemaNode::Object(object) if is_resource(object) => EnvelopeData::Single(Resource {
            name: match data_name {
                Some(schema) => type_name(schema)?,
                None => inline_resource_name(&name),
            },
            schema: data_name,
            object,
        }),
        SchemaNode::Array(item) => {
            let Some((item_name, item_node)) = doc.deref(item) else {
                return Ok(Conformance::Skip(dangling(item)));
            };
            match item_node {
                SchemaNode::Object(object) if is_resource(object) => {
                    EnvelopeData::Collection(Resource {
                        name: match item_name {
                            Some(schema) => type_name(schema)?,
                            None => format!("{}Item", name),
                        },
                        schema: item_name,
                        object,
                    })
                }
                SchemaNode::Object(_)
                | SchemaNode::Primitive(_)
                | SchemaNode::Array(_)
                | SchemaNode::Reference(_) => {
                    return Ok(Conformance::Skip(SkipReason::NotAnEnvelope(
                        "`data` items are not resource objects",
                    )));
                }
            }
        }
        SchemaNode::Object(_) | SchemaNode::Primitive(_) | SchemaNode::Reference(_) => {
            return Ok(Conformance::Skip(SkipReason::NotAnEnvelope(
                "`data` is not a resource object",
            )));
        }
    };

    Ok(Conformance::Conformant(Envelope {
        name,
        schema: schema_name,
        data,
    }))
}

/// Builds the skip reason for a node whose reference chain does not resolve.
fn dangling(node: &SchemaNode) -> SkipReason {
    SkipReason::DanglingReference(node.reference_name().unwrap_or_default().to_string())
}
