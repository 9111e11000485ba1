//! Schema nodes for request/response bodies and parameters.
//!
//! Every JSON-Schema-like definition of the document is reduced to one of four
//! shapes. Code generation matches on these exhaustively, so a shape the
//! generator does not understand can never slip through as an unchecked case.

use indexmap::IndexMap;

/// Prefix of references into `components.schemas`.
pub const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

/// A single type definition from the API document.
///
/// ## Examples
///
/// ```
/// use jsonapi_define::{Primitive, SchemaNode};
///
/// let node = SchemaNode::array(SchemaNode::Primitive(Primitive::new("string")));
/// assert!(matches!(node, SchemaNode::Array(_)));
///
/// let reference = SchemaNode::reference("Article");
/// assert_eq!(reference.reference_name(), Some("Article"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaNode {
    /// A scalar value (`string`, `integer`, `number`, `boolean`, ...).
    Primitive(Primitive),
    /// An object with ordered properties.
    Object(ObjectSchema),
    /// An array of elements.
    Array(Box<SchemaNode>),
    /// A reference to a named schema in `components.schemas`.
    Reference(String),
}

impl SchemaNode {
    /// Creates an array node for the given element.
    pub fn array(element: SchemaNode) -> Self {
        SchemaNode::Array(Box::new(element))
    }

    /// Creates a reference node to the named schema.
    pub fn reference(name: impl Into<String>) -> Self {
        SchemaNode::Reference(name.into())
    }

    /// Returns the referenced schema name for `Reference` nodes.
    pub fn reference_name(&self) -> Option<&str> {
        match self {
            SchemaNode::Reference(name) => Some(name),
            _ => None,
        }
    }

    /// Returns the object schema for `Object` nodes.
    pub fn as_object(&self) -> Option<&ObjectSchema> {
        match self {
            SchemaNode::Object(object) => Some(object),
            _ => None,
        }
    }
}

/// A scalar schema as claimed by the document.
///
/// The kind and format are kept verbatim: deciding whether they can be
/// represented is the generator's job, not the loader's.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Primitive {
    /// The raw `type` member (e.g. "string", "integer").
    pub kind: String,
    /// The raw `format` member (e.g. "date-time", "int32").
    pub format: Option<String>,
    /// String values of an `enum` member, in document order.
    pub enumeration: Vec<String>,
}

impl Primitive {
    /// Creates a primitive of the given kind with no format.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            format: None,
            enumeration: Vec::new(),
        }
    }

    /// Creates a primitive of the given kind and format.
    pub fn with_format(kind: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            format: Some(format.into()),
            enumeration: Vec::new(),
        }
    }
}

/// An object schema with properties in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectSchema {
    /// Property name to schema, in document order.
    pub properties: IndexMap<String, SchemaNode>,
    /// Names listed in the `required` member.
    pub required: Vec<String>,
}

impl ObjectSchema {
    /// Returns the schema of the named property.
    pub fn property(&self, name: &str) -> Option<&SchemaNode> {
        self.properties.get(name)
    }

    /// Returns true if the property is listed as required.
    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    /// Returns true if the object declares any of the given properties.
    pub fn declares_any(&self, names: &[&str]) -> bool {
        names.iter().any(|name| self.properties.contains_key(*name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_name_only_for_references() {
        assert_eq!(SchemaNode::reference("Foo").reference_name(), Some("Foo"));
        assert_eq!(
            SchemaNode::Primitive(Primitive::new("string")).reference_name(),
            None
        );
    }

    #[test]
    fn object_required_lookup() {
        let mut object = ObjectSchema::default();
        object
            .properties
            .insert("id".to_string(), SchemaNode::Primitive(Primitive::new("string")));
        object.required.push("id".to_string());

        assert!(object.is_required("id"));
        assert!(!object.is_required("name"));
        assert!(object.declares_any(&["name", "id"]));
        assert!(!object.declares_any(&["name"]));
    }

    #[test]
    fn with_format_sets_format() {
        let primitive = Primitive::with_format("integer", "int32");
        assert_eq!(primitive.kind, "integer");
        assert_eq!(primitive.format.as_deref(), Some("int32"));
    }
}
