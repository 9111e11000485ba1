//! Core types of a loaded API document.
//!
//! - [`SchemaDocument`] - The whole document: named schemas and path items
//! - [`PathItem`] - A path template with its operations
//! - [`Operation`] - One HTTP operation with parameters and bodies
//! - [`HttpMethod`] - HTTP method enumeration

use indexmap::IndexMap;
use strum::{Display, EnumIter, EnumString};

use crate::schema::SchemaNode;

/// HTTP methods an OpenAPI path item can declare.
///
/// ## Examples
///
/// ```
/// use std::str::FromStr;
/// use jsonapi_define::HttpMethod;
///
/// let method = HttpMethod::from_str("get").unwrap();
/// assert_eq!(method, HttpMethod::Get);
/// assert_eq!(HttpMethod::Post.to_string(), "POST");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

/// Where a parameter is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

/// A named operation parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// The parameter name as it appears on the wire (e.g. "page[size]").
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub schema: SchemaNode,
    pub description: Option<String>,
}

/// A request or response body for a single media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body {
    /// The selected media type (e.g. "application/vnd.api+json").
    pub media_type: String,
    /// The body schema, if the media type declares one.
    pub schema: Option<SchemaNode>,
}

impl Body {
    /// Returns true if the media type carries JSON.
    ///
    /// ```
    /// use jsonapi_define::Body;
    ///
    /// let body = Body { media_type: "application/vnd.api+json".to_string(), schema: None };
    /// assert!(body.is_json());
    /// ```
    pub fn is_json(&self) -> bool {
        let media = self.media_type.to_ascii_lowercase();
        media == "application/json" || media.ends_with("+json")
    }
}

/// One declared response of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status key as written in the document ("200", "2XX", "default").
    pub status: String,
    pub description: Option<String>,
    pub body: Option<Body>,
}

impl Response {
    /// Returns true for `2xx` statuses, including the `2XX` range key.
    pub fn is_success(&self) -> bool {
        self.status.len() == 3 && self.status.starts_with('2')
    }
}

/// A single HTTP operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// The `operationId`; operations without one cannot be named.
    pub id: Option<String>,
    pub summary: Option<String>,
    pub parameters: Vec<Parameter>,
    pub request_body: Option<Body>,
    /// Responses in document order.
    pub responses: Vec<Response>,
}

impl Operation {
    /// Returns the first successful response in document order.
    pub fn success_response(&self) -> Option<&Response> {
        self.responses.iter().find(|r| r.is_success())
    }
}

/// A path template and the operations declared on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathItem {
    /// The URL path template (e.g. "/articles/{id}").
    pub path: String,
    /// Operations in document order.
    pub operations: IndexMap<HttpMethod, Operation>,
}

/// A loaded OpenAPI v3 document.
///
/// Immutable once loaded. Both maps preserve document order so generation is
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDocument {
    pub title: Option<String>,
    pub version: Option<String>,
    /// `components.schemas`, by name.
    pub schemas: IndexMap<String, SchemaNode>,
    pub paths: Vec<PathItem>,
}

impl SchemaDocument {
    /// Looks up a named schema.
    pub fn schema(&self, name: &str) -> Option<&SchemaNode> {
        self.schemas.get(name)
    }

    /// Iterates every operation with its path and method, in document order.
    pub fn operations(&self) -> impl Iterator<Item = (&PathItem, HttpMethod, &Operation)> {
        self.paths.iter().flat_map(|item| {
            item.operations
                .iter()
                .map(move |(method, operation)| (item, *method, operation))
        })
    }

    /// Follows references until a non-reference node is reached.
    ///
    /// Returns the last schema name passed through (if any) and the node. A
    /// reference cycle or a dangling reference yields `None`.
    ///
    /// ```
    /// use jsonapi_define::{Primitive, SchemaDocument, SchemaNode};
    ///
    /// let mut doc = SchemaDocument::default();
    /// doc.schemas.insert("Id".to_string(), SchemaNode::Primitive(Primitive::new("string")));
    /// doc.schemas.insert("Alias".to_string(), SchemaNode::reference("Id"));
    ///
    /// let alias = SchemaNode::reference("Alias");
/// let (name, node) = doc.deref(&alias).unwrap();
    /// assert_eq!(name, Some("Id"));
    /// assert!(matches!(node, SchemaNode::Primitive(_)));
    /// ```
    pub fn deref<'a>(&'a self, node: &'a SchemaNode) -> Option<(Option<&'a str>, &'a SchemaNode)> {
        let mut current = node;
        let mut name = None;
        let mut hops = 0;
        while let SchemaNode::Reference(target) = current {
            if hops > self.schemas.len() {
                return None;
            }
            let (key, next) = self.schemas.get_key_value(target.as_str())?;
            name = Some(key.as_str());
            current = next;
            hops += 1;
        }
        Some((name, current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Primitive;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn http_method_parses_lowercase_keys() {
        assert_eq!(HttpMethod::from_str("patch").unwrap(), HttpMethod::Patch);
        assert!(HttpMethod::from_str("parameters").is_err());
        assert_eq!(HttpMethod::iter().count(), 8);
    }

    #[test]
    fn parameter_location_round_trips_display() {
        let location = ParameterLocation::from_str("header").unwrap();
        assert_eq!(location, ParameterLocation::Header);
        assert_eq!(location.to_string(), "header");
    }

    #[test]
    fn success_response_is_first_2xx() {
        let operation = Operation {
            id: Some("op".to_string()),
            summary: None,
            parameters: vec![],
            request_body: None,
            responses: vec![
                Response {
                    status: "default".to_string(),
                    description: None,
                    body: None,
                },
                Response {
                    status: "201".to_string(),
                    description: None,
                    body: None,
                },
                Response {
                    status: "200".to_string(),
                    description: None,
                    body: None,
                },
            ],
        };

        assert_eq!(operation.success_response().unwrap().status, "201");
    }

    #[test]
    fn deref_detects_reference_cycles() {
        let mut doc = SchemaDocument::default();
        doc.schemas
            .insert("A".to_string(), SchemaNode::reference("B"));
        doc.schemas
            .insert("B".to_string(), SchemaNode::reference("A"));

        assert!(doc.deref(&SchemaNode::reference("A")).is_none());
    }

    #[test]
    fn deref_dangling_reference_is_none() {
        let doc = SchemaDocument::default();
        assert!(doc.deref(&SchemaNode::reference("Missing")).is_none());
    }

    #[test]
    fn deref_plain_node_has_no_name() {
        let doc = SchemaDocument::default();
        let node = SchemaNode::Primitive(Primitive::new("boolean"));
        let (name, resolved) = doc.deref(&node).unwrap();
        assert!(name.is_none());
        assert_eq!(resolved, &node);
    }

    #[test]
    fn body_json_detection() {
        let json = Body {
            media_type: "application/json".to_string(),
            schema: None,
        };
        let form = Body {
            media_type: "multipart/form-data".to_string(),
            schema: None,
        };
        assert!(json.is_json());
        assert!(!form.is_json());
    }
}
