//! Loading API documents from files, URLs or raw bytes.
//!
//! Every source funnels into [`parse_document`], so a document fetched over
//! HTTP and the same document read from disk produce identical values.
//!
//! The loader only checks the structure code generation relies on. Members it
//! does not understand are ignored; malformed parameters and operations are
//! dropped with a warning rather than failing the whole document.

use std::fs;
use std::str::FromStr;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::LoadError;
use crate::schema::{ObjectSchema, Primitive, SCHEMA_REF_PREFIX, SchemaNode};
use crate::types::{
    Body, HttpMethod, Operation, Parameter, ParameterLocation, PathItem, Response, SchemaDocument,
};

const PARAMETER_REF_PREFIX: &str = "#/components/parameters/";
const REQUEST_BODY_REF_PREFIX: &str = "#/components/requestBodies/";
const RESPONSE_REF_PREFIX: &str = "#/components/responses/";

/// Media types tried in order when an operation offers several.
const PREFERRED_MEDIA_TYPES: &[&str] = &["application/vnd.api+json", "application/json"];

/// Loads a document from a URL (`http://` or `https://`) or a file path.
///
/// ## Errors
///
/// Returns `LoadError` if the source cannot be read or fetched, or if the
/// bytes do not form an OpenAPI v3 document.
#[instrument]
pub fn load_source(source: &str) -> Result<SchemaDocument, LoadError> {
    let bytes = if source.starts_with("http://") || source.starts_with("https://") {
        let url = Url::parse(source).map_err(|e| LoadError::InvalidUrl {
            url: source.to_string(),
            source: e,
        })?;
        fetch(&url)?
    } else {
        fs::read(source).map_err(|e| LoadError::Io {
            path: source.to_string(),
            source: e,
        })?
    };

    parse_slice(&bytes)
}

fn fetch(url: &Url) -> Result<Vec<u8>, LoadError> {
    debug!(%url, "Fetching API document");
    let response = reqwest::blocking::get(url.as_str())?;
    let status = response.status();
    if !status.is_success() {
        return Err(LoadError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    Ok(response.bytes()?.to_vec())
}

/// Parses YAML or JSON bytes into a document.
#[instrument(skip(bytes), fields(len = bytes.len()))]
pub fn parse_slice(bytes: &[u8]) -> Result<SchemaDocument, LoadError> {
    let yaml: serde_yaml::Value = serde_yaml::from_slice(bytes)?;
    parse_document(&yaml_to_json(yaml))
}

/// Converts a YAML value into JSON, stringifying non-string mapping keys.
///
/// YAML allows `200:` as an integer key, while every OpenAPI key is a string.
fn yaml_to_json(value: serde_yaml::Value) -> Value {
    use serde_yaml::Value as Yaml;

    match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => Value::Array(items.into_iter().map(yaml_to_json).collect()),
        Yaml::Mapping(mapping) => {
            let mut map = Map::new();
            for (key, value) in mapping {
                let key = match key {
                    Yaml::String(s) => s,
                    Yaml::Number(n) => n.to_string(),
                    Yaml::Bool(b) => b.to_string(),
                    other => match yaml_to_json(other) {
                        Value::String(s) => s,
                        json => json.to_string(),
                    },
                };
                map.insert(key, yaml_to_json(value));
            }
            Value::Object(map)
        }
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

/// Converts a parsed JSON value into a [`SchemaDocument`].
///
/// ## Errors
///
/// Returns `LoadError::Structure` if the root is not a mapping, the document
/// is not OpenAPI 3.x, or `paths` / `components.schemas` are not mappings.
pub fn parse_document(value: &Value) -> Result<SchemaDocument, LoadError> {
    let root = value
        .as_object()
        .ok_or_else(|| LoadError::Structure("document root must be a mapping".to_string()))?;

    check_version(root)?;

    let components = Components::from_root(root)?;

    let mut schemas = IndexMap::new();
    if let Some(defs) = components.schemas {
        for (name, schema) in defs {
            schemas.insert(name.clone(), parse_schema(schema));
        }
    }

    let mut paths = Vec::new();
    match root.get("paths") {
        None | Some(Value::Null) => {}
        Some(Value::Object(entries)) => {
            for (path, item) in entries {
                match item.as_object() {
                    Some(item) => paths.push(parse_path_item(path, item, &components)),
                    None => warn!(%path, "Ignoring path item that is not a mapping"),
                }
            }
        }
        Some(_) => return Err(LoadError::Structure("`paths` must be a mapping".to_string())),
    }

    let info = root.get("info");
    let document = SchemaDocument {
        title: info
            .and_then(|i| i.get("title"))
            .and_then(Value::as_str)
            .map(str::to_string),
        version: info
            .and_then(|i| i.get("version"))
            .and_then(Value::as_str)
            .map(str::to_string),
        schemas,
        paths,
    };

    debug!(
        schemas = document.schemas.len(),
        paths = document.paths.len(),
        "Parsed API document"
    );

    Ok(document)
}

fn check_version(root: &Map<String, Value>) -> Result<(), LoadError> {
    let version = match root.get("openapi") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ if root.contains_key("swagger") => {
            return Err(LoadError::Structure(
                "Swagger 2.0 documents are not supported (expected OpenAPI 3.x)".to_string(),
            ));
        }
        _ => {
            return Err(LoadError::Structure(
                "missing `openapi` version member".to_string(),
            ));
        }
    };

    if version == "3" || version.starts_with("3.") {
        Ok(())
    } else {
        Err(LoadError::Structure(format!(
            "OpenAPI version {} not supported (expected 3.x)",
            version
        )))
    }
}

/// Reusable component sections that operations may reference.
struct Components<'a> {
    schemas: Option<&'a Map<String, Value>>,
    parameters: Option<&'a Map<String, Value>>,
    request_bodies: Option<&'a Map<String, Value>>,
    responses: Option<&'a Map<String, Value>>,
}

impl<'a> Components<'a> {
    fn from_root(root: &'a Map<String, Value>) -> Result<Self, LoadError> {
        let components = root.get("components").and_then(Value::as_object);
        let section = |name: &str| components.and_then(|c| c.get(name));

        let schemas = match section("schemas") {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(map),
            Some(_) => {
                return Err(LoadError::Structure(
                    "`components.schemas` must be a mapping".to_string(),
                ));
            }
        };

        Ok(Self {
            schemas,
            parameters: section("parameters").and_then(Value::as_object),
            request_bodies: section("requestBodies").and_then(Value::as_object),
            responses: section("responses").and_then(Value::as_object),
        })
    }

    /// Follows a `$ref` into the given component section, if present.
    fn follow<'v>(
        section: Option<&'a Map<String, Value>>,
        prefix: &str,
        value: &'v Value,
    ) -> Option<&'v Value>
    where
        'a: 'v,
    {
        match value.get("$ref").and_then(Value::as_str) {
            Some(reference) => {
                let name = unescape_pointer(reference.strip_prefix(prefix)?);
                section?.get(&name)
            }
            None => Some(value),
        }
    }
}

/// Parses a JSON-Schema-like value into a [`SchemaNode`].
///
/// ## Examples
///
/// ```
/// use jsonapi_define::{SchemaNode, loader::parse_schema};
///
/// let node = parse_schema(&serde_json::json!({ "$ref": "#/components/schemas/Article" }));
/// assert_eq!(node, SchemaNode::reference("Article"));
/// ```
pub fn parse_schema(value: &Value) -> SchemaNode {
    let Some(map) = value.as_object() else {
        return SchemaNode::Object(ObjectSchema::default());
    };

    if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
        let name = reference
            .strip_prefix(SCHEMA_REF_PREFIX)
            .map(unescape_pointer)
            .unwrap_or_else(|| reference.to_string());
        return SchemaNode::Reference(name);
    }

    match schema_type(map) {
        Some("object") => parse_object(map),
        Some("array") => parse_array(map),
        Some(kind) => SchemaNode::Primitive(Primitive {
            kind: kind.to_string(),
            format: map.get("format").and_then(Value::as_str).map(str::to_string),
            enumeration: map
                .get("enum")
                .and_then(Value::as_array)
                .map(|values| {
                    values
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        }),
        None if map.contains_key("properties") => parse_object(map),
        None if map.contains_key("items") => parse_array(map),
        None => SchemaNode::Object(ObjectSchema::default()),
    }
}

/// Returns the declared type, skipping `null` in OpenAPI 3.1 type lists.
fn schema_type(map: &Map<String, Value>) -> Option<&str> {
    match map.get("type")? {
        Value::String(s) => Some(s.as_str()),
        Value::Array(kinds) => kinds
            .iter()
            .filter_map(Value::as_str)
            .find(|kind| *kind != "null"),
        _ => None,
    }
}

fn parse_object(map: &Map<String, Value>) -> SchemaNode {
    let properties = map
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| {
            props
                .iter()
                .map(|(name, schema)| (name.clone(), parse_schema(schema)))
                .collect()
        })
        .unwrap_or_default();

    let required = map
        .get("required")
        .and_then(Value::as_array)
        .map(|names| {
            names
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    SchemaNode::Object(ObjectSchema {
        properties,
        required,
    })
}

fn parse_array(map: &Map<String, Value>) -> SchemaNode {
    let element = map
        .get("items")
        .map(parse_schema)
        .unwrap_or_else(|| SchemaNode::Object(ObjectSchema::default()));
    SchemaNode::array(element)
}

fn parse_path_item(path: &str, item: &Map<String, Value>, components: &Components<'_>) -> PathItem {
    let shared = parse_parameters(item.get("parameters"), components);

    let mut operations = IndexMap::new();
    for (key, value) in item {
        let Ok(method) = HttpMethod::from_str(key) else {
            continue;
        };
        match value.as_object() {
            Some(operation) => {
                operations.insert(method, parse_operation(operation, &shared, components));
            }
            None => warn!(%path, %method, "Ignoring operation that is not a mapping"),
        }
    }

    PathItem {
        path: path.to_string(),
        operations,
    }
}

fn parse_operation(
    operation: &Map<String, Value>,
    shared: &[Parameter],
    components: &Components<'_>,
) -> Operation {
    let mut parameters = shared.to_vec();
    for parameter in parse_parameters(operation.get("parameters"), components) {
        match parameters
            .iter_mut()
            .find(|p| p.name == parameter.name && p.location == parameter.location)
        {
            Some(existing) => *existing = parameter,
            None => parameters.push(parameter),
        }
    }

    let request_body = operation
        .get("requestBody")
        .and_then(|body| {
            Components::follow(components.request_bodies, REQUEST_BODY_REF_PREFIX, body)
        })
        .and_then(|body| body.get("content"))
        .and_then(select_body);

    let responses = operation
        .get("responses")
        .and_then(Value::as_object)
        .map(|responses| {
            responses
                .iter()
                .filter_map(|(status, response)| {
                    let response =
                        Components::follow(components.responses, RESPONSE_REF_PREFIX, response)?;
                    Some(Response {
                        status: status.clone(),
                        description: text(response, "description"),
                        body: response.get("content").and_then(select_body),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Operation {
        id: text_map(operation, "operationId"),
        summary: text_map(operation, "summary").or_else(|| text_map(operation, "description")),
        parameters,
        request_body,
        responses,
    }
}

fn parse_parameters(value: Option<&Value>, components: &Components<'_>) -> Vec<Parameter> {
    let Some(list) = value.and_then(Value::as_array) else {
        return Vec::new();
    };

    list.iter()
        .filter_map(|entry| {
            let Some(resolved) =
                Components::follow(components.parameters, PARAMETER_REF_PREFIX, entry)
            else {
                warn!(reference = ?entry.get("$ref"), "Dropping unresolvable parameter reference");
                return None;
            };
            parse_parameter(resolved)
        })
        .collect()
}

fn parse_parameter(value: &Value) -> Option<Parameter> {
    let name = text(value, "name")?;
    let location = match value
        .get("in")
        .and_then(Value::as_str)
        .map(ParameterLocation::from_str)
    {
        Some(Ok(location)) => location,
        _ => {
            warn!(%name, "Dropping parameter without a valid `in` member");
            return None;
        }
    };

    let schema = value
        .get("schema")
        .map(parse_schema)
        .unwrap_or_else(|| SchemaNode::Primitive(Primitive::new("string")));

    let required = location == ParameterLocation::Path
        || value.get("required").and_then(Value::as_bool).unwrap_or(false);

    Some(Parameter {
        name,
        location,
        required,
        schema,
        description: text(value, "description"),
    })
}

/// Picks the body for the preferred JSON media type out of a `content` map.
fn select_body(content: &Value) -> Option<Body> {
    let content = content.as_object()?;

    let media_type = PREFERRED_MEDIA_TYPES
        .iter()
        .find(|preferred| content.contains_key(**preferred))
        .map(|preferred| preferred.to_string())
        .or_else(|| {
            content
                .keys()
                .find(|key| key.to_ascii_lowercase().ends_with("+json"))
                .cloned()
        })
        .or_else(|| content.keys().next().cloned())?;

    let schema = content
        .get(&media_type)
        .and_then(|media| media.get("schema"))
        .map(parse_schema);

    Some(Body { media_type, schema })
}

fn text(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn text_map(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Reverses JSON pointer escaping (`~1` is `/`, `~0` is `~`).
fn unescape_pointer(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal(paths: Value, schemas: Value) -> Value {
        json!({
            "openapi": "3.0.3",
            "info": { "title": "Test API", "version": "1.0.0" },
            "paths": paths,
            "components": { "schemas": schemas }
        })
    }

    // === structure checks ===

    #[test]
    fn rejects_non_mapping_root() {
        let result = parse_document(&json!(["not", "a", "document"]));
        assert!(matches!(result, Err(LoadError::Structure(_))));
    }

    #[test]
    fn rejects_swagger_2() {
        let result = parse_document(&json!({ "swagger": "2.0", "paths": {} }));
        match result {
            Err(LoadError::Structure(msg)) => assert!(msg.contains("Swagger 2.0")),
            other => panic!("Expected structure error, got {:?}", other),
        }
    }

    #[test]
    fn rejects_paths_that_are_not_a_mapping() {
        let doc = json!({ "openapi": "3.0.0", "paths": ["/a"] });
        assert!(matches!(
            parse_document(&doc),
            Err(LoadError::Structure(_))
        ));
    }

    #[test]
    fn accepts_missing_paths_and_components() {
        let doc = parse_document(&json!({ "openapi": "3.1.0" })).unwrap();
        assert!(doc.paths.is_empty());
        assert!(doc.schemas.is_empty());
    }

    #[test]
    fn reads_title_and_version() {
        let doc = parse_document(&minimal(json!({}), json!({}))).unwrap();
        assert_eq!(doc.title.as_deref(), Some("Test API"));
        assert_eq!(doc.version.as_deref(), Some("1.0.0"));
    }

    // === schema parsing ===

    #[test]
    fn parses_schema_shapes() {
        let doc = parse_document(&minimal(
            json!({}),
            json!({
                "Name": { "type": "string", "enum": ["a", "b"] },
                "Tags": { "type": "array", "items": { "type": "string" } },
                "Person": {
                    "properties": {
                        "name": { "$ref": "#/components/schemas/Name" },
                        "born": { "type": "string", "format": "date" }
                    },
                    "required": ["name"]
                },
                "Anything": { "oneOf": [{ "type": "string" }, { "type": "integer" }] }
            }),
        ))
        .unwrap();

        match doc.schema("Name").unwrap() {
            SchemaNode::Primitive(p) => {
                assert_eq!(p.kind, "string");
                assert_eq!(p.enumeration, vec!["a", "b"]);
            }
            other => panic!("Expected primitive, got {:?}", other),
        }

        assert!(matches!(doc.schema("Tags").unwrap(), SchemaNode::Array(_)));

        let person = doc.schema("Person").unwrap().as_object().unwrap();
        assert_eq!(
            person.property("name"),
            Some(&SchemaNode::reference("Name"))
        );
        assert!(person.is_required("name"));

        let anything = doc.schema("Anything").unwrap().as_object().unwrap();
        assert!(anything.properties.is_empty());
    }

    #[test]
    fn properties_keep_document_order() {
        let node = parse_schema(&json!({
            "type": "object",
            "properties": {
                "zeta": { "type": "string" },
                "alpha": { "type": "string" },
                "mid": { "type": "string" }
            }
        }));
        let names: Vec<_> = node.as_object().unwrap().properties.keys().cloned().collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn nullable_type_list_picks_non_null_kind() {
        let node = parse_schema(&json!({ "type": ["null", "integer"] }));
        assert_eq!(node, SchemaNode::Primitive(Primitive::new("integer")));
    }

    #[test]
    fn unknown_primitive_kind_is_kept_verbatim() {
        let node = parse_schema(&json!({ "type": "file" }));
        assert_eq!(node, SchemaNode::Primitive(Primitive::new("file")));
    }

    #[test]
    fn escaped_reference_names_are_unescaped() {
        let node = parse_schema(&json!({ "$ref": "#/components/schemas/a~1b" }));
        assert_eq!(node, SchemaNode::reference("a/b"));
    }

    // === operations ===

    #[test]
    fn merges_path_level_parameters() {
        let doc = parse_document(&minimal(
            json!({
                "/articles/{id}": {
                    "parameters": [
                        { "name": "id", "in": "path", "schema": { "type": "string" } },
                        { "name": "include", "in": "query", "schema": { "type": "string" } }
                    ],
                    "get": {
                        "operationId": "getArticle",
                        "parameters": [
                            { "name": "include", "in": "query", "required": true,
                              "schema": { "type": "string" } },
                            { "name": "X-Trace", "in": "header", "schema": { "type": "string" } }
                        ]
                    }
                }
            }),
            json!({}),
        ))
        .unwrap();

        let (_, method, operation) = doc.operations().next().unwrap();
        assert_eq!(method, HttpMethod::Get);
        let names: Vec<_> = operation.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["id", "include", "X-Trace"]);
        assert!(operation.parameters[0].required, "path params are always required");
        assert!(operation.parameters[1].required, "operation level overrides path level");
    }

    #[test]
    fn resolves_component_parameters() {
        let doc = parse_document(&json!({
            "openapi": "3.0.0",
            "paths": {
                "/articles": {
                    "get": {
                        "operationId": "listArticles",
                        "parameters": [
                            { "$ref": "#/components/parameters/PageSize" },
                            { "$ref": "#/components/parameters/Missing" }
                        ]
                    }
                }
            },
            "components": {
                "parameters": {
                    "PageSize": {
                        "name": "page[size]",
                        "in": "query",
                        "schema": { "type": "integer", "format": "int32" }
                    }
                }
            }
        }))
        .unwrap();

        let (_, _, operation) = doc.operations().next().unwrap();
        assert_eq!(operation.parameters.len(), 1);
        assert_eq!(operation.parameters[0].name, "page[size]");
        assert_eq!(operation.parameters[0].location, ParameterLocation::Query);
    }

    #[test]
    fn selects_json_api_media_type_first() {
        let doc = parse_document(&minimal(
            json!({
                "/articles": {
                    "post": {
                        "operationId": "createArticle",
                        "requestBody": {
                            "content": {
                                "application/json": { "schema": { "type": "string" } },
                                "application/vnd.api+json": {
                                    "schema": { "$ref": "#/components/schemas/Article" }
                                }
                            }
                        },
                        "responses": {
                            "default": { "description": "error" },
                            "201": {
                                "description": "created",
                                "content": {
                                    "application/vnd.api+json": {
                                        "schema": { "$ref": "#/components/schemas/Article" }
                                    }
                                }
                            }
                        }
                    }
                }
            }),
            json!({ "Article": { "type": "object" } }),
        ))
        .unwrap();

        let (_, _, operation) = doc.operations().next().unwrap();
        let body = operation.request_body.as_ref().unwrap();
        assert_eq!(body.media_type, "application/vnd.api+json");
        assert_eq!(body.schema, Some(SchemaNode::reference("Article")));

        let success = operation.success_response().unwrap();
        assert_eq!(success.status, "201");
        assert!(success.body.is_some());
    }

    #[test]
    fn skips_non_method_keys_in_path_items() {
        let doc = parse_document(&minimal(
            json!({
                "/health": {
                    "summary": "health",
                    "servers": [],
                    "get": { "operationId": "health" }
                }
            }),
            json!({}),
        ))
        .unwrap();

        assert_eq!(doc.paths[0].operations.len(), 1);
    }

    // === byte parsing ===

    #[test]
    fn parses_yaml_with_integer_status_keys() {
        let yaml = br#"
openapi: 3.0.0
info:
  title: Yaml API
  version: "2"
paths:
  /ping:
    get:
      operationId: ping
      responses:
        200:
          description: ok
"#;
        let doc = parse_slice(yaml).unwrap();
        let (_, _, operation) = doc.operations().next().unwrap();
        assert_eq!(operation.responses[0].status, "200");
        assert_eq!(doc.title.as_deref(), Some("Yaml API"));
    }

    #[test]
    fn parses_json_bytes() {
        let bytes = serde_json::to_vec(&minimal(json!({}), json!({}))).unwrap();
        assert!(parse_slice(&bytes).is_ok());
    }

    #[test]
    fn rejects_garbage_bytes() {
        let result = parse_slice(b"openapi: [unclosed");
        assert!(matches!(result, Err(LoadError::Parse(_))));
    }

    #[test]
    fn load_source_reads_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("api.yaml");
        std::fs::write(&path, "openapi: 3.0.0\npaths: {}\n").unwrap();

        let doc = load_source(path.to_str().unwrap()).unwrap();
        assert!(doc.paths.is_empty());
    }

    #[test]
    fn load_source_reports_missing_files() {
        let result = load_source("/definitely/not/here.yaml");
        match result {
            Err(LoadError::Io { path, .. }) => assert_eq!(path, "/definitely/not/here.yaml"),
            other => panic!("Expected io error, got {:?}", other),
        }
    }

    #[test]
    fn load_source_rejects_malformed_urls() {
        let result = load_source("http://[::1");
        assert!(matches!(result, Err(LoadError::InvalidUrl { .. })));
    }
}
