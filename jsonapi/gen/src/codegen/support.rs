//! Support declarations emitted into every generated file.
//!
//! Generated handlers only talk to the outside world through the items
//! produced here: `RequestParameters` reads raw values, `ValidationErrors`
//! and `HandlerError` carry failures, and `Route` feeds the external router.
//! The block is fixed, so its identifiers are reserved before any schema type
//! is resolved (see [`SUPPORT_TYPES`]).

use proc_macro2::TokenStream;
use quote::quote;

/// Identifiers declared by [`generate_support`].
///
/// A schema or operation producing one of these names is a naming collision.
pub const SUPPORT_TYPES: &[&str] = &[
    "ParameterLocation",
    "RequestParameters",
    "ValidationError",
    "ValidationErrors",
    "Validate",
    "HandlerError",
    "ResourceIdentifier",
    "ToOneRelationship",
    "ToManyRelationship",
    "Route",
    "Service",
];

/// Generates the location enum and the raw parameter access trait.
fn generate_parameter_access() -> TokenStream {
    quote! {
        /// Where a request value is read from.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ParameterLocation {
            /// A segment of the URL path template.
            Path,
            /// A query string parameter.
            Query,
            /// A request header.
            Header,
            /// The decoded request body.
            Body,
        }

        impl ParameterLocation {
            /// Returns the location as written in API documents.
            pub fn as_str(self) -> &'static str {
                match self {
                    ParameterLocation::Path => "path",
                    ParameterLocation::Query => "query",
                    ParameterLocation::Header => "header",
                    ParameterLocation::Body => "body",
                }
            }
        }

        impl std::fmt::Display for ParameterLocation {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        /// Raw access to the values of an incoming request.
        ///
        /// Implemented by the router integration. Header lookups should be
        /// case-insensitive; list values are comma separated.
        pub trait RequestParameters {
            /// Returns the raw value of a parameter, if present.
            fn parameter(&self, location: ParameterLocation, name: &str) -> Option<&str>;
        }
    }
}

/// Generates the validation error types and the `Validate` trait.
fn generate_validation_types() -> TokenStream {
    quote! {
        /// A single rejected request value.
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct ValidationError {
            /// Where the value was read from.
            pub location: ParameterLocation,
            /// The parameter name, or a member path for body checks.
            pub name: &'static str,
            /// Why the value was rejected.
            pub message: String,
        }

        impl std::fmt::Display for ValidationError {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{} parameter '{}': {}", self.location, self.name, self.message)
            }
        }

        /// Every value rejected while extracting one request.
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct ValidationErrors {
            pub errors: Vec<ValidationError>,
        }

        impl ValidationErrors {
            /// Records a rejected value.
            pub fn push(
                &mut self,
                location: ParameterLocation,
                name: &'static str,
                message: impl Into<String>,
            ) {
                self.errors.push(ValidationError {
                    location,
                    name,
                    message: message.into(),
                });
            }

            /// Returns true if nothing was rejected.
            pub fn is_empty(&self) -> bool {
                self.errors.is_empty()
            }

            /// Converts the collected errors into a result.
            pub fn into_result(self) -> Result<(), ValidationErrors> {
                if self.errors.is_empty() { Ok(()) } else { Err(self) }
            }
        }

        impl std::fmt::Display for ValidationErrors {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                for (index, error) in self.errors.iter().enumerate() {
                    if index > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{}", error)?;
                }
                Ok(())
            }
        }

        impl std::error::Error for ValidationErrors {}

        /// Structural checks on a decoded document.
        pub trait Validate {
            /// Returns every violation found in the document.
            fn validate(&self) -> Result<(), ValidationErrors>;
        }
    }
}

/// Generates the error type returned by handlers and service methods.
fn generate_handler_error() -> TokenStream {
    quote! {
        /// Errors returned by generated handlers.
        #[derive(Debug, thiserror::Error)]
        pub enum HandlerError {
            /// One or more request values were missing or malformed.
            #[error("Invalid request: {0}")]
            InvalidRequest(#[from] ValidationErrors),

            /// The request body is not a valid JSON document.
            #[error("Malformed request body: {0}")]
            MalformedBody(#[from] serde_json::Error),

            /// The service implementation failed.
            #[error(transparent)]
            Service(Box<dyn std::error::Error + Send + Sync>),
        }
    }
}

/// Generates the helpers the per-operation `extract` functions call.
fn generate_extraction_helpers() -> TokenStream {
    quote! {
        /// Records an error if a required parameter is absent.
        pub fn require_parameter<'r>(
            errors: &mut ValidationErrors,
            location: ParameterLocation,
            name: &'static str,
            raw: Option<&'r str>,
        ) -> Option<&'r str> {
            if raw.is_none() {
                errors.push(location, name, "is required");
            }
            raw
        }

        /// Parses a raw value, recording an error if it does not parse.
        pub fn parse_parameter<T>(
            errors: &mut ValidationErrors,
            location: ParameterLocation,
            name: &'static str,
            raw: &str,
        ) -> Option<T>
        where
            T: std::str::FromStr,
            T::Err: std::fmt::Display,
        {
            match raw.parse::<T>() {
                Ok(value) => Some(value),
                Err(err) => {
                    errors.push(location, name, format!("invalid value '{}': {}", raw, err));
                    None
                }
            }
        }

        /// Parses a comma separated list, recording the first element that does not parse.
        pub fn parse_list_parameter<T>(
            errors: &mut ValidationErrors,
            location: ParameterLocation,
            name: &'static str,
            raw: &str,
        ) -> Option<Vec<T>>
        where
            T: std::str::FromStr,
            T::Err: std::fmt::Display,
        {
            let mut values = Vec::new();
            for item in raw.split(',').map(str::trim).filter(|item| !item.is_empty()) {
                values.push(parse_parameter::<T>(errors, location, name, item)?);
            }
            Some(values)
        }

        /// Decodes a JSON:API document and runs its structural checks.
        pub fn decode_body<T>(body: &[u8]) -> Result<T, HandlerError>
        where
            T: serde::de::DeserializeOwned + Validate,
        {
            let document: T = serde_json::from_slice(body)?;
            document.validate()?;
            Ok(document)
        }
    }
}

/// Generates the JSON:API relationship and routing types.
fn generate_linkage_types() -> TokenStream {
    quote! {
        /// A `{ "type", "id" }` pair identifying a resource.
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub struct ResourceIdentifier {
            #[serde(rename = "type")]
            pub kind: String,
            pub id: String,
        }

        /// A relationship pointing at zero or one resource.
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        pub struct ToOneRelationship {
            #[serde(default)]
            pub data: Option<ResourceIdentifier>,
        }

        /// A relationship pointing at any number of resources.
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        pub struct ToManyRelationship {
            #[serde(default)]
            pub data: Vec<ResourceIdentifier>,
        }

        /// One entry of the route table handed to the router.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct Route {
            /// Upper-case HTTP method.
            pub method: &'static str,
            /// Path template with `{param}` placeholders.
            pub path: &'static str,
            /// The operation identifier the route dispatches to.
            pub operation: &'static str,
        }
    }
}

/// Generates the complete support block.
///
/// ## Examples
///
/// ```
/// use jsonapi_gen::codegen::generate_support;
///
/// let tokens = generate_support();
/// let file: syn::File = syn::parse2(tokens).unwrap();
/// assert!(!file.items.is_empty());
/// ```
pub fn generate_support() -> TokenStream {
    let parameter_access = generate_parameter_access();
    let validation_types = generate_validation_types();
    let handler_error = generate_handler_error();
    let extraction_helpers = generate_extraction_helpers();
    let linkage_types = generate_linkage_types();

    quote! {
        #parameter_access

        #validation_types

        #handler_error

        #extraction_helpers

        #linkage_types
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render() -> String {
        let file: syn::File = syn::parse2(generate_support()).expect("support block should parse");
        prettyplease::unparse(&file)
    }

    #[test]
    fn support_block_is_valid_rust() {
        let tokens = generate_support();
        assert!(syn::parse2::<syn::File>(tokens).is_ok());
    }

    #[test]
    fn support_block_declares_every_reserved_name() {
        let code = render();
        for name in SUPPORT_TYPES.iter().filter(|name| **name != "Service") {
            let declared = code.contains(&format!("pub struct {} ", name))
                || code.contains(&format!("pub enum {} ", name))
                || code.contains(&format!("pub trait {} ", name));
            assert!(declared, "{} should be declared", name);
        }
    }

    #[test]
    fn handler_error_wraps_validation_and_json_errors() {
        let code = render();
        assert!(code.contains("#[derive(Debug, thiserror::Error)]"));
        assert!(code.contains("InvalidRequest(#[from] ValidationErrors)"));
        assert!(code.contains("MalformedBody(#[from] serde_json::Error)"));
    }

    #[test]
    fn relationship_types_rename_kind() {
        let code = render();
        assert!(code.contains("#[serde(rename = \"type\")]"));
        assert!(code.contains("pub data: Vec<ResourceIdentifier>"));
        assert!(code.contains("pub data: Option<ResourceIdentifier>"));
    }
}
