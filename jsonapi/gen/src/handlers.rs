//! Handler synthesis for conformant operations.
//!
//! For every operation resolved by the types stage, in document order:
//!
//! - `<Op>Params` with one field per parameter and an `extract` function
//! - `<op>_handler`, which opens a tracing span, bumps the invocation
//!   counter, extracts parameters, decodes the body and calls the service
//! - a `Service` trait method `<op>`
//! - a `ROUTES` entry
//!
//! Instrumentation goes through the `trace` and `telemetry` import aliases,
//! so the generated file only names `tracing` and `metrics` once.

use std::collections::HashMap;

use jsonapi_define::ParameterLocation;
use proc_macro2::TokenStream;
use quote::quote;
use tracing::{info, instrument};

use crate::build::Stage;
use crate::codegen::doc_comment;
use crate::context::{BuildContext, BuildState, ResolvedOperation, ResolvedParameter, TypeOrigin};
use crate::errors::GeneratorError;
use crate::naming::{ident, member_name, to_pascal_case, type_name};

/// Emits handlers for every resolved operation.
#[derive(Debug, Default, Clone, Copy)]
pub struct HandlersStage;

impl Stage for HandlersStage {
    fn name(&self) -> &'static str {
        "handlers"
    }

    fn completes(&self) -> BuildState {
        BuildState::HandlersSynthesized
    }

    #[instrument(name = "handlers_stage", skip_all)]
    fn run(&self, ctx: &mut BuildContext<'_>) -> Result<(), GeneratorError> {
        ctx.buffer.add_import(quote! { use tracing as trace; });
        ctx.buffer.add_import(quote! { use metrics as telemetry; });

        let operations = std::mem::take(&mut ctx.operations);
        let mut handler_owners: HashMap<String, String> = HashMap::new();

        for operation in &operations {
            let names = HandlerNames::for_operation(&operation.id)?;
            if let Some(first) = handler_owners.get(&names.handler) {
                return Err(GeneratorError::NamingCollision {
                    identifier: names.handler,
                    first: format!("operation '{}'", first),
                    second: format!("operation '{}'", operation.id),
                });
            }
            handler_owners.insert(names.handler.clone(), operation.id.clone());
            ctx.claim_type(&names.params, TypeOrigin::Params(operation.id.clone()))?;

            let params = generate_params_struct(operation, &names)?;
            let handler = generate_handler(operation, &names, &ctx.options.counter_name)?;
            let method = generate_service_method(operation, &names)?;
            let route = generate_route(operation);

            ctx.buffer.add_handler(
                names.handler,
                quote! {
                    #params

                    #handler
                },
                method,
                route,
            );
        }

        info!(handlers = operations.len(), "Synthesized handlers");
        ctx.operations = operations;
        Ok(())
    }
}

/// Identifiers derived from one operation id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerNames {
    /// `<op>` - the `Service` method.
    pub method: String,
    /// `<op>_handler` - the handler function.
    pub handler: String,
    /// `<Op>Params` - the parameters struct.
    pub params: String,
}

impl HandlerNames {
    /// Derives the names for an operation id.
    ///
    /// ```
    /// use jsonapi_gen::handlers::HandlerNames;
    ///
    /// let names = HandlerNames::for_operation("getArticle").unwrap();
    /// assert_eq!(names.method, "get_article");
    /// assert_eq!(names.handler, "get_article_handler");
    /// assert_eq!(names.params, "GetArticleParams");
    /// ```
    ///
    /// ## Errors
    ///
    /// Returns `GeneratorError::InvalidIdentifier` if the id does not yield
    /// valid identifiers.
    pub fn for_operation(operation_id: &str) -> Result<Self, GeneratorError> {
        let method = member_name(operation_id)?;
        let handler = format!("{}_handler", method.trim_end_matches('_'));
        ident(&handler)?;
        let params = type_name(&format!("{} params", to_pascal_case(operation_id)))?;
        Ok(Self {
            method,
            handler,
            params,
        })
    }
}

fn location_tokens(parameter: &ResolvedParameter) -> Result<TokenStream, GeneratorError> {
    match parameter.location {
        ParameterLocation::Path => Ok(quote! { ParameterLocation::Path }),
        ParameterLocation::Query => Ok(quote! { ParameterLocation::Query }),
        ParameterLocation::Header => Ok(quote! { ParameterLocation::Header }),
        ParameterLocation::Cookie => Err(GeneratorError::InvalidIdentifier {
            name: parameter.name.clone(),
            reason: "cookie parameters have no generated location".to_string(),
        }),
    }
}

fn parameter_type(parameter: &ResolvedParameter) -> TokenStream {
    let ty = &parameter.ty;
    let value = if parameter.list {
        quote! { Vec<#ty> }
    } else {
        quote! { #ty }
    };
    if parameter.required {
        value
    } else {
        quote! { Option<#value> }
    }
}

/// Generates `<Op>Params` and its `extract` function.
fn generate_params_struct(
    operation: &ResolvedOperation,
    names: &HandlerNames,
) -> Result<TokenStream, GeneratorError> {
    let struct_ident = ident(&names.params)?;
    let mut seen: HashMap<&str, &str> = HashMap::new();
    let mut fields = Vec::with_capacity(operation.parameters.len());
    let mut extractions = Vec::with_capacity(operation.parameters.len());
    let mut initializers = Vec::with_capacity(operation.parameters.len());

    for parameter in &operation.parameters {
        if let Some(first) = seen.insert(&parameter.field, &parameter.name) {
            return Err(GeneratorError::NamingCollision {
                identifier: format!("{}::{}", names.params, parameter.field),
                first: format!("parameter '{}'", first),
                second: format!("parameter '{}'", parameter.name),
            });
        }

        let field = ident(&parameter.field)?;
        let local = ident(&format!("param_{}", parameter.field.trim_end_matches('_')))?;
        let ty = parameter_type(parameter);
        let element = &parameter.ty;
        let location = location_tokens(parameter)?;
        let wire_name = &parameter.name;
        let doc = match &parameter.description {
            Some(description) => doc_comment(description),
            None => doc_comment(&format!(
                "`{}` ({} parameter).",
                parameter.name, parameter.location
            )),
        };

        fields.push(quote! {
            #doc
            pub #field: #ty
        });

        let parse = if parameter.list {
            quote! { parse_list_parameter::<#element>(&mut errors, #location, #wire_name, raw) }
        } else {
            quote! { parse_parameter::<#element>(&mut errors, #location, #wire_name, raw) }
        };
        let lookup = quote! { request.parameter(#location, #wire_name) };
        extractions.push(if parameter.required {
            quote! {
                let #local = require_parameter(&mut errors, #location, #wire_name, #lookup)
                    .and_then(|raw| #parse);
            }
        } else {
            quote! {
                let #local = #lookup.and_then(|raw| #parse);
            }
        });

        initializers.push(if parameter.required {
            quote! { #field: #local.unwrap_or_default() }
        } else {
            quote! { #field: #local }
        });
    }

    let struct_doc = format!(" Parameters of `{}`.", operation.id);
    let extract = if operation.parameters.is_empty() {
        quote! {
            /// Extracts the parameters from a request.
            pub fn extract<R: RequestParameters + ?Sized>(_request: &R) -> Result<Self, ValidationErrors> {
                Ok(Self {})
            }
        }
    } else {
        quote! {
            /// Extracts and validates the parameters of a request.
            ///
            /// Every missing or malformed value is reported, not just the first.
            pub fn extract<R: RequestParameters + ?Sized>(request: &R) -> Result<Self, ValidationErrors> {
                let mut errors = ValidationErrors::default();
                #(#extractions)*
                errors.into_result()?;
                Ok(Self {
                    #(#initializers),*
                })
            }
        }
    };

    Ok(quote! {
        #[doc = #struct_doc]
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct #struct_ident {
            #(#fields),*
        }

        impl #struct_ident {
            #extract
        }
    })
}

fn return_type(operation: &ResolvedOperation) -> Result<TokenStream, GeneratorError> {
    Ok(match &operation.response {
        Some(document) => {
            let document = ident(document)?;
            quote! { #document }
        }
        None => quote! { () },
    })
}

/// Generates `<op>_handler`.
fn generate_handler(
    operation: &ResolvedOperation,
    names: &HandlerNames,
    counter_name: &str,
) -> Result<TokenStream, GeneratorError> {
    let handler = ident(&names.handler)?;
    let method = ident(&names.method)?;
    let params = ident(&names.params)?;
    let returns = return_type(operation)?;
    let operation_id = &operation.id;
    let http_method = operation.method.to_string();
    let path = &operation.path;

    let doc = doc_comment(&match &operation.summary {
        Some(summary) => format!("{}\n\n`{} {}` (`{}`).", summary, http_method, path, operation_id),
        None => format!("Handles `{} {}` (`{}`).", http_method, path, operation_id),
    });

    let (body_param, decode, call) = match &operation.request {
        Some(document) => {
            let document = ident(document)?;
            (
                quote! { , body: &[u8] },
                quote! { let body = decode_body::<#document>(body)?; },
                quote! { service.#method(params, body) },
            )
        }
        None => (quote! {}, quote! {}, quote! { service.#method(params) }),
    };

    Ok(quote! {
        #doc
        pub fn #handler<S, R>(service: &S, request: &R #body_param) -> Result<#returns, HandlerError>
        where
            S: Service + ?Sized,
            R: RequestParameters + ?Sized,
        {
            let span = trace::info_span!(
                #operation_id,
                service = SERVICE_NAME,
                method = #http_method,
                path = #path
            );
            let _entered = span.enter();
            telemetry::counter!(#counter_name, "service" => SERVICE_NAME, "operation" => #operation_id)
                .increment(1);

            let params = #params::extract(request)?;
            #decode
            #call
        }
    })
}

/// Generates the `Service` trait method of an operation.
fn generate_service_method(
    operation: &ResolvedOperation,
    names: &HandlerNames,
) -> Result<TokenStream, GeneratorError> {
    let method = ident(&names.method)?;
    let params = ident(&names.params)?;
    let returns = return_type(operation)?;
    let doc = format!(" Implements `{} {}`.", operation.method, operation.path);

    Ok(match &operation.request {
        Some(document) => {
            let document = ident(document)?;
            quote! {
                #[doc = #doc]
                fn #method(&self, params: #params, body: #document) -> Result<#returns, HandlerError>;
            }
        }
        None => quote! {
            #[doc = #doc]
            fn #method(&self, params: #params) -> Result<#returns, HandlerError>;
        },
    })
}

fn generate_route(operation: &ResolvedOperation) -> TokenStream {
    let method = operation.method.to_string();
    let path = &operation.path;
    let id = &operation.id;
    quote! {
        Route { method: #method, path: #path, operation: #id }
    }
}
