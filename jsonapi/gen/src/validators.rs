//! `Validate` implementations for generated document types.
//!
//! Serde already rejects documents of the wrong shape, so the generated
//! validators only check what the type system cannot: the `type` member of
//! every resource against the value the schema pins with a single-value
//! `enum`.

use proc_macro2::TokenStream;
use quote::quote;
use tracing::{info, instrument};

use crate::build::Stage;
use crate::context::{BuildContext, BuildState, DocumentType};
use crate::errors::GeneratorError;
use crate::naming::ident;

/// Emits one `impl Validate` per document type.
#[derive(Debug, Default, Clone, Copy)]
pub struct ValidatorsStage;

impl Stage for ValidatorsStage {
    fn name(&self) -> &'static str {
        "validators"
    }

    fn completes(&self) -> BuildState {
        BuildState::ValidatorsSynthesized
    }

    #[instrument(name = "validators_stage", skip_all)]
    fn run(&self, ctx: &mut BuildContext<'_>) -> Result<(), GeneratorError> {
        for document in &ctx.documents {
            let validator = generate_validator(document)?;
            ctx.buffer.add_validator(validator);
        }
        info!(validators = ctx.documents.len(), "Synthesized validators");
        Ok(())
    }
}

fn generate_validator(document: &DocumentType) -> Result<TokenStream, GeneratorError> {
    let document_ident = ident(&document.name)?;

    let Some(expected) = &document.resource_type else {
        return Ok(quote! {
            impl Validate for #document_ident {
                fn validate(&self) -> Result<(), ValidationErrors> {
                    Ok(())
                }
            }
        });
    };

    let check = quote! {
        if resource.kind != #expected {
            errors.push(
                ParameterLocation::Body,
                "data.type",
                format!("expected resource type '{}', found '{}'", #expected, resource.kind),
            );
        }
    };
    let body = if document.collection {
        quote! {
            for resource in &self.data.0 {
                #check
            }
        }
    } else {
        quote! {
            let resource = &self.data;
            #check
        }
    };

    Ok(quote! {
        impl Validate for #document_ident {
            fn validate(&self) -> Result<(), ValidationErrors> {
                let mut errors = ValidationErrors::default();
                #body
                errors.into_result()
            }
        }
    })
}
