//! Ordered accumulation of generated declarations.
//!
//! The [`EmissionBuffer`] collects every declaration of one run by category
//! and assembles them in a fixed order:
//!
//! 1. header (package docs and constants)
//! 2. imports (deduplicated)
//! 3. support declarations
//! 4. types, in discovery order
//! 5. handler declarations, the `Service` trait and the `ROUTES` table
//! 6. validators
//!
//! Types reserve a slot when first discovered and are filled once their
//! fields are resolved, so a type referenced before it is complete still
//! appears where it was discovered.

use std::collections::HashSet;

use indexmap::IndexMap;
use proc_macro2::TokenStream;
use quote::quote;

use crate::errors::GeneratorError;

/// Append-only builder for the declarations of one run.
#[derive(Debug, Default)]
pub struct EmissionBuffer {
    imports: Vec<TokenStream>,
    import_keys: HashSet<String>,
    types: IndexMap<String, Option<TokenStream>>,
    handlers: Vec<TokenStream>,
    handler_names: Vec<String>,
    service_methods: Vec<TokenStream>,
    routes: Vec<TokenStream>,
    validators: Vec<TokenStream>,
}

impl EmissionBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an import unless an identical one is already present.
    ///
    /// Returns true if the import was new.
    pub fn add_import(&mut self, import: TokenStream) -> bool {
        if self.import_keys.insert(import.to_string()) {
            self.imports.push(import);
            true
        } else {
            false
        }
    }

    /// Reserves the output position of a type.
    ///
    /// Reserving an already reserved name keeps the original position.
    pub fn reserve_type(&mut self, name: &str) {
        if !self.types.contains_key(name) {
            self.types.insert(name.to_string(), None);
        }
    }

    /// Stores the declaration of a reserved type.
    ///
    /// ## Errors
    ///
    /// Returns `GeneratorError::Serialization` if the type was never reserved
    /// or was already filled.
    pub fn fill_type(&mut self, name: &str, declaration: TokenStream) -> Result<(), GeneratorError> {
        match self.types.get_mut(name) {
            Some(slot) if slot.is_none() => {
                *slot = Some(declaration);
                Ok(())
            }
            Some(_) => Err(GeneratorError::Serialization(format!(
                "type '{}' was emitted twice",
                name
            ))),
            None => Err(GeneratorError::Serialization(format!(
                "type '{}' was emitted without a reserved slot",
                name
            ))),
        }
    }

    /// Appends the declarations of one operation.
    pub fn add_handler(
        &mut self,
        name: String,
        declarations: TokenStream,
        service_method: TokenStream,
        route: TokenStream,
    ) {
        self.handler_names.push(name);
        self.handlers.push(declarations);
        self.service_methods.push(service_method);
        self.routes.push(route);
    }

    /// Appends a validator implementation.
    pub fn add_validator(&mut self, validator: TokenStream) {
        self.validators.push(validator);
    }

    /// Names of all reserved types, in output order.
    pub fn type_names(&self) -> Vec<String> {
        self.types.keys().cloned().collect()
    }

    /// Names of all emitted handler functions, in output order.
    pub fn handler_names(&self) -> &[String] {
        &self.handler_names
    }

    /// Concatenates every category in output order.
    ///
    /// ## Errors
    ///
    /// Returns `GeneratorError::Serialization` if a reserved type slot was
    /// never filled.
    pub fn assemble(
        &self,
        header: TokenStream,
        support: TokenStream,
    ) -> Result<TokenStream, GeneratorError> {
        let mut types = Vec::with_capacity(self.types.len());
        for (name, declaration) in &self.types {
            match declaration {
                Some(declaration) => types.push(declaration),
                None => {
                    return Err(GeneratorError::Serialization(format!(
                        "type '{}' was reserved but never emitted",
                        name
                    )));
                }
            }
        }

        let imports = &self.imports;
        let handlers = &self.handlers;
        let service_methods = &self.service_methods;
        let routes = &self.routes;
        let validators = &self.validators;

        Ok(quote! {
            #header

            #(#imports)*

            #support

            #(#types)*

            #(#handlers)*

            /// Business logic behind the generated handlers.
            ///
            /// Each method receives extracted parameters and the decoded,
            /// validated request document.
            pub trait Service: Send + Sync {
                #(#service_methods)*
            }

            /// Every generated operation, in document order.
            pub const ROUTES: &[Route] = &[
                #(#routes),*
            ];

            #(#validators)*
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assemble_to_string(buffer: &EmissionBuffer) -> String {
        let tokens = buffer
            .assemble(quote! { pub const SERVICE_NAME: &str = "test"; }, quote! {})
            .unwrap();
        let file: syn::File = syn::parse2(tokens).unwrap();
        prettyplease::unparse(&file)
    }

    #[test]
    fn imports_are_deduplicated() {
        let mut buffer = EmissionBuffer::new();
        assert!(buffer.add_import(quote! { use tracing as trace; }));
        assert!(!buffer.add_import(quote! { use tracing as trace; }));
        assert!(buffer.add_import(quote! { use metrics as telemetry; }));

        let code = assemble_to_string(&buffer);
        assert_eq!(code.matches("use tracing as trace;").count(), 1);
    }

    #[test]
    fn types_keep_reservation_order() {
        let mut buffer = EmissionBuffer::new();
        buffer.reserve_type("Outer");
        buffer.reserve_type("Inner");
        buffer
            .fill_type("Inner", quote! { pub struct Inner; })
            .unwrap();
        buffer
            .fill_type("Outer", quote! { pub struct Outer; })
            .unwrap();

        let code = assemble_to_string(&buffer);
        let outer = code.find("pub struct Outer").unwrap();
        let inner = code.find("pub struct Inner").unwrap();
        assert!(outer < inner);
        assert_eq!(buffer.type_names(), vec!["Outer", "Inner"]);
    }

    #[test]
    fn unfilled_slot_fails_assembly() {
        let mut buffer = EmissionBuffer::new();
        buffer.reserve_type("Orphan");
        let result = buffer.assemble(quote! {}, quote! {});
        assert!(matches!(result, Err(GeneratorError::Serialization(msg)) if msg.contains("Orphan")));
    }

    #[test]
    fn double_fill_is_rejected() {
        let mut buffer = EmissionBuffer::new();
        buffer.reserve_type("Twice");
        buffer.fill_type("Twice", quote! { pub struct Twice; }).unwrap();
        assert!(buffer.fill_type("Twice", quote! { pub struct Twice; }).is_err());
        assert!(buffer.fill_type("Unknown", quote! {}).is_err());
    }

    #[test]
    fn handlers_precede_validators() {
        let mut buffer = EmissionBuffer::new();
        buffer.add_validator(quote! { pub fn validator_marker() {} });
        buffer.add_handler(
            "a_handler".to_string(),
            quote! { pub fn a_handler() {} },
            quote! { fn a(&self); },
            quote! { Route { method: "GET", path: "/a", operation: "a" } },
        );

        let code = assemble_to_string(&buffer);
        let handler = code.find("pub fn a_handler").unwrap();
        let service = code.find("pub trait Service").unwrap();
        let routes = code.find("pub const ROUTES").unwrap();
        let validator = code.find("pub fn validator_marker").unwrap();
        assert!(handler < service && service < routes && routes < validator);
        assert_eq!(buffer.handler_names(), ["a_handler".to_string()]);
    }
}
