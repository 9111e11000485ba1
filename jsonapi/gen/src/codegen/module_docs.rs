//! Documentation generation for the generated file.
//!
//! [`ModuleDocBuilder`] renders the package-level `//!` documentation (an
//! introduction, the operations grouped by HTTP method, and a wiring
//! example). [`doc_comment`] renders free text as outer `///` lines.

use std::collections::BTreeMap;

use jsonapi_define::SchemaDocument;
use proc_macro2::TokenStream;
use quote::quote;

use crate::context::{Package, ResolvedOperation};

/// Renders text as one `#[doc]` attribute per line.
///
/// Multi-line text in a single attribute would be printed as a block
/// comment, so every line gets its own attribute.
///
/// ```
/// use jsonapi_gen::codegen::doc_comment;
///
/// let tokens = doc_comment("First line.\nSecond line.");
/// assert_eq!(tokens.to_string().matches("doc").count(), 2);
/// ```
pub fn doc_comment(text: &str) -> TokenStream {
    let lines = doc_lines(text);
    quote! { #(#[doc = #lines])* }
}

fn doc_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| {
            let line = line.trim_end();
            if line.is_empty() {
                String::new()
            } else {
                format!(" {}", line)
            }
        })
        .collect()
}

/// Builds the package-level documentation of a generated file.
///
/// ## Examples
///
/// ```
/// use jsonapi_define::SchemaDocument;
/// use jsonapi_gen::Package;
/// use jsonapi_gen::codegen::ModuleDocBuilder;
///
/// let doc = SchemaDocument::default();
/// let package = Package::from_name("articles");
/// let tokens = ModuleDocBuilder::new(&doc, &package, &[]).build();
/// assert!(tokens.to_string().contains("Package `articles`"));
/// ```
pub struct ModuleDocBuilder<'a> {
    document: &'a SchemaDocument,
    package: &'a Package,
    operations: &'a [ResolvedOperation],
}

impl<'a> ModuleDocBuilder<'a> {
    pub fn new(
        document: &'a SchemaDocument,
        package: &'a Package,
        operations: &'a [ResolvedOperation],
    ) -> Self {
        Self {
            document,
            package,
            operations,
        }
    }

    /// Builds the complete documentation as `#![doc = "..."]` attributes.
    pub fn build(&self) -> TokenStream {
        let text = [
            self.intro_paragraph(),
            self.operations_section(),
            self.example_section(),
        ]
        .join("\n\n");
        let lines = doc_lines(&text);

        quote! {
            #(#![doc = #lines])*
        }
    }

    fn intro_paragraph(&self) -> String {
        let mut intro = format!(
            "Package `{}` (`{}`): JSON:API types, handlers and validators.",
            self.package.name, self.package.path
        );
        match (&self.document.title, &self.document.version) {
            (Some(title), Some(version)) => {
                intro.push_str(&format!("\n\nGenerated from {} {}.", title, version))
            }
            (Some(title), None) => intro.push_str(&format!("\n\nGenerated from {}.", title)),
            _ => {}
        }
        intro
    }

    /// Groups operations by HTTP method, in method-name order.
    fn categorize_operations(&self) -> BTreeMap<String, Vec<&ResolvedOperation>> {
        let mut categories: BTreeMap<String, Vec<&ResolvedOperation>> = BTreeMap::new();
        for operation in self.operations {
            categories
                .entry(operation.method.to_string())
                .or_default()
                .push(operation);
        }
        categories
    }

    fn operations_section(&self) -> String {
        let categories = self.categorize_operations();
        if categories.is_empty() {
            return "## Operations\n\nNo conformant operations.".to_string();
        }

        let mut lines = vec!["## Operations".to_string(), String::new()];
        for (method, operations) in &categories {
            lines.push(format!("**{}**:", method));
            for operation in operations {
                let summary = operation
                    .summary
                    .as_deref()
                    .and_then(|s| s.lines().next())
                    .unwrap_or("No summary");
                lines.push(format!(
                    "- `{}` `{}` - {}",
                    operation.id, operation.path, summary
                ));
            }
            lines.push(String::new());
        }
        lines.join("\n").trim_end().to_string()
    }

    fn example_section(&self) -> String {
        let Some(operation) = self.operations.first() else {
            return "## Example\n\nNo operations available for example.".to_string();
        };
        let handler = format!("{}_handler", crate::naming::to_snake_case(&operation.id));

        format!(
            r#"## Example

```ignore
use {path}::*;

struct App;

impl Service for App {{
    // one method per operation
}}

let result = {handler}(&App, &request);
```"#,
            path = self.package.path,
            handler = handler,
        )
    }
}
