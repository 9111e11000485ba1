//! Type resolution: schema nodes to Rust type declarations.
//!
//! The [`TypesStage`] walks every operation in document order, classifies it
//! with [`check_operation`], and resolves the types its bodies need:
//!
//! - named objects become structs named after the schema
//! - inline objects become `<Owner><Field>` structs
//! - arrays of objects become the element struct plus a `<Element>List`
//!   wrapper, one per element type
//! - the resource under a document's `data` gets the JSON:API layout
//!   (`kind`, `id`, `attributes`, `relationships`); objects reached from it
//!   are plain structs even when they declare `type` and `id`
//! - every request/response envelope becomes a `<Envelope>Document`, or keeps
//!   its name when that already ends in `Document`
//!
//! Reference cycles never recurse: a name that is already claimed is
//! returned as-is, and a field pointing back at a type still being resolved
//! is boxed.

use std::collections::HashMap;

use jsonapi_define::{ObjectSchema, SchemaNode};
use proc_macro2::TokenStream;
use quote::quote;
use tracing::{debug, info, instrument};

use crate::build::Stage;
use crate::codegen::scalar_type;
use crate::conformance::{Conformance, Envelope, EnvelopeData, check_operation};
use crate::context::{
    BuildContext, BuildState, Claim, DocumentType, ResolvedOperation, ResolvedParameter,
    TypeOrigin,
};
use crate::errors::GeneratorError;
use crate::naming::{ident, member_name, type_name};

/// Resolves the types of every conformant operation.
#[derive(Debug, Default, Clone, Copy)]
pub struct TypesStage;

impl Stage for TypesStage {
    fn name(&self) -> &'static str {
        "types"
    }

    fn completes(&self) -> BuildState {
        BuildState::TypesResolved
    }

    #[instrument(name = "types_stage", skip_all)]
    fn run(&self, ctx: &mut BuildContext<'_>) -> Result<(), GeneratorError> {
        ctx.buffer
            .add_import(quote! { use serde::{Deserialize, Serialize}; });

        let document = ctx.document;
        let mut skipped = 0;
        for (item, method, operation) in document.operations() {
            let shape = match check_operation(document, item, operation)? {
                Conformance::Conformant(shape) => shape,
                Conformance::Skip(reason) => {
                    debug!(
                        operation = operation.id.as_deref().unwrap_or("<unnamed>"),
                        %method,
                        path = %item.path,
                        %reason,
                        "Skipping non-conformant operation"
                    );
                    skipped += 1;
                    continue;
                }
            };

            let mut parameters = Vec::with_capacity(shape.parameters.len());
            for parameter_shape in &shape.parameters {
                let parameter = parameter_shape.parameter;
                parameters.push(ResolvedParameter {
                    name: parameter.name.clone(),
                    field: member_name(&parameter.name)?,
                    location: parameter.location,
                    required: parameter.required,
                    ty: parameter_shape.ty.clone(),
                    list: parameter_shape.list,
                    description: parameter.description.clone(),
                });
            }

            let request = match &shape.request {
                Some(envelope) => Some(resolve_envelope(ctx, shape.id, envelope)?),
                None => None,
            };
            let response = match &shape.response {
                Some(envelope) => Some(resolve_envelope(ctx, shape.id, envelope)?),
                None => None,
            };

            ctx.operations.push(ResolvedOperation {
                id: shape.id.to_string(),
                method,
                path: item.path.clone(),
                summary: operation.summary.clone(),
                parameters,
                request,
                response,
            });
        }

        info!(
            operations = ctx.operations.len(),
            skipped,
            types = ctx.buffer.type_names().len(),
            "Resolved types"
        );
        Ok(())
    }
}

/// A resolved field type.
struct FieldType {
    tokens: TokenStream,
    /// Set when the tokens name a generated struct directly, which may need
    /// boxing if that struct is still being resolved.
    named: Option<String>,
}

impl FieldType {
    fn plain(tokens: TokenStream) -> Self {
        Self {
            tokens,
            named: None,
        }
    }

    fn named(name: String) -> Result<Self, GeneratorError> {
        let id = ident(&name)?;
        Ok(Self {
            tokens: quote! { #id },
            named: Some(name),
        })
    }
}

/// Where a node sits: the owning type and the property it belongs to.
struct Site {
    owner: String,
    field: String,
}

impl Site {
    fn new(owner: &str, field: &str) -> Self {
        Self {
            owner: owner.to_string(),
            field: field.to_string(),
        }
    }

    /// The site of this site's array elements.
    fn item(&self) -> Self {
        let field = if self.field.is_empty() {
            "item".to_string()
        } else {
            format!("{} item", self.field)
        };
        Self {
            owner: self.owner.clone(),
            field,
        }
    }

    /// Name of an inline object at this site.
    fn inline_name(&self) -> Result<String, GeneratorError> {
        type_name(&format!("{} {}", self.owner, self.field))
    }

    fn origin(&self) -> TypeOrigin {
        TypeOrigin::Inline {
            owner: self.owner.clone(),
            field: self.field.clone(),
        }
    }

    fn context(&self) -> String {
        if self.field.is_empty() {
            self.owner.clone()
        } else {
            format!("{}.{}", self.owner, self.field)
        }
    }
}

/// Emits the document type of an envelope and everything it reaches.
///
/// Returns the document type name.
fn resolve_envelope(
    ctx: &mut BuildContext<'_>,
    operation: &str,
    envelope: &Envelope<'_>,
) -> Result<String, GeneratorError> {
    let document = envelope.document_name();
    let document_ident = ident(&document)?;
    // Referenced envelopes are shared between operations; inline bodies
    // belong to the operation that declares them.
    let origin = match envelope.schema {
        Some(schema) => TypeOrigin::Document(schema.to_string()),
        None => TypeOrigin::Body {
            operation: operation.to_string(),
            envelope: envelope.name.clone(),
        },
    };
    if ctx.claim_type(&document, origin)? == Claim::Existing {
        return Ok(document);
    }
    ctx.buffer.reserve_type(&document);

    let resource = envelope.data.resource();
    let origin = match resource.schema {
        Some(schema) => TypeOrigin::Schema(schema.to_string()),
        None => TypeOrigin::Inline {
            owner: envelope.name.clone(),
            field: "data".to_string(),
        },
    };
    resolve_resource(ctx, &resource.name, origin, resource.object)?;

    let (data_name, collection) = match &envelope.data {
        EnvelopeData::Single(_) => (resource.name.clone(), false),
        EnvelopeData::Collection(_) => (list_wrapper(ctx, &resource.name)?, true),
    };
    let data_ident = ident(&data_name)?;

    let description = if collection {
        format!(" JSON:API document carrying a list of `{}` resources.", resource.name)
    } else {
        format!(" JSON:API document carrying one `{}` resource.", resource.name)
    };
    ctx.buffer.fill_type(
        &document,
        quote! {
            #[doc = #description]
            #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
            pub struct #document_ident {
                pub data: #data_ident,
            }
        },
    )?;

    let resource_type = ctx.resource_types.get(&resource.name).cloned().flatten();
    ctx.documents.push(DocumentType {
        name: document.clone(),
        resource_type,
        collection,
    });
    Ok(document)
}

/// Which declaration an object schema gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    /// One field per property.
    Plain,
    /// The JSON:API resource object layout.
    Resource,
}

/// Emits the resource struct carried in a document's `data`.
fn resolve_resource(
    ctx: &mut BuildContext<'_>,
    name: &str,
    origin: TypeOrigin,
    object: &ObjectSchema,
) -> Result<(), GeneratorError> {
    emit_object(ctx, name, origin, object, Layout::Resource)
}

/// Emits a plain struct for an object schema under `name`.
fn resolve_object(
    ctx: &mut BuildContext<'_>,
    name: &str,
    origin: TypeOrigin,
    object: &ObjectSchema,
) -> Result<(), GeneratorError> {
    emit_object(ctx, name, origin, object, Layout::Plain)
}

fn emit_object(
    ctx: &mut BuildContext<'_>,
    name: &str,
    origin: TypeOrigin,
    object: &ObjectSchema,
    layout: Layout,
) -> Result<(), GeneratorError> {
    ident(name)?;
    if ctx.claim_type(name, origin)? == Claim::Existing {
        return Ok(());
    }
    ctx.buffer.reserve_type(name);
    ctx.in_progress.insert(name.to_string());

    let declaration = match layout {
        Layout::Resource => render_resource(ctx, name, object)?,
        Layout::Plain => render_struct(ctx, name, object)?,
    };

    ctx.in_progress.remove(name);
    ctx.buffer.fill_type(name, declaration)
}

/// Emits the `<Element>List` wrapper once per element type.
fn list_wrapper(ctx: &mut BuildContext<'_>, element: &str) -> Result<String, GeneratorError> {
    let wrapper = format!("{}List", element);
    if !ctx.claim_array_type(element) {
        return Ok(wrapper);
    }

    let wrapper_ident = ident(&wrapper)?;
    let element_ident = ident(element)?;
    ctx.claim_type(&wrapper, TypeOrigin::ArrayOf(element.to_string()))?;
    ctx.buffer.reserve_type(&wrapper);
    ctx.buffer.fill_type(
        &wrapper,
        quote! {
            #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct #wrapper_ident(pub Vec<#element_ident>);
        },
    )?;
    Ok(wrapper)
}

fn resolve_node(
    ctx: &mut BuildContext<'_>,
    node: &SchemaNode,
    site: &Site,
) -> Result<FieldType, GeneratorError> {
    match node {
        SchemaNode::Primitive(primitive) => {
            Ok(FieldType::plain(scalar_type(primitive, &site.context())?))
        }
        SchemaNode::Object(object) if object.properties.is_empty() => {
            Ok(FieldType::plain(quote! { serde_json::Value }))
        }
        SchemaNode::Object(object) => {
            let name = site.inline_name()?;
            resolve_object(ctx, &name, site.origin(), object)?;
            FieldType::named(name)
        }
        SchemaNode::Array(element) => {
            let element = resolve_node(ctx, element, &site.item())?;
            match element.named {
                Some(element_name) => {
                    let wrapper = list_wrapper(ctx, &element_name)?;
                    let wrapper_ident = ident(&wrapper)?;
                    Ok(FieldType::plain(quote! { #wrapper_ident }))
                }
                None => {
                    let tokens = element.tokens;
                    Ok(FieldType::plain(quote! { Vec<#tokens> }))
                }
            }
        }
        SchemaNode::Reference(target) => resolve_reference(ctx, target, site),
    }
}

fn resolve_reference(
    ctx: &mut BuildContext<'_>,
    target: &str,
    site: &Site,
) -> Result<FieldType, GeneratorError> {
    let document = ctx.document;
    let Some(schema) = document.schema(target) else {
        return Err(GeneratorError::UnresolvedReference {
            reference: target.to_string(),
            context: site.context(),
        });
    };

    match schema {
        SchemaNode::Object(object) if !object.properties.is_empty() => {
            let name = type_name(target)?;
            resolve_object(ctx, &name, TypeOrigin::Schema(target.to_string()), object)?;
            FieldType::named(name)
        }
        SchemaNode::Object(_) => Ok(FieldType::plain(quote! { serde_json::Value })),
        SchemaNode::Primitive(_) | SchemaNode::Array(_) | SchemaNode::Reference(_) => {
            // Aliases resolve to their target's type; a chain that loops back
            // on itself has no finite Rust type.
            if !ctx.resolving_aliases.insert(target.to_string()) {
                return Err(GeneratorError::UnresolvedReference {
                    reference: target.to_string(),
                    context: format!("recursive alias reached from {}", site.context()),
                });
            }
            let alias_site = Site::new(&type_name(target)?, "");
            let resolved = resolve_node(ctx, schema, &alias_site);
            ctx.resolving_aliases.remove(target);
            resolved
        }
    }
}

/// Renders one struct field, boxing back edges and wrapping optional fields.
fn render_field(
    ctx: &BuildContext<'_>,
    json_name: &str,
    field: &str,
    ty: FieldType,
    required: bool,
) -> Result<TokenStream, GeneratorError> {
    let field_ident = ident(field)?;
    let mut inner = ty.tokens;
    if let Some(named) = &ty.named
        && ctx.in_progress.contains(named)
    {
        inner = quote! { Box<#inner> };
    }

    let rename = (field != json_name).then(|| quote! { #[serde(rename = #json_name)] });
    Ok(if required {
        quote! {
            #rename
            pub #field_ident: #inner
        }
    } else {
        quote! {
            #rename
            #[serde(default, skip_serializing_if = "Option::is_none")]
            pub #field_ident: Option<#inner>
        }
    })
}

/// Tracks field identifiers within one struct.
#[derive(Default)]
struct FieldNames(HashMap<String, String>);

impl FieldNames {
    fn claim(&mut self, owner: &str, field: &str, json_name: &str) -> Result<(), GeneratorError> {
        if let Some(first) = self.0.get(field) {
            return Err(GeneratorError::NamingCollision {
                identifier: format!("{}::{}", owner, field),
                first: format!("property '{}'", first),
                second: format!("property '{}'", json_name),
            });
        }
        self.0.insert(field.to_string(), json_name.to_string());
        Ok(())
    }
}

fn render_struct(
    ctx: &mut BuildContext<'_>,
    name: &str,
    object: &ObjectSchema,
) -> Result<TokenStream, GeneratorError> {
    let struct_ident = ident(name)?;
    let mut names = FieldNames::default();
    let mut fields = Vec::with_capacity(object.properties.len());

    for (property, node) in &object.properties {
        let field = member_name(property)?;
        names.claim(name, &field, property)?;
        let ty = resolve_node(ctx, node, &Site::new(name, property))?;
        fields.push(render_field(ctx, property, &field, ty, object.is_required(property))?);
    }

    Ok(quote! {
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub struct #struct_ident {
            #(#fields),*
        }
    })
}

fn render_resource(
    ctx: &mut BuildContext<'_>,
    name: &str,
    object: &ObjectSchema,
) -> Result<TokenStream, GeneratorError> {
    let document = ctx.document;
    let resource_type = match object.property("type").and_then(|node| document.deref(node)) {
        Some((_, SchemaNode::Primitive(primitive))) if primitive.enumeration.len() == 1 => {
            Some(primitive.enumeration[0].clone())
        }
        _ => None,
    };
    ctx.resource_types
        .insert(name.to_string(), resource_type.clone());

    let struct_ident = ident(name)?;
    let mut names = FieldNames::default();
    names.claim(name, "kind", "type")?;
    let mut fields = vec![quote! {
        #[serde(rename = "type")]
        pub kind: String
    }];

    if object.property("id").is_some() {
        names.claim(name, "id", "id")?;
        fields.push(render_field(
            ctx,
            "id",
            "id",
            FieldType::plain(quote! { String }),
            object.is_required("id"),
        )?);
    }

    if let Some(attributes) = object.property("attributes") {
        names.claim(name, "attributes", "attributes")?;
        let ty = resolve_node(ctx, attributes, &Site::new(name, "attributes"))?;
        fields.push(render_field(
            ctx,
            "attributes",
            "attributes",
            ty,
            object.is_required("attributes"),
        )?);
    }

    if let Some(relationships) = object.property("relationships") {
        names.claim(name, "relationships", "relationships")?;
        let ty = resolve_relationships(ctx, name, relationships)?;
        fields.push(render_field(
            ctx,
            "relationships",
            "relationships",
            ty,
            object.is_required("relationships"),
        )?);
    }

    // Other top-level members (`links`, `meta`, ...) keep their own fields.
    for (member, node) in &object.properties {
        if matches!(
            member.as_str(),
            "type" | "id" | "attributes" | "relationships"
        ) {
            continue;
        }
        let field = member_name(member)?;
        names.claim(name, &field, member)?;
        let ty = resolve_node(ctx, node, &Site::new(name, member))?;
        fields.push(render_field(ctx, member, &field, ty, object.is_required(member))?);
    }

    let description = match &resource_type {
        Some(kind) => format!(" JSON:API resource of type `{}`.", kind),
        None => " JSON:API resource.".to_string(),
    };
    Ok(quote! {
        #[doc = #description]
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub struct #struct_ident {
            #(#fields),*
        }
    })
}

/// Emits the relationships struct of a resource.
fn resolve_relationships(
    ctx: &mut BuildContext<'_>,
    resource: &str,
    node: &SchemaNode,
) -> Result<FieldType, GeneratorError> {
    let document = ctx.document;
    let site = Site::new(resource, "relationships");
    let Some((schema_name, resolved)) = document.deref(node) else {
        return Err(GeneratorError::UnresolvedReference {
            reference: node.reference_name().unwrap_or_default().to_string(),
            context: site.context(),
        });
    };

    let object = match resolved {
        SchemaNode::Object(object) if !object.properties.is_empty() => object,
        SchemaNode::Object(_)
        | SchemaNode::Primitive(_)
        | SchemaNode::Array(_)
        | SchemaNode::Reference(_) => {
            debug!(resource, "Relationships member has no declared relationships");
            return Ok(FieldType::plain(quote! { serde_json::Value }));
        }
    };

    let (name, origin) = match schema_name {
        Some(schema) => (type_name(schema)?, TypeOrigin::Schema(schema.to_string())),
        None => (site.inline_name()?, site.origin()),
    };
    let struct_ident = ident(&name)?;
    if ctx.claim_type(&name, origin)? == Claim::Existing {
        return FieldType::named(name);
    }
    ctx.buffer.reserve_type(&name);

    let mut names = FieldNames::default();
    let mut fields = Vec::new();
    for (member, member_node) in &object.properties {
        let member_site = Site::new(&name, member);
        let relationship = match document.deref(member_node) {
            Some((_, SchemaNode::Object(relationship))) => relationship,
            Some(_) => {
                debug!(relationship = %member_site.context(), "Skipping relationship that is not an object");
                continue;
            }
            None => {
                return Err(GeneratorError::UnresolvedReference {
                    reference: member_node.reference_name().unwrap_or_default().to_string(),
                    context: member_site.context(),
                });
            }
        };

        let linkage = match relationship.property("data").map(|data| (data, document.deref(data))) {
            Some((_, Some((_, SchemaNode::Array(_))))) => quote! { ToManyRelationship },
            Some((_, Some((_, SchemaNode::Object(_))))) => quote! { ToOneRelationship },
            Some((data, None)) => {
                return Err(GeneratorError::UnresolvedReference {
                    reference: data.reference_name().unwrap_or_default().to_string(),
                    context: member_site.context(),
                });
            }
            Some((_, Some(_))) | None => {
                debug!(relationship = %member_site.context(), "Skipping relationship without resource linkage");
                continue;
            }
        };

        let field = member_name(member)?;
        names.claim(&name, &field, member)?;
        fields.push(render_field(
            ctx,
            member,
            &field,
            FieldType::plain(linkage),
            object.is_required(member),
        )?);
    }

    ctx.buffer.fill_type(
        &name,
        quote! {
            #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
            pub struct #struct_ident {
                #(#fields),*
            }
        },
    )?;
    FieldType::named(name)
}
