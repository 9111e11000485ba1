//! Primitive schema to Rust scalar type mapping.

use jsonapi_define::Primitive;
use proc_macro2::TokenStream;
use quote::quote;

use crate::errors::GeneratorError;

/// Maps a primitive schema to the Rust type emitted for it.
///
/// `context` names where the primitive was found and is only used in the
/// error message.
///
/// ## Examples
///
/// ```
/// use jsonapi_define::Primitive;
/// use jsonapi_gen::codegen::scalar_type;
///
/// let tokens = scalar_type(&Primitive::with_format("integer", "int32"), "Page.size").unwrap();
/// assert_eq!(tokens.to_string(), "i32");
///
/// assert!(scalar_type(&Primitive::new("file"), "Upload").is_err());
/// ```
///
/// ## Errors
///
/// Returns `GeneratorError::UnsupportedPrimitive` for kinds other than
/// `string`, `integer`, `number` and `boolean`, and for numeric formats with
/// no Rust counterpart.
pub fn scalar_type(primitive: &Primitive, context: &str) -> Result<TokenStream, GeneratorError> {
    let format = primitive.format.as_deref();
    let tokens = match (primitive.kind.as_str(), format) {
        ("string", Some("date")) => quote! { chrono::NaiveDate },
        ("string", Some("date-time")) => quote! { chrono::DateTime<chrono::Utc> },
        ("string", _) => quote! { String },

        ("integer", None | Some("int64")) => quote! { i64 },
        ("integer", Some("int8")) => quote! { i8 },
        ("integer", Some("int16")) => quote! { i16 },
        ("integer", Some("int32")) => quote! { i32 },
        ("integer", Some("uint8")) => quote! { u8 },
        ("integer", Some("uint16")) => quote! { u16 },
        ("integer", Some("uint32")) => quote! { u32 },
        ("integer", Some("uint64")) => quote! { u64 },

        ("number", None | Some("double")) => quote! { f64 },
        ("number", Some("float")) => quote! { f32 },

        ("boolean", _) => quote! { bool },

        (kind, format) => {
            return Err(GeneratorError::UnsupportedPrimitive {
                schema: context.to_string(),
                kind: kind.to_string(),
                format: format.map(str::to_string),
            });
        }
    };
    Ok(tokens)
}
