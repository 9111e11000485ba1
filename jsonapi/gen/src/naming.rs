//! Identifier derivation for generated code.
//!
//! Document names (`articleComments`, `page[size]`, `X-Request-Id`) are split
//! into words and re-joined as PascalCase type names or snake_case field and
//! function names. Every identifier handed to `quote!` goes through
//! [`ident`] first, so a name that cannot be rendered surfaces as
//! [`GeneratorError::InvalidIdentifier`] instead of a panic inside
//! `proc_macro2`.
//!
//! ## Examples
//!
//! ```
//! use jsonapi_gen::naming::{to_pascal_case, to_snake_case};
//!
//! assert_eq!(to_pascal_case("article-comments"), "ArticleComments");
//! assert_eq!(to_snake_case("getHTTPStatus"), "get_http_status");
//! assert_eq!(to_snake_case("page[size]"), "page_size");
//! ```

use proc_macro2::{Ident, Span};

use crate::errors::GeneratorError;

/// Splits a name into words on separators and CamelCase boundaries.
///
/// - "articleComments" -> ["article", "Comments"]
/// - "HTTPClient" -> ["HTTP", "Client"]
/// - "page[size]" -> ["page", "size"]
/// - "X-Request-Id" -> ["X", "Request", "Id"]
pub fn split_words(name: &str) -> Vec<&str> {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|segment| !segment.is_empty())
        .flat_map(split_camel_case)
        .collect()
}

fn split_camel_case(s: &str) -> Vec<&str> {
    let mut words = Vec::new();
    let mut word_start = 0;
    let chars: Vec<(usize, char)> = s.char_indices().collect();

    for i in 1..chars.len() {
        let (offset, current) = chars[i];
        let prev = chars[i - 1].1;

        // "articleComments" splits before 'C'; "HTTPClient" splits before 'C' too
        let is_new_word = current.is_uppercase()
            && (prev.is_lowercase()
                || prev.is_numeric()
                || (i + 1 < chars.len() && chars[i + 1].1.is_lowercase() && prev.is_uppercase()));

        if is_new_word {
            if offset > word_start {
                words.push(&s[word_start..offset]);
            }
            word_start = offset;
        }
    }

    if word_start < s.len() {
        words.push(&s[word_start..]);
    }

    words
}

/// Converts a name to PascalCase, keeping the casing after each word's first letter.
pub fn to_pascal_case(name: &str) -> String {
    split_words(name)
        .into_iter()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Converts a name to snake_case.
pub fn to_snake_case(name: &str) -> String {
    split_words(name)
        .into_iter()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Validates a candidate and builds an [`Ident`].
///
/// ## Errors
///
/// Returns `GeneratorError::InvalidIdentifier` if the candidate is empty,
/// starts with a digit, or is not a Rust identifier (keywords included).
pub fn ident(candidate: &str) -> Result<Ident, GeneratorError> {
    let invalid = |reason: &str| GeneratorError::InvalidIdentifier {
        name: candidate.to_string(),
        reason: reason.to_string(),
    };

    match candidate.chars().next() {
        None => return Err(invalid("name is empty after sanitization")),
        Some(c) if c.is_numeric() => return Err(invalid("identifiers cannot start with a digit")),
        Some(_) => {}
    }

    syn::parse_str::<Ident>(candidate).map_err(|e| invalid(&e.to_string()))?;
    Ok(Ident::new(candidate, Span::call_site()))
}

/// Returns the PascalCase type name for a document name.
pub fn type_name(name: &str) -> Result<String, GeneratorError> {
    let pascal = to_pascal_case(name);
    ident(&pascal)?;
    Ok(pascal)
}

/// Returns the snake_case identifier for a field, function or method name.
///
/// Keywords get a trailing underscore (`type` -> `type_`), so the JSON name
/// must be preserved with `#[serde(rename)]` by the caller.
pub fn member_name(name: &str) -> Result<String, GeneratorError> {
    let snake = to_snake_case(name);
    if is_keyword(&snake) {
        let escaped = format!("{}_", snake);
        ident(&escaped)?;
        return Ok(escaped);
    }
    ident(&snake).map_err(|err| match err {
        GeneratorError::InvalidIdentifier { reason, .. } => GeneratorError::InvalidIdentifier {
            name: name.to_string(),
            reason,
        },
        other => other,
    })?;
    Ok(snake)
}

fn is_keyword(candidate: &str) -> bool {
    !candidate.is_empty()
        && !candidate.starts_with(|c: char| c.is_numeric())
        && syn::parse_str::<Ident>(candidate).is_err()
        && candidate.chars().all(|c| c.is_alphanumeric() || c == '_')
}
