//! Pre-generation validation of the run configuration.
//!
//! Checks that fail here would otherwise surface as confusing errors in the
//! generated file, so they run before any stage.
//!
//! ## Validation Checks
//!
//! - **Package name**: must be a snake_case Rust identifier
//! - **Package path**: must be a `::`-separated Rust path
//! - **Counter name**: must be a valid metric name
//!
//! ## Examples
//!
//! ```
//! use jsonapi_gen::{GeneratorOptions, Package};
//! use jsonapi_gen::validation::{validate_options, validate_package};
//!
//! assert!(validate_package(&Package::from_name("articles")).is_ok());
//! assert!(validate_package(&Package::from_name("Articles")).is_err());
//! assert!(validate_options(&GeneratorOptions::default()).is_ok());
//! ```

use crate::context::{GeneratorOptions, Package};
use crate::errors::GeneratorError;
use crate::naming::{ident, to_snake_case};

/// Validates the target package.
///
/// ## Errors
///
/// Returns `GeneratorError::InvalidIdentifier` if the name is not a
/// snake_case identifier or the path is not a Rust path.
pub fn validate_package(package: &Package) -> Result<(), GeneratorError> {
    ident(&package.name)?;

    let snake = to_snake_case(&package.name);
    if snake != package.name {
        return Err(GeneratorError::InvalidIdentifier {
            name: package.name.clone(),
            reason: format!("package names must be snake_case (try '{}')", snake),
        });
    }

    if syn::parse_str::<syn::Path>(&package.path).is_err() {
        return Err(GeneratorError::InvalidIdentifier {
            name: package.path.clone(),
            reason: "package path must be a Rust path such as crate::api".to_string(),
        });
    }

    Ok(())
}

/// Validates generator options.
///
/// Metric names follow the Prometheus convention: an ASCII letter or `_`,
/// then letters, digits, `_` or `:`.
///
/// ## Errors
///
/// Returns `GeneratorError::ConfigError` if the counter name is empty or
/// contains characters a metrics exporter would reject.
pub fn validate_options(options: &GeneratorOptions) -> Result<(), GeneratorError> {
    let name = options.counter_name.as_str();
    let mut chars = name.chars();

    match chars.next() {
        None => {
            return Err(GeneratorError::ConfigError(
                "counter name cannot be empty".to_string(),
            ));
        }
        Some(first) if !(first.is_ascii_alphabetic() || first == '_') => {
            return Err(GeneratorError::ConfigError(format!(
                "counter name '{}' must start with a letter or underscore",
                name
            )));
        }
        Some(_) => {}
    }

    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':') {
        return Err(GeneratorError::ConfigError(format!(
            "counter name '{}' may only contain letters, digits, '_' and ':'",
            name
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // === package ===

    #[test]
    fn snake_case_package_passes() {
        assert!(validate_package(&Package::from_name("blog_api")).is_ok());
        assert!(validate_package(&Package::new("crate::api::blog", "blog")).is_ok());
    }

    #[test]
    fn camel_case_package_is_rejected_with_suggestion() {
        let err = validate_package(&Package::from_name("blogApi")).unwrap_err();
        match err {
            GeneratorError::InvalidIdentifier { name, reason } => {
                assert_eq!(name, "blogApi");
                assert!(reason.contains("blog_api"));
            }
            other => panic!("Expected InvalidIdentifier, got {:?}", other),
        }
    }

    #[test]
    fn digit_leading_package_is_rejected() {
        assert!(matches!(
            validate_package(&Package::from_name("1blog")),
            Err(GeneratorError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn malformed_path_is_rejected() {
        let package = Package::new("crate::", "blog");
        assert!(matches!(
            validate_package(&package),
            Err(GeneratorError::InvalidIdentifier { name, .. }) if name == "crate::"
        ));
    }

    // === options ===

    #[test]
    fn default_counter_name_passes() {
        assert!(validate_options(&GeneratorOptions::default()).is_ok());
    }

    #[test]
    fn empty_counter_name_is_rejected() {
        let options = GeneratorOptions {
            counter_name: String::new(),
        };
        assert!(matches!(
            validate_options(&options),
            Err(GeneratorError::ConfigError(msg)) if msg.contains("empty")
        ));
    }

    #[test]
    fn counter_name_with_dashes_is_rejected() {
        let options = GeneratorOptions {
            counter_name: "handler-calls".to_string(),
        };
        assert!(validate_options(&options).is_err());
    }

    #[test]
    fn counter_name_with_leading_digit_is_rejected() {
        let options = GeneratorOptions {
            counter_name: "2xx_total".to_string(),
        };
        assert!(validate_options(&options).is_err());
    }
}
