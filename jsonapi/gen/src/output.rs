//! Validation, formatting and file writing for generated code.
//!
//! ## Safety Guarantees
//!
//! - **Validation**: All generated code is validated with `syn` before writing
//! - **Formatting**: Output is formatted with `prettyplease` for consistent style
//! - **Atomic writes**: Uses temp file + rename pattern to prevent partial writes

use std::fs;
use std::path::Path;

use proc_macro2::TokenStream;
use tracing::info;

use crate::build::Generator;
use crate::context::Package;
use crate::errors::GeneratorError;

/// First line of every generated file.
pub const GENERATED_HEADER: &str = "// Code generated by jsonapi-gen. DO NOT EDIT.";

/// Validates that a token stream is a syntactically valid Rust file.
///
/// ## Errors
///
/// Returns `GeneratorError::Serialization` if the code fails to parse.
pub fn validate_code(tokens: &TokenStream) -> Result<syn::File, GeneratorError> {
    syn::parse2(tokens.clone())
        .map_err(|e| GeneratorError::Serialization(format!("Generated code is invalid: {}", e)))
}

/// Formats a parsed file with prettyplease and prepends the generated-code
/// notice.
pub fn format_code(file: &syn::File) -> String {
    let formatted = prettyplease::unparse(file);
    format!("{}\n\n{}", GENERATED_HEADER, formatted)
}

/// Writes content to a file atomically using temp file + rename.
///
/// Readers see either the old or the new content, never a mix.
///
/// ## Errors
///
/// Returns `GeneratorError::WriteError` if:
/// - Parent directories cannot be created
/// - The temp file cannot be written
/// - The rename operation fails
pub fn write_atomic(path: &Path, content: &str) -> Result<(), GeneratorError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| GeneratorError::WriteError {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, content).map_err(|e| GeneratorError::WriteError {
        path: temp_path.display().to_string(),
        source: e,
    })?;

    fs::rename(&temp_path, path).map_err(|e| GeneratorError::WriteError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

/// Generates the package for `source` and writes it.
///
/// The code is printed to stdout when `dry_run` is set or no output path
/// is given; otherwise it is written atomically to `output`.
///
/// ## Returns
///
/// The formatted code, whether or not it was written.
///
/// ## Errors
///
/// Returns an error if loading, generation or writing fails. Nothing is
/// written when generation fails.
pub fn generate_and_write(
    generator: &Generator,
    source: &str,
    package: &Package,
    output: Option<&Path>,
    dry_run: bool,
) -> Result<String, GeneratorError> {
    let code = generator.build_source(source, package)?;

    match output {
        Some(path) if !dry_run => {
            write_atomic(path, &code)?;
            info!(path = %path.display(), bytes = code.len(), "Wrote generated package");
        }
        _ => println!("{}", code),
    }

    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::Stage;
    use crate::context::{BuildContext, BuildState};
    use quote::quote;
    use tempfile::TempDir;

    const DOCUMENT: &str = r##"
openapi: 3.0.3
info:
  title: Notes
  version: 1.0.0
paths:
  /notes/{id}:
    get:
      operationId: getNote
      parameters:
        - name: id
          in: path
          required: true
          schema:
            type: string
      responses:
        "200":
          description: ok
          content:
            application/vnd.api+json:
              schema:
                type: object
                properties:
                  data:
                    $ref: "#/components/schemas/Note"
components:
  schemas:
    Note:
      type: object
      properties:
        type:
          type: string
        id:
          type: string
"##;

    /// Reserves a type slot and never fills it.
    struct ReservesWithoutFilling;

    impl Stage for ReservesWithoutFilling {
        fn name(&self) -> &'static str {
            "reserves_without_filling"
        }

        fn completes(&self) -> BuildState {
            BuildState::ValidatorsSynthesized
        }

        fn run(&self, ctx: &mut BuildContext<'_>) -> Result<(), GeneratorError> {
            ctx.buffer.reserve_type("Orphan");
            Ok(())
        }
    }

    /// Fills a type slot with tokens that are not a Rust item.
    struct EmitsBrokenItem;

    impl Stage for EmitsBrokenItem {
        fn name(&self) -> &'static str {
            "emits_broken_item"
        }

        fn completes(&self) -> BuildState {
            BuildState::ValidatorsSynthesized
        }

        fn run(&self, ctx: &mut BuildContext<'_>) -> Result<(), GeneratorError> {
            ctx.buffer.reserve_type("Broken");
            ctx.buffer.fill_type("Broken", quote! { pub struct })
        }
    }

    fn write_document(dir: &TempDir) -> String {
        let path = dir.path().join("notes.yaml");
        fs::write(&path, DOCUMENT).unwrap();
        path.display().to_string()
    }

    // === validate_code tests ===

    #[test]
    fn validate_code_accepts_valid_code() {
        let tokens = quote! { pub struct Valid; };
        assert!(validate_code(&tokens).is_ok());
    }

    #[test]
    fn validate_code_rejects_invalid_code() {
        let tokens = quote! { pub struct };
        let result = validate_code(&tokens);
        assert!(matches!(result, Err(GeneratorError::Serialization(msg)) if msg.contains("invalid")));
    }

    // === format_code tests ===

    #[test]
    fn format_code_prepends_header() {
        let file = validate_code(&quote! { pub struct Formatted { pub a: i64 } }).unwrap();
        let code = format_code(&file);
        assert!(code.starts_with("// Code generated by jsonapi-gen. DO NOT EDIT.\n\n"));
        assert!(code.contains("pub struct Formatted {\n    pub a: i64,\n}"));
    }

    // === write_atomic tests ===

    #[test]
    fn write_atomic_creates_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.rs");

        write_atomic(&file_path, "// Test content").unwrap();

        let read_content = fs::read_to_string(&file_path).unwrap();
        assert_eq!(read_content, "// Test content");
    }

    #[test]
    fn write_atomic_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("nested/deep/test.rs");

        assert!(write_atomic(&file_path, "// Nested content").is_ok());
        assert!(file_path.exists());
    }

    #[test]
    fn write_atomic_overwrites_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("existing.rs");
        fs::write(&file_path, "// Old content").unwrap();

        write_atomic(&file_path, "// New content").unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "// New content");
    }

    #[test]
    fn write_atomic_no_temp_file_left_behind() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("clean.rs");

        write_atomic(&file_path, "// Content").unwrap();

        assert!(!file_path.with_extension("tmp").exists());
    }

    // === generate_and_write tests ===

    #[test]
    fn generate_and_write_writes_file() {
        let temp_dir = TempDir::new().unwrap();
        let source = write_document(&temp_dir);
        let output = temp_dir.path().join("src/notes.rs");

        let code = generate_and_write(
            &Generator::new(),
            &source,
            &Package::from_name("notes"),
            Some(&output),
            false,
        )
        .unwrap();

        assert_eq!(fs::read_to_string(&output).unwrap(), code);
        assert!(code.contains("pub fn get_note_handler"));
    }

    #[test]
    fn generate_and_write_dry_run_creates_no_file() {
        let temp_dir = TempDir::new().unwrap();
        let source = write_document(&temp_dir);
        let output = temp_dir.path().join("notes.rs");

        let code = generate_and_write(
            &Generator::new(),
            &source,
            &Package::from_name("notes"),
            Some(&output),
            true,
        )
        .unwrap();

        assert!(!output.exists());
        assert!(code.contains("pub struct GetNoteResponseDocument"));
    }

    #[test]
    fn failed_generation_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("missing.yaml").display().to_string();
        let output = temp_dir.path().join("notes.rs");

        let result = generate_and_write(
            &Generator::new(),
            &source,
            &Package::from_name("notes"),
            Some(&output),
            false,
        );

        assert!(matches!(result, Err(GeneratorError::Load(_))));
        assert!(!output.exists());
    }

    #[test]
    fn unfilled_type_slot_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let source = write_document(&temp_dir);
        let output = temp_dir.path().join("notes.rs");

        let result = generate_and_write(
            &Generator::new().with_stage(ReservesWithoutFilling),
            &source,
            &Package::from_name("notes"),
            Some(&output),
            false,
        );

        assert!(matches!(result, Err(GeneratorError::Serialization(msg)) if msg.contains("Orphan")));
        assert!(!output.exists());
        assert!(!output.with_extension("tmp").exists());
    }

    #[test]
    fn unparseable_output_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let source = write_document(&temp_dir);
        let output = temp_dir.path().join("notes.rs");
        fs::write(&output, "// previous run").unwrap();

        let result = generate_and_write(
            &Generator::new().with_stage(EmitsBrokenItem),
            &source,
            &Package::from_name("notes"),
            Some(&output),
            false,
        );

        assert!(matches!(result, Err(GeneratorError::Serialization(_))));
        assert_eq!(fs::read_to_string(&output).unwrap(), "// previous run");
    }
}
