//! The build orchestrator.
//!
//! A [`Generator`] runs an ordered list of [`Stage`]s over a fresh
//! [`BuildContext`] and serializes the emission buffer once every stage has
//! finished:
//!
//! ```text
//! Loaded -> TypesResolved -> HandlersSynthesized -> ValidatorsSynthesized -> Serialized
//! ```
//!
//! The generator itself holds no per-run state, so one instance can serve
//! concurrent runs from several threads.
//!
//! ## Examples
//!
//! ```
//! use jsonapi_define::SchemaDocument;
//! use jsonapi_gen::{Generator, Package};
//!
//! let doc = SchemaDocument::default();
//! let source = Generator::new()
//!     .build_schema(&doc, &Package::from_name("empty"))
//!     .unwrap();
//! assert!(source.starts_with("// Code generated by jsonapi-gen. DO NOT EDIT."));
//! ```

use jsonapi_define::{SchemaDocument, load_source};
use quote::quote;
use tracing::{info, instrument};

use crate::codegen::{ModuleDocBuilder, generate_support};
use crate::context::{BuildContext, BuildState, GeneratorOptions, Package};
use crate::errors::GeneratorError;
use crate::handlers::HandlersStage;
use crate::output::{format_code, validate_code};
use crate::resolver::TypesStage;
use crate::validation::{validate_options, validate_package};
use crate::validators::ValidatorsStage;

/// One step of the pipeline.
///
/// Stages communicate only through the [`BuildContext`]; a stage that fails
/// halts the run and its error is returned unchanged.
pub trait Stage: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// The state the context is in once this stage has run.
    fn completes(&self) -> BuildState;

    /// Runs the stage.
    ///
    /// ## Errors
    ///
    /// Returns the first fatal error the stage encounters.
    fn run(&self, ctx: &mut BuildContext<'_>) -> Result<(), GeneratorError>;
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    /// The formatted source file.
    pub source: String,
    /// Emitted type names, in output order.
    pub type_names: Vec<String>,
    /// Emitted handler functions, in output order.
    pub handler_names: Vec<String>,
}

/// Turns API documents into Rust source files.
pub struct Generator {
    options: GeneratorOptions,
    stages: Vec<Box<dyn Stage>>,
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator {
    /// Creates a generator with the default options and stages
    /// (types, handlers, validators).
    pub fn new() -> Self {
        Self::with_options(GeneratorOptions::default())
    }

    /// Creates a generator with the default stages and custom options.
    pub fn with_options(options: GeneratorOptions) -> Self {
        Self {
            options,
            stages: vec![
                Box::new(TypesStage),
                Box::new(HandlersStage),
                Box::new(ValidatorsStage),
            ],
        }
    }

    /// Appends a stage that runs after the existing ones.
    pub fn with_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Names of the configured stages, in run order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Loads a document from a URL or file path and generates its source.
    ///
    /// ## Errors
    ///
    /// Returns `GeneratorError::Load` if the document cannot be loaded, or
    /// any error [`Generator::generate`] returns.
    #[instrument(skip(self, package), fields(package = %package.name))]
    pub fn build_source(&self, source: &str, package: &Package) -> Result<String, GeneratorError> {
        let document = load_source(source)?;
        self.build_schema(&document, package)
    }

    /// Generates the source file for an already loaded document.
    ///
    /// ## Errors
    ///
    /// See [`Generator::generate`].
    pub fn build_schema(
        &self,
        document: &SchemaDocument,
        package: &Package,
    ) -> Result<String, GeneratorError> {
        Ok(self.generate(document, package)?.source)
    }

    /// Runs every stage and serializes the result.
    ///
    /// ## Errors
    ///
    /// Returns `GeneratorError::InvalidIdentifier` or
    /// `GeneratorError::ConfigError` for an invalid package or options, the
    /// first error of a failing stage, or `GeneratorError::Serialization` if
    /// the assembled output is not a valid Rust file.
    #[instrument(skip_all, fields(package = %package.name))]
    pub fn generate(
        &self,
        document: &SchemaDocument,
        package: &Package,
    ) -> Result<Generated, GeneratorError> {
        validate_package(package)?;
        validate_options(&self.options)?;

        let mut ctx = BuildContext::new(document, package, &self.options);
        for stage in &self.stages {
            stage.run(&mut ctx)?;
            let completed = stage.completes();
            if completed > ctx.state {
                ctx.advance(completed);
            }
            info!(stage = stage.name(), state = ?ctx.state, "Stage complete");
        }

        let source = serialize(&ctx)?;
        ctx.advance(BuildState::Serialized);
        info!(
            types = ctx.buffer.type_names().len(),
            handlers = ctx.buffer.handler_names().len(),
            "Generated package"
        );

        Ok(Generated {
            source,
            type_names: ctx.buffer.type_names(),
            handler_names: ctx.buffer.handler_names().to_vec(),
        })
    }
}

/// Assembles, validates and formats the buffer of a finished run.
fn serialize(ctx: &BuildContext<'_>) -> Result<String, GeneratorError> {
    let docs = ModuleDocBuilder::new(ctx.document, ctx.package, &ctx.operations).build();
    let service_name = &ctx.package.name;
    let package_path = &ctx.package.path;
    let header = quote! {
        #docs

        /// Service name reported in spans and metrics.
        pub const SERVICE_NAME: &str = #service_name;
        /// Module path the file was generated for.
        pub const PACKAGE_PATH: &str = #package_path;
    };

    let tokens = ctx.buffer.assemble(header, generate_support())?;
    let file = validate_code(&tokens)?;
    Ok(format_code(&file))
}
