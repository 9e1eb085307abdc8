//! End-to-end compilation from a schema manifest to a [`ResolvedModel`].
//!
//! ```text
//! Manifest → RawSchema → ResolutionContext → Validation passes → Freeze → ResolvedModel
//! ```
//!
//! # Example
//!
//! ```ignore
//! use objmeta::compile::{compile_file, CompileOptions};
//!
//! let options = CompileOptions::default().with_off_heap(true);
//! let model = compile_file("schema/objects.json", options)?;
//! for object in model.objects() {
//!     println!("{} -> {}", object.qualified_name, object.table);
//! }
//! ```

use std::path::Path;

use crate::config::{GenerationSettings, TableNaming};
use crate::dsl::{self, reverse, Diagnostic};
use crate::model::raw::{LoadError, RawSchema};
use crate::resolved::{freeze, ResolvedModel};
use crate::semantic::context::ResolutionContext;
use crate::semantic::error::{ErrorReport, Warning};
use crate::semantic::layout::LayoutError;
use crate::validation::validate;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during compilation.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Failed to parse query '{query}': {}", first_message(.diagnostics))]
    Parse {
        query: String,
        diagnostics: Vec<Diagnostic>,
    },

    #[error("Validation failed: {error_count} error(s) in {object_count} object(s)\n{report}")]
    Validation {
        object_count: usize,
        error_count: usize,
        report: ErrorReport,
    },

    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),
}

fn first_message(diagnostics: &[Diagnostic]) -> &str {
    diagnostics.first().map(|d| d.message.as_str()).unwrap_or("no query")
}

pub type CompileResult<T> = Result<T, CompileError>;

// ============================================================================
// Options
// ============================================================================

/// Options for compilation.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub generation: GenerationSettings,
}

impl From<GenerationSettings> for CompileOptions {
    fn from(generation: GenerationSettings) -> Self {
        Self { generation }
    }
}

impl CompileOptions {
    /// Compute off-heap layouts for objects that qualify.
    pub fn with_off_heap(mut self, off_heap: bool) -> Self {
        self.generation.off_heap = off_heap;
        self
    }

    /// Start every null bit set.
    pub fn with_initialize_primitives_to_null(mut self, init: bool) -> Self {
        self.generation.initialize_primitives_to_null = init;
        self
    }

    /// Skip the lowercase package name check.
    pub fn with_ignore_package_naming_convention(mut self, ignore: bool) -> Self {
        self.generation.ignore_package_naming_convention = ignore;
        self
    }

    pub fn with_table_naming(mut self, naming: TableNaming) -> Self {
        self.generation.default_table_naming = naming;
        self
    }
}

// ============================================================================
// Compilation Functions
// ============================================================================

fn run_validation(schema: RawSchema, options: CompileOptions) -> CompileResult<(ResolutionContext, Vec<Warning>)> {
    let mut ctx = ResolutionContext::new(schema, options.generation);
    tracing::debug!(objects = ctx.len(), "registered schema");

    let validation = validate(&mut ctx);
    for warning in &validation.warnings {
        tracing::warn!(object = %warning.object, "{}", warning.message);
    }
    if !validation.is_ok() {
        return Err(CompileError::Validation {
            object_count: validation.report.object_count(),
            error_count: validation.report.error_count(),
            report: validation.report,
        });
    }
    Ok((ctx, validation.warnings))
}

/// Validate `schema` and freeze it into a [`ResolvedModel`].
pub fn compile_schema(schema: RawSchema, options: CompileOptions) -> CompileResult<ResolvedModel> {
    let (ctx, warnings) = run_validation(schema, options)?;
    let model = freeze(&ctx, warnings)?;
    tracing::info!(objects = model.len(), warnings = model.warnings().len(), "compiled schema");
    Ok(model)
}

/// Load a manifest (`.json` or `.toml`) and compile it.
pub fn compile_file<P: AsRef<Path>>(path: P, options: CompileOptions) -> CompileResult<ResolvedModel> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), "loading schema");
    let schema = RawSchema::from_file(path)?;
    compile_schema(schema, options)
}

/// Run every validation pass without freezing; returns the warnings.
pub fn check_schema(schema: RawSchema, options: CompileOptions) -> CompileResult<Vec<Warning>> {
    run_validation(schema, options).map(|(_, warnings)| warnings)
}

/// A query parsed on its own, outside any schema.
#[derive(Debug, Clone)]
pub struct QueryOutput {
    /// Canonical rendering of the query.
    pub canonical: String,
    /// The query as seen from `related`, when both sides were named.
    pub reverse: Option<String>,
    /// Non-fatal diagnostics.
    pub warnings: Vec<Diagnostic>,
}

/// Parse one relationship query and, given both object names, render its
/// reverse.
pub fn compile_query(query: &str, from: Option<&str>, related: Option<&str>) -> CompileResult<QueryOutput> {
    let result = dsl::parse(query);
    let expr = match result.query {
        Some(expr) if !result.diagnostics.iter().any(|d| d.severity == dsl::Severity::Error) => expr,
        _ => {
            return Err(CompileError::Parse {
                query: query.to_string(),
                diagnostics: result.diagnostics,
            })
        }
    };
    let reverse = match (from, related) {
        (Some(from), Some(related)) => Some(reverse::reverse_text(&expr.value, from, related)),
        _ => None,
    };
    Ok(QueryOutput {
        canonical: expr.value.to_string(),
        reverse,
        warnings: result.diagnostics,
    })
}
